use sea_orm::entity::prelude::*;

/// A booked clinic slot. At most one SCHEDULED meeting may occupy a given
/// `(meeting_date, time_slot)` pair; the migration backs this with a partial
/// unique index so concurrent bookings cannot both land.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "scheduled_meeting")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub startup_id: Uuid,
    pub kind: Kind,
    pub meeting_date: Date,
    pub time_slot: String,
    pub status: Status,
    pub panelist_name: Option<String>,
    pub completed_time: Option<String>,
    pub feedback: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::startup::Entity",
        from = "Column::StartupId",
        to = "super::startup::Column::Id",
        on_delete = "Cascade"
    )]
    Startup,
}

impl Related<super::startup::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Startup.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "meeting_kind")]
pub enum Kind {
    #[sea_orm(string_value = "SMC")]
    Smc,
    #[sea_orm(string_value = "FMC")]
    Fmc,
    #[sea_orm(string_value = "ONE_ON_ONE")]
    OneOnOne,
}

impl Kind {
    /// SMC and FMC sessions advance the pitch chain when marked done.
    pub fn is_pitch(self) -> bool {
        matches!(self, Kind::Smc | Kind::Fmc)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "meeting_status")]
pub enum Status {
    #[sea_orm(string_value = "SCHEDULED")]
    Scheduled,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

impl ActiveModelBehavior for ActiveModel {}
