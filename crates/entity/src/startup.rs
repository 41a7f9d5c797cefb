use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "startup")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub code: String,
    pub founder_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub sector: Option<String>,
    pub description: Option<String>,
    pub stage: Stage,
    pub status: Status,
    pub rejected_from_stage: Option<Stage>,
    pub registered_date: Date,
    pub onboarded_date: Option<Date>,
    pub graduated_date: Option<Date>,
    pub rejected_date: Option<Date>,
    pub quit_date: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Meeting,
    StageHistory,
    PitchRecord,
    OneOnOneRecord,
    Achievement,
    RevenueEntry,
    ProgressSnapshot,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Meeting => Entity::has_many(super::scheduled_meeting::Entity).into(),
            Relation::StageHistory => Entity::has_many(super::stage_history::Entity).into(),
            Relation::PitchRecord => Entity::has_many(super::pitch_record::Entity).into(),
            Relation::OneOnOneRecord => Entity::has_many(super::one_on_one_record::Entity).into(),
            Relation::Achievement => Entity::has_many(super::achievement::Entity).into(),
            Relation::RevenueEntry => Entity::has_many(super::revenue_entry::Entity).into(),
            Relation::ProgressSnapshot => {
                Entity::has_many(super::progress_snapshot::Entity).into()
            }
        }
    }
}

/// Pipeline position. S0..S3 advance one step per completed pitch session;
/// ONE_ON_ONE is entered via a completed one-on-one clinic.
#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "startup_stage")]
pub enum Stage {
    #[sea_orm(string_value = "S0")]
    S0,
    #[sea_orm(string_value = "S1")]
    S1,
    #[sea_orm(string_value = "S2")]
    S2,
    #[sea_orm(string_value = "S3")]
    S3,
    #[sea_orm(string_value = "ONE_ON_ONE")]
    OneOnOne,
    #[sea_orm(string_value = "GRADUATED")]
    Graduated,
    #[sea_orm(string_value = "QUIT")]
    Quit,
}

impl Stage {
    /// Next stage reached by completing an SMC/FMC pitch session.
    /// S3 and everything past it has no automatic advancement.
    pub fn pitch_successor(self) -> Option<Stage> {
        match self {
            Stage::S0 => Some(Stage::S1),
            Stage::S1 => Some(Stage::S2),
            Stage::S2 => Some(Stage::S3),
            Stage::S3 | Stage::OneOnOne | Stage::Graduated | Stage::Quit => None,
        }
    }

    /// True while the startup still sits in the mentorship pipeline.
    pub fn in_pipeline(self) -> bool {
        matches!(
            self,
            Stage::S0 | Stage::S1 | Stage::S2 | Stage::S3 | Stage::OneOnOne
        )
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Stage::S0 => "S0",
            Stage::S1 => "S1",
            Stage::S2 => "S2",
            Stage::S3 => "S3",
            Stage::OneOnOne => "ONE_ON_ONE",
            Stage::Graduated => "GRADUATED",
            Stage::Quit => "QUIT",
        }
    }
}

/// Lifecycle outcome, orthogonal to the pipeline stage.
#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "startup_status")]
pub enum Status {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "ONBOARDED")]
    Onboarded,
    #[sea_orm(string_value = "GRADUATED")]
    Graduated,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "INACTIVE")]
    Inactive,
    #[sea_orm(string_value = "QUIT")]
    Quit,
}

impl Status {
    /// Statuses that have already exited the pipeline; excluded from the
    /// inactivity scan regardless of age.
    pub fn has_exited(self) -> bool {
        matches!(self, Status::Onboarded | Status::Graduated | Status::Rejected)
    }

    /// Graduated/Rejected startups are view-locked for profile edits.
    pub fn is_locked(self) -> bool {
        matches!(self, Status::Graduated | Status::Rejected)
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Onboarded => "ONBOARDED",
            Status::Graduated => "GRADUATED",
            Status::Rejected => "REJECTED",
            Status::Inactive => "INACTIVE",
            Status::Quit => "QUIT",
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
