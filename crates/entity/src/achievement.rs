use sea_orm::entity::prelude::*;

/// Achievement records are a tagged union over `Kind`: patents carry a
/// `reference_no`, patents and awards an `issuer`, the rest only the common
/// fields.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "achievement")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub startup_id: Uuid,
    pub kind: Kind,
    pub title: String,
    pub description: Option<String>,
    pub issuer: Option<String>,
    pub reference_no: Option<String>,
    pub achieved_on: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "achievement_kind")]
pub enum Kind {
    #[sea_orm(string_value = "PATENT")]
    Patent,
    #[sea_orm(string_value = "AWARD")]
    Award,
    #[sea_orm(string_value = "SUCCESS_GOAL")]
    SuccessGoal,
    #[sea_orm(string_value = "UPGRADE")]
    Upgrade,
    #[sea_orm(string_value = "UPDATE")]
    Update,
}

impl ActiveModelBehavior for ActiveModel {}
