use sea_orm::entity::prelude::*;

/// Append-only transition ledger. Rows are never updated or deleted once
/// written; they only go away when the owning startup is hard-deleted.
///
/// `from_label`/`to_label` are plain text because a single transition can
/// cross dimensions: a status change records the current *stage* on the from
/// side and the target *status* on the to side (e.g. `S2 -> REJECTED`).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "stage_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub startup_id: Uuid,
    pub from_label: String,
    pub to_label: String,
    pub reason: Option<String>,
    pub performed_by: Option<String>,
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

impl ActiveModelBehavior for ActiveModel {}
