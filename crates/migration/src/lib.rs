pub use sea_orm_migration::prelude::*;

mod m20260110_000001_auth_init;
mod m20260110_000002_incubator_core;
mod m20260110_000003_startup_records;

pub struct Migrator;
#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260110_000001_auth_init::Migration),
            Box::new(m20260110_000002_incubator_core::Migration),
            Box::new(m20260110_000003_startup_records::Migration),
        ]
    }
}
