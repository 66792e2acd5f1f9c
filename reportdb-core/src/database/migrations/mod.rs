pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_runs;
mod m20260301_000002_create_files_and_reports;
mod m20260302_000003_create_review_and_locks;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_runs::Migration),
            Box::new(m20260301_000002_create_files_and_reports::Migration),
            Box::new(m20260302_000003_create_review_and_locks::Migration),
        ]
    }
}
