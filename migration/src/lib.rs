//! Database migrations for the integrations service.

pub use sea_orm_migration::prelude::*;

mod m2025_06_10_090000_create_pending_authorizations;
mod m2025_06_10_090100_create_provider_tokens;
mod m2025_06_10_090200_create_client_registrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_10_090000_create_pending_authorizations::Migration),
            Box::new(m2025_06_10_090100_create_provider_tokens::Migration),
            Box::new(m2025_06_10_090200_create_client_registrations::Migration),
        ]
    }
}
