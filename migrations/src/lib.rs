pub use sea_orm_migration::prelude::*;

mod m20240610_000001_create_vendors_table;
mod m20240610_000002_create_users_table;
mod m20240610_000003_create_checks_table;
mod m20240610_000004_create_invoices_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240610_000001_create_vendors_table::Migration),
            Box::new(m20240610_000002_create_users_table::Migration),
            Box::new(m20240610_000003_create_checks_table::Migration),
            Box::new(m20240610_000004_create_invoices_table::Migration),
        ]
    }
}
