use sea_orm_migration::prelude::*;

use crate::m20240610_000001_create_vendors_table::Vendors;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Checks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Checks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Checks::CheckNumber)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Checks::VendorId).integer().not_null())
                    .col(
                        ColumnDef::new(Checks::Amount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Checks::Status)
                            .string_len(30)
                            .not_null()
                            .default("GENERATED"),
                    )
                    .col(ColumnDef::new(Checks::IssueDate).date().not_null())
                    .col(ColumnDef::new(Checks::Memo).string_len(500).null())
                    .col(
                        ColumnDef::new(Checks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Checks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checks_vendor")
                            .from(Checks::Table, Checks::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Checks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Checks {
    Table,
    Id,
    CheckNumber,
    VendorId,
    Amount,
    Status,
    IssueDate,
    Memo,
    CreatedAt,
    UpdatedAt,
}
