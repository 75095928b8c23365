use sea_orm_migration::prelude::*;

use crate::m20240610_000001_create_vendors_table::Vendors;
use crate::m20240610_000002_create_users_table::Users;
use crate::m20240610_000003_create_checks_table::Checks;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Invoices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Invoices::InvoiceNumber)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Invoices::StoreNumber)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::VendorId).integer().not_null())
                    .col(
                        ColumnDef::new(Invoices::Amount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::InvoiceDate).date().not_null())
                    .col(
                        ColumnDef::new(Invoices::Status)
                            .string_len(30)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Invoices::CheckId).integer().null())
                    .col(ColumnDef::new(Invoices::Notes).string_len(1000).null())
                    .col(
                        ColumnDef::new(Invoices::AttachmentFilename)
                            .string_len(500)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::SourceType)
                            .string_len(20)
                            .not_null()
                            .default("csv"),
                    )
                    .col(ColumnDef::new(Invoices::ImportedById).integer().null())
                    .col(
                        ColumnDef::new(Invoices::ImportedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_vendor")
                            .from(Invoices::Table, Invoices::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_check")
                            .from(Invoices::Table, Invoices::CheckId)
                            .to(Checks::Table, Checks::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_imported_by")
                            .from(Invoices::Table, Invoices::ImportedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_status")
                    .table(Invoices::Table)
                    .col(Invoices::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_store_number")
                    .table(Invoices::Table)
                    .col(Invoices::StoreNumber)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Invoices {
    Table,
    Id,
    InvoiceNumber,
    StoreNumber,
    VendorId,
    Amount,
    InvoiceDate,
    Status,
    CheckId,
    Notes,
    AttachmentFilename,
    SourceType,
    ImportedById,
    ImportedAt,
    CreatedAt,
    UpdatedAt,
}
