use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::Validate;

/// Ledger workflow states.
///
/// Forward path: PENDING -> APPROVED -> CHECK_GENERATED -> PRINTED -> VOID.
/// Every transition is owned by a dedicated service operation; nothing else
/// writes the status column.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Approved,
    CheckGenerated,
    Printed,
    Void,
}

/// How the invoice entered the ledger.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum SourceType {
    Csv,
    Excel,
    Manual,
    Upload,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Globally unique, not scoped per vendor.
    #[sea_orm(unique)]
    #[validate(length(min = 1, max = 100))]
    pub invoice_number: String,

    pub store_number: String,
    pub vendor_id: i32,
    pub amount: Decimal,
    pub invoice_date: NaiveDate,
    pub status: String,

    /// Set iff status is CHECK_GENERATED, PRINTED, or VOID.
    pub check_id: Option<i32>,

    pub notes: Option<String>,
    pub attachment_filename: Option<String>,
    pub source_type: String,
    pub imported_by_id: Option<i32>,
    pub imported_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Parses the stored status string; rows only ever hold values written by
    /// the workflow service, so a parse failure indicates a corrupted row.
    pub fn status(&self) -> Result<InvoiceStatus, strum::ParseError> {
        self.status.parse()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vendor::Entity",
        from = "Column::VendorId",
        to = "super::vendor::Column::Id"
    )]
    Vendor,
    #[sea_orm(
        belongs_to = "super::check::Entity",
        from = "Column::CheckId",
        to = "super::check::Column::Id"
    )]
    Check,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ImportedById",
        to = "super::user::Column::Id"
    )]
    ImportedBy,
}

impl Related<super::vendor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendor.def()
    }
}

impl Related<super::check::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Check.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ImportedBy.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
