use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::to_money;
use super::vendors::VendorService;
use crate::entities::invoice::{self, InvoiceStatus, SourceType};
use crate::errors::ServiceError;
use crate::import::tabular::Row;

/// Outcome of a bulk import. Row failures are non-fatal: the operation always
/// completes and reports per-row errors alongside the counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub errors: Vec<String>,
}

/// Bulk importer: validates and de-duplicates tabular rows into PENDING
/// ledger entries, creating vendors on demand.
#[derive(Clone)]
pub struct ImportService {
    db: Arc<DatabaseConnection>,
    vendors: VendorService,
}

impl ImportService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        let vendors = VendorService::new(db.clone());
        Self { db, vendors }
    }

    /// Imports rows parsed from a CSV or spreadsheet. Rows are processed
    /// independently; a bad row is recorded and skipped, never aborts the
    /// batch. Reported row numbers are 1-based over the original file, so data
    /// row `i` (0-based) is "Row i+2" after the header row.
    #[instrument(skip(self, rows), fields(total = rows.len(), source = %source))]
    pub async fn import_rows(
        &self,
        rows: Vec<Row>,
        source: SourceType,
        imported_by: i32,
    ) -> Result<ImportSummary, ServiceError> {
        let mut summary = ImportSummary {
            total_rows: 0,
            imported: 0,
            skipped_duplicates: 0,
            errors: Vec::new(),
        };

        for (idx, row) in rows.iter().enumerate() {
            summary.total_rows += 1;
            let line = idx + 2;

            let invoice_number = field(row, "invoice_number");
            let store_number = field(row, "store_number");
            let vendor_name = field(row, "vendor_name");
            let amount_raw = field(row, "amount");
            let date_raw = field(row, "invoice_date");
            let notes = field(row, "notes");

            if invoice_number.is_empty()
                || store_number.is_empty()
                || vendor_name.is_empty()
                || amount_raw.is_empty()
            {
                summary
                    .errors
                    .push(format!("Row {line}: missing required field(s)"));
                continue;
            }

            let amount = match parse_amount(&amount_raw) {
                Some(amount) => amount,
                None => {
                    summary
                        .errors
                        .push(format!("Row {line}: invalid amount '{amount_raw}'"));
                    continue;
                }
            };

            let invoice_date = if date_raw.is_empty() {
                Utc::now().date_naive()
            } else {
                match parse_date_permissive(&date_raw) {
                    Some(date) => date,
                    None => {
                        summary
                            .errors
                            .push(format!("Row {line}: invalid date '{date_raw}'"));
                        continue;
                    }
                }
            };

            // Duplicates are skipped silently; they are expected when the same
            // statement file is uploaded twice.
            let existing = invoice::Entity::find()
                .filter(invoice::Column::InvoiceNumber.eq(invoice_number.as_str()))
                .one(&*self.db)
                .await?;
            if existing.is_some() {
                summary.skipped_duplicates += 1;
                continue;
            }

            let vendor = self.vendors.find_or_create(&vendor_name).await?;

            let now = Utc::now();
            invoice::ActiveModel {
                invoice_number: Set(invoice_number),
                store_number: Set(store_number),
                vendor_id: Set(vendor.id),
                amount: Set(to_money(amount)),
                invoice_date: Set(invoice_date),
                status: Set(InvoiceStatus::Pending.to_string()),
                check_id: Set(None),
                notes: Set(if notes.is_empty() { None } else { Some(notes) }),
                attachment_filename: Set(None),
                source_type: Set(source.to_string()),
                imported_by_id: Set(Some(imported_by)),
                imported_at: Set(now),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&*self.db)
            .await?;

            summary.imported += 1;
        }

        info!(
            "Import finished: {} rows, {} imported, {} duplicates, {} errors",
            summary.total_rows,
            summary.imported,
            summary.skipped_duplicates,
            summary.errors.len()
        );

        Ok(summary)
    }
}

fn field(row: &Row, name: &str) -> String {
    row.get(name).map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Parses a fixed-point amount with two fraction digits.
pub(crate) fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw).ok().map(to_money)
}

/// Permissive date parsing over the formats that show up in vendor exports.
pub(crate) fn parse_date_permissive(raw: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 12] = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%m/%d/%y",
        "%m-%d-%Y",
        "%m-%d-%y",
        "%d %B %Y",
        "%d %B, %Y",
        "%d %b %Y",
        "%B %d, %Y",
        "%b %d, %Y",
        "%B %d %Y",
    ];

    let trimmed = raw.trim();
    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}
