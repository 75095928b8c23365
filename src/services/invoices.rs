use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};
use tracing::{info, instrument};

use super::to_money;
use crate::entities::invoice::{InvoiceStatus, SourceType};
use crate::entities::{check, invoice, user, vendor};
use crate::errors::ServiceError;

/// Filters for the ledger listing.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<String>,
    pub store: Option<String>,
    /// Substring match over invoice number, vendor name, and store number.
    pub search: Option<String>,
}

/// An invoice together with the display fields resolved from its relations.
#[derive(Debug, Clone)]
pub struct InvoiceDetails {
    pub invoice: invoice::Model,
    pub vendor_name: Option<String>,
    pub check_number: Option<String>,
    pub imported_by_name: Option<String>,
}

/// Manual-entry input; the handler has already parsed amount and date.
#[derive(Debug, Clone)]
pub struct ManualInvoiceInput {
    pub invoice_number: String,
    pub store_number: String,
    pub vendor_id: i32,
    pub amount: Decimal,
    pub invoice_date: NaiveDate,
    pub notes: Option<String>,
    pub attachment_filename: Option<String>,
    pub created_by: i32,
}

/// The invoice ledger. Status is only ever written by the transition
/// operations below; there is no raw field patch on it.
#[derive(Clone)]
pub struct InvoiceService {
    db: Arc<DatabaseConnection>,
}

impl InvoiceService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: InvoiceFilter) -> Result<Vec<InvoiceDetails>, ServiceError> {
        let mut query = invoice::Entity::find();

        if let Some(status) = &filter.status {
            query = query.filter(invoice::Column::Status.eq(status.as_str()));
        }
        if let Some(store) = &filter.store {
            query = query.filter(invoice::Column::StoreNumber.eq(store.as_str()));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query
                .join(JoinType::InnerJoin, invoice::Relation::Vendor.def())
                .filter(
                    Condition::any()
                        .add(invoice::Column::InvoiceNumber.contains(search))
                        .add(vendor::Column::Name.contains(search))
                        .add(invoice::Column::StoreNumber.contains(search)),
                );
        }

        let invoices = query
            .order_by_desc(invoice::Column::CreatedAt)
            .order_by_desc(invoice::Column::Id)
            .all(&*self.db)
            .await?;

        self.hydrate(invoices).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, invoice_id: i32) -> Result<InvoiceDetails, ServiceError> {
        let invoice = self.fetch(invoice_id).await?;
        let mut details = self.hydrate(vec![invoice]).await?;
        Ok(details.remove(0))
    }

    #[instrument(skip(self))]
    pub async fn find_by_number(
        &self,
        invoice_number: &str,
    ) -> Result<Option<invoice::Model>, ServiceError> {
        invoice::Entity::find()
            .filter(invoice::Column::InvoiceNumber.eq(invoice_number))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    /// Metadata-only update. Notes is deliberately the only patchable field;
    /// status and check linkage move through transitions.
    #[instrument(skip(self, notes))]
    pub async fn update_notes(
        &self,
        invoice_id: i32,
        notes: Option<String>,
    ) -> Result<InvoiceDetails, ServiceError> {
        let existing = self.fetch(invoice_id).await?;

        let mut active: invoice::ActiveModel = existing.into();
        active.notes = Set(notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        let mut details = self.hydrate(vec![updated]).await?;
        Ok(details.remove(0))
    }

    /// PENDING -> APPROVED. Fails with the current status on any other input
    /// state; calling twice fails the second time.
    #[instrument(skip(self))]
    pub async fn approve(&self, invoice_id: i32) -> Result<InvoiceDetails, ServiceError> {
        let existing = self.fetch(invoice_id).await?;

        if existing.status != InvoiceStatus::Pending.to_string() {
            return Err(ServiceError::InvalidState(format!(
                "Cannot approve invoice with status {}",
                existing.status
            )));
        }

        let invoice_number = existing.invoice_number.clone();
        let mut active: invoice::ActiveModel = existing.into();
        active.status = Set(InvoiceStatus::Approved.to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!("Invoice {} approved", invoice_number);

        let mut details = self.hydrate(vec![updated]).await?;
        Ok(details.remove(0))
    }

    /// Creates a PENDING invoice from manual entry, optionally carrying an
    /// attachment filename that the caller has staged.
    #[instrument(skip(self, input), fields(invoice_number = %input.invoice_number))]
    pub async fn create_manual(
        &self,
        input: ManualInvoiceInput,
    ) -> Result<InvoiceDetails, ServiceError> {
        if self.find_by_number(&input.invoice_number).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Invoice {} already exists",
                input.invoice_number
            )));
        }

        let vendor = vendor::Entity::find_by_id(input.vendor_id)
            .one(&*self.db)
            .await?;
        if vendor.is_none() {
            return Err(ServiceError::Validation("Vendor not found".to_string()));
        }

        let source = if input.attachment_filename.is_some() {
            SourceType::Upload
        } else {
            SourceType::Manual
        };

        let now = Utc::now();
        let created = invoice::ActiveModel {
            invoice_number: Set(input.invoice_number),
            store_number: Set(input.store_number),
            vendor_id: Set(input.vendor_id),
            amount: Set(to_money(input.amount)),
            invoice_date: Set(input.invoice_date),
            status: Set(InvoiceStatus::Pending.to_string()),
            check_id: Set(None),
            notes: Set(input.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())),
            attachment_filename: Set(input.attachment_filename),
            source_type: Set(source.to_string()),
            imported_by_id: Set(Some(input.created_by)),
            imported_at: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!("Invoice {} created manually", created.invoice_number);

        let mut details = self.hydrate(vec![created]).await?;
        Ok(details.remove(0))
    }

    async fn fetch(&self, invoice_id: i32) -> Result<invoice::Model, ServiceError> {
        invoice::Entity::find_by_id(invoice_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))
    }

    /// Batch-resolves the vendor, check, and importer rows referenced by a
    /// page of invoices.
    async fn hydrate(
        &self,
        invoices: Vec<invoice::Model>,
    ) -> Result<Vec<InvoiceDetails>, ServiceError> {
        let vendor_ids: Vec<i32> = invoices.iter().map(|i| i.vendor_id).collect();
        let check_ids: Vec<i32> = invoices.iter().filter_map(|i| i.check_id).collect();
        let user_ids: Vec<i32> = invoices.iter().filter_map(|i| i.imported_by_id).collect();

        let vendors: HashMap<i32, String> = if vendor_ids.is_empty() {
            HashMap::new()
        } else {
            vendor::Entity::find()
                .filter(vendor::Column::Id.is_in(vendor_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|v| (v.id, v.name))
                .collect()
        };

        let checks: HashMap<i32, String> = if check_ids.is_empty() {
            HashMap::new()
        } else {
            check::Entity::find()
                .filter(check::Column::Id.is_in(check_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|c| (c.id, c.check_number))
                .collect()
        };

        let users: HashMap<i32, String> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            user::Entity::find()
                .filter(user::Column::Id.is_in(user_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|u| (u.id, u.full_name))
                .collect()
        };

        Ok(invoices
            .into_iter()
            .map(|mut invoice| {
                invoice.amount = to_money(invoice.amount);
                let vendor_name = vendors.get(&invoice.vendor_id).cloned();
                let check_number = invoice.check_id.and_then(|id| checks.get(&id).cloned());
                let imported_by_name = invoice
                    .imported_by_id
                    .and_then(|id| users.get(&id).cloned());
                InvoiceDetails {
                    invoice,
                    vendor_name,
                    check_number,
                    imported_by_name,
                }
            })
            .collect())
    }
}
