use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};
use tracing::{info, instrument, warn};

use super::to_money;
use crate::entities::check::CheckStatus;
use crate::entities::invoice::InvoiceStatus;
use crate::entities::{check, invoice, vendor};
use crate::errors::ServiceError;

/// Concurrent issuers can both read the same max id and mint the same number;
/// the unique key on check_number rejects the loser, and we retry in a fresh
/// transaction instead of surfacing the collision.
const MAX_MINT_ATTEMPTS: u32 = 3;

/// A check together with display fields from its relations.
#[derive(Debug, Clone)]
pub struct CheckDetails {
    pub check: check::Model,
    pub vendor_name: Option<String>,
    pub invoice_number: Option<String>,
}

/// Check issuer: consumes an APPROVED invoice, mints a sequential check
/// number, and owns the GENERATED -> PRINTED -> VOID transitions.
#[derive(Clone)]
pub struct CheckService {
    db: Arc<DatabaseConnection>,
}

impl CheckService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<CheckDetails>, ServiceError> {
        let checks = check::Entity::find()
            .order_by_desc(check::Column::CreatedAt)
            .order_by_desc(check::Column::Id)
            .all(&*self.db)
            .await?;
        self.hydrate(checks).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, check_id: i32) -> Result<CheckDetails, ServiceError> {
        let check = self.fetch(check_id).await?;
        let mut details = self.hydrate(vec![check]).await?;
        Ok(details.remove(0))
    }

    /// Issues a check for an APPROVED, checkless invoice.
    #[instrument(skip(self, memo))]
    pub async fn issue(
        &self,
        invoice_id: i32,
        memo: Option<String>,
    ) -> Result<CheckDetails, ServiceError> {
        for attempt in 1..=MAX_MINT_ATTEMPTS {
            match self.try_issue(invoice_id, memo.clone()).await {
                Err(ServiceError::Database(err)) if is_unique_violation(&err) => {
                    warn!(
                        "check number collision on attempt {}/{} for invoice {}",
                        attempt, MAX_MINT_ATTEMPTS, invoice_id
                    );
                }
                other => return other,
            }
        }

        Err(ServiceError::Conflict(
            "Could not allocate a unique check number; please retry".to_string(),
        ))
    }

    async fn try_issue(
        &self,
        invoice_id: i32,
        memo: Option<String>,
    ) -> Result<CheckDetails, ServiceError> {
        let txn = self.db.begin().await?;

        let inv = invoice::Entity::find_by_id(invoice_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        if inv.status != InvoiceStatus::Approved.to_string() {
            return Err(ServiceError::InvalidState(format!(
                "Invoice must be APPROVED (current: {})",
                inv.status
            )));
        }
        if inv.check_id.is_some() {
            return Err(ServiceError::InvalidState(
                "Invoice already has a check assigned".to_string(),
            ));
        }

        let max_id = check::Entity::find()
            .order_by_desc(check::Column::Id)
            .one(&txn)
            .await?
            .map(|c| c.id)
            .unwrap_or(0);
        let check_number = format_check_number(max_id + 1);

        let now = Utc::now();
        let memo = memo
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Payment for invoice {}", inv.invoice_number));

        let created = check::ActiveModel {
            check_number: Set(check_number),
            vendor_id: Set(inv.vendor_id),
            amount: Set(to_money(inv.amount)),
            status: Set(CheckStatus::Generated.to_string()),
            issue_date: Set(now.date_naive()),
            memo: Set(Some(memo)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let invoice_number = inv.invoice_number.clone();
        let mut inv_active: invoice::ActiveModel = inv.into();
        inv_active.check_id = Set(Some(created.id));
        inv_active.status = Set(InvoiceStatus::CheckGenerated.to_string());
        inv_active.updated_at = Set(now);
        inv_active.update(&txn).await?;

        txn.commit().await?;

        info!(
            "Check {} issued for invoice {}",
            created.check_number, invoice_number
        );

        let mut details = self.hydrate(vec![created]).await?;
        Ok(details.remove(0))
    }

    /// GENERATED -> PRINTED, mirrored onto the linked invoice.
    #[instrument(skip(self))]
    pub async fn mark_printed(&self, check_id: i32) -> Result<CheckDetails, ServiceError> {
        self.transition(check_id, CheckStatus::Printed, InvoiceStatus::Printed, |status| {
            status == CheckStatus::Generated
        })
        .await
    }

    /// GENERATED | PRINTED -> VOID, mirrored onto the linked invoice.
    #[instrument(skip(self))]
    pub async fn void(&self, check_id: i32) -> Result<CheckDetails, ServiceError> {
        self.transition(check_id, CheckStatus::Void, InvoiceStatus::Void, |status| {
            matches!(status, CheckStatus::Generated | CheckStatus::Printed)
        })
        .await
    }

    async fn transition(
        &self,
        check_id: i32,
        to_check: CheckStatus,
        to_invoice: InvoiceStatus,
        allowed_from: impl Fn(CheckStatus) -> bool,
    ) -> Result<CheckDetails, ServiceError> {
        let txn = self.db.begin().await?;

        let existing = check::Entity::find_by_id(check_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Check not found".to_string()))?;

        let current = existing.status().map_err(|_| {
            ServiceError::Internal(format!("corrupt status on check {}", check_id))
        })?;
        if !allowed_from(current) {
            return Err(ServiceError::InvalidState(format!(
                "Cannot transition check with status {} to {}",
                existing.status, to_check
            )));
        }

        let now = Utc::now();
        let mut active: check::ActiveModel = existing.into();
        active.status = Set(to_check.to_string());
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        // The one-to-one back-reference lives on the invoice side.
        if let Some(linked) = invoice::Entity::find()
            .filter(invoice::Column::CheckId.eq(check_id))
            .one(&txn)
            .await?
        {
            let mut inv_active: invoice::ActiveModel = linked.into();
            inv_active.status = Set(to_invoice.to_string());
            inv_active.updated_at = Set(now);
            inv_active.update(&txn).await?;
        }

        txn.commit().await?;

        info!("Check {} transitioned to {}", check_id, to_check);

        let mut details = self.hydrate(vec![updated]).await?;
        Ok(details.remove(0))
    }

    async fn fetch(&self, check_id: i32) -> Result<check::Model, ServiceError> {
        check::Entity::find_by_id(check_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Check not found".to_string()))
    }

    async fn hydrate(&self, checks: Vec<check::Model>) -> Result<Vec<CheckDetails>, ServiceError> {
        let vendor_ids: Vec<i32> = checks.iter().map(|c| c.vendor_id).collect();
        let check_ids: Vec<i32> = checks.iter().map(|c| c.id).collect();

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

        let invoice_numbers: HashMap<i32, String> = if check_ids.is_empty() {
            HashMap::new()
        } else {
            invoice::Entity::find()
                .filter(invoice::Column::CheckId.is_in(check_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .filter_map(|i| i.check_id.map(|cid| (cid, i.invoice_number)))
                .collect()
        };

        Ok(checks
            .into_iter()
            .map(|mut check| {
                check.amount = to_money(check.amount);
                let vendor_name = vendors.get(&check.vendor_id).cloned();
                let invoice_number = invoice_numbers.get(&check.id).cloned();
                CheckDetails {
                    check,
                    vendor_name,
                    invoice_number,
                }
            })
            .collect())
    }
}

/// Zero-padded sequential numbering: first check is CHK-000001.
fn format_check_number(seq: i32) -> String {
    format!("CHK-{:06}", seq)
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_numbers_are_zero_padded_to_six_digits() {
        assert_eq!(format_check_number(1), "CHK-000001");
        assert_eq!(format_check_number(42), "CHK-000042");
        assert_eq!(format_check_number(999_999), "CHK-999999");
        assert_eq!(format_check_number(1_000_000), "CHK-1000000");
    }
}
