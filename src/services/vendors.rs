use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use tracing::{info, instrument};

use crate::entities::{check, invoice, vendor};
use crate::errors::ServiceError;

/// Fields accepted when creating or updating a vendor record.
#[derive(Debug, Clone, Default)]
pub struct VendorInput {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct VendorPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Vendor directory: payee records, created explicitly by admins or lazily by
/// the bulk importer.
#[derive(Clone)]
pub struct VendorService {
    db: Arc<DatabaseConnection>,
}

impl VendorService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<vendor::Model>, ServiceError> {
        vendor::Entity::find()
            .order_by_asc(vendor::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, vendor_id: i32) -> Result<vendor::Model, ServiceError> {
        vendor::Entity::find_by_id(vendor_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Vendor not found".to_string()))
    }

    /// Exact-name lookup; names are matched case-sensitively and never
    /// normalized.
    #[instrument(skip(self))]
    pub async fn find_by_name(&self, name: &str) -> Result<Option<vendor::Model>, ServiceError> {
        vendor::Entity::find()
            .filter(vendor::Column::Name.eq(name))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    #[instrument(skip(self, input), fields(vendor_name = %input.name))]
    pub async fn create(&self, input: VendorInput) -> Result<vendor::Model, ServiceError> {
        if self.find_by_name(&input.name).await?.is_some() {
            return Err(ServiceError::Conflict(
                "Vendor with this name already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let created = vendor::ActiveModel {
            name: Set(input.name),
            address: Set(input.address),
            city: Set(input.city),
            state: Set(input.state),
            zip_code: Set(input.zip_code),
            phone: Set(input.phone),
            email: Set(input.email),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!("Vendor created: {} ({})", created.name, created.id);
        Ok(created)
    }

    /// Used by the importer: resolves the vendor for a row, creating a bare
    /// record when the name is new.
    #[instrument(skip(self))]
    pub async fn find_or_create(&self, name: &str) -> Result<vendor::Model, ServiceError> {
        if let Some(existing) = self.find_by_name(name).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let created = vendor::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!("Vendor created during import: {}", created.name);
        Ok(created)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        vendor_id: i32,
        patch: VendorPatch,
    ) -> Result<vendor::Model, ServiceError> {
        let existing = self.get(vendor_id).await?;

        if let Some(new_name) = &patch.name {
            if *new_name != existing.name && self.find_by_name(new_name).await?.is_some() {
                return Err(ServiceError::Conflict(
                    "Vendor with this name already exists".to_string(),
                ));
            }
        }

        let mut active: vendor::ActiveModel = existing.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(address) = patch.address {
            active.address = Set(Some(address));
        }
        if let Some(city) = patch.city {
            active.city = Set(Some(city));
        }
        if let Some(state) = patch.state {
            active.state = Set(Some(state));
        }
        if let Some(zip_code) = patch.zip_code {
            active.zip_code = Set(Some(zip_code));
        }
        if let Some(phone) = patch.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(email) = patch.email {
            active.email = Set(Some(email));
        }
        active.updated_at = Set(Utc::now());

        active.update(&*self.db).await.map_err(ServiceError::from)
    }

    /// Deletes a vendor. Vendors referenced by invoices or checks are
    /// protected: ledger history must stay reconstructible.
    #[instrument(skip(self))]
    pub async fn delete(&self, vendor_id: i32) -> Result<(), ServiceError> {
        let existing = self.get(vendor_id).await?;

        let invoice_refs = invoice::Entity::find()
            .filter(invoice::Column::VendorId.eq(vendor_id))
            .count(&*self.db)
            .await?;
        let check_refs = check::Entity::find()
            .filter(check::Column::VendorId.eq(vendor_id))
            .count(&*self.db)
            .await?;

        if invoice_refs > 0 || check_refs > 0 {
            return Err(ServiceError::Conflict(format!(
                "Vendor '{}' is referenced by {} invoice(s) and {} check(s) and cannot be deleted",
                existing.name, invoice_refs, check_refs
            )));
        }

        existing.delete(&*self.db).await?;
        info!("Vendor deleted: {}", vendor_id);
        Ok(())
    }
}
