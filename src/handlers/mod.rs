pub mod auth;
pub mod checks;
pub mod common;
pub mod health;
pub mod invoices;
pub mod vendors;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::services::checks::CheckService;
use crate::services::importer::ImportService;
use crate::services::invoices::InvoiceService;
use crate::services::users::UserService;
use crate::services::vendors::VendorService;

/// Aggregate of the domain services used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub users: UserService,
    pub vendors: VendorService,
    pub invoices: InvoiceService,
    pub checks: CheckService,
    pub importer: ImportService,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            users: UserService::new(db.clone()),
            vendors: VendorService::new(db.clone()),
            invoices: InvoiceService::new(db.clone()),
            checks: CheckService::new(db.clone()),
            importer: ImportService::new(db),
        }
    }
}
