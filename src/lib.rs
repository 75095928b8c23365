//! checkflow-api library
//!
//! Invoice-to-check processing backend: bulk invoice import, an approval
//! workflow over the ledger, and check issuance with PDF output.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod import;
pub mod ocr;
pub mod pdf;
pub mod services;
pub mod storage;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub auth: auth::AuthService,
    pub attachments: storage::AttachmentStore,
    pub ocr: Arc<dyn ocr::TextExtractor>,
}

impl AppState {
    /// Wires the service graph from a loaded config and an established pool.
    /// Call `attachments.init()` before serving.
    pub fn new(config: config::AppConfig, db: Arc<DatabaseConnection>) -> Self {
        let services = handlers::AppServices::new(db.clone());
        let auth = auth::AuthService::new(config.jwt_secret.clone(), config.token_expiry());
        let attachments = storage::AttachmentStore::new(config.upload_dir.clone());

        Self {
            db,
            config,
            services,
            auth,
            attachments,
            ocr: Arc::new(ocr::CommandTextExtractor),
        }
    }
}

/// API routes under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", handlers::auth::routes())
        .nest("/api/vendors", handlers::vendors::routes())
        .nest("/api/invoices", handlers::invoices::routes())
        .nest("/api/checks", handlers::checks::routes())
}

/// Full application router with the middleware stack applied.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let max_body = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(handlers::health::health))
        .merge(api_routes())
        .layer(DefaultBodyLimit::max(max_body))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS from config: explicit origins when configured, permissive otherwise.
/// Config validation has already rejected non-development environments that
/// neither configure origins nor opt into the permissive fallback.
fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        info!("Using permissive CORS because explicit origins were not configured");
        CorsLayer::permissive()
    }
}
