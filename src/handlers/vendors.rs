use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, put},
    Router,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::auth::{Capability, CurrentUser};
use crate::errors::ServiceError;
use crate::services::vendors::{VendorInput, VendorPatch};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVendorRequest {
    #[validate(length(min = 1, max = 255, message = "Vendor name is required"))]
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVendorRequest {
    #[validate(length(min = 1, max = 255, message = "Vendor name cannot be empty"))]
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vendors).post(create_vendor))
        .route("/:id", get(get_vendor))
        .route("/:id", put(update_vendor))
        .route("/:id", delete(delete_vendor))
}

async fn list_vendors(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::VendorsRead)?;
    let vendors = state.services.vendors.list().await?;
    Ok(success_response(vendors))
}

async fn get_vendor(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(vendor_id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::VendorsRead)?;
    let vendor = state.services.vendors.get(vendor_id).await?;
    Ok(success_response(vendor))
}

async fn create_vendor(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateVendorRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::VendorsManage)?;
    validate_input(&payload)?;

    let created = state
        .services
        .vendors
        .create(VendorInput {
            name: payload.name,
            address: payload.address,
            city: payload.city,
            state: payload.state,
            zip_code: payload.zip_code,
            phone: payload.phone,
            email: payload.email,
        })
        .await?;

    info!("Vendor created: {}", created.id);
    Ok(created_response(created))
}

async fn update_vendor(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(vendor_id): Path<i32>,
    Json(payload): Json<UpdateVendorRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::VendorsManage)?;
    validate_input(&payload)?;

    let updated = state
        .services
        .vendors
        .update(
            vendor_id,
            VendorPatch {
                name: payload.name,
                address: payload.address,
                city: payload.city,
                state: payload.state,
                zip_code: payload.zip_code,
                phone: payload.phone,
                email: payload.email,
            },
        )
        .await?;

    Ok(success_response(updated))
}

async fn delete_vendor(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(vendor_id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::VendorsManage)?;
    state.services.vendors.delete(vendor_id).await?;
    Ok(no_content_response())
}
