use axum::{
    extract::{Json, Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::common::{created_response, success_response};
use crate::auth::{Capability, CurrentUser};
use crate::entities::check;
use crate::errors::ServiceError;
use crate::pdf::{self, CheckDocument};
use crate::services::checks::CheckDetails;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateCheckRequest {
    pub invoice_id: i32,
    pub memo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub id: i32,
    pub check_number: String,
    pub vendor_id: i32,
    pub vendor_name: Option<String>,
    pub amount: Decimal,
    pub status: String,
    pub issue_date: NaiveDate,
    pub memo: Option<String>,
    pub invoice_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CheckDetails> for CheckResponse {
    fn from(details: CheckDetails) -> Self {
        let check = details.check;
        Self {
            id: check.id,
            check_number: check.check_number,
            vendor_id: check.vendor_id,
            vendor_name: details.vendor_name,
            amount: check.amount,
            status: check.status,
            issue_date: check.issue_date,
            memo: check.memo,
            invoice_number: details.invoice_number,
            created_at: check.created_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_checks).post(generate_check))
        .route("/:id", get(get_check))
        .route("/:id/print", post(mark_printed))
        .route("/:id/void", post(void_check))
        .route("/:id/pdf", get(download_pdf))
}

async fn list_checks(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::ChecksRead)?;
    let checks = state.services.checks.list().await?;
    Ok(success_response(
        checks
            .into_iter()
            .map(CheckResponse::from)
            .collect::<Vec<_>>(),
    ))
}

async fn get_check(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(check_id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::ChecksRead)?;
    let details = state.services.checks.get(check_id).await?;
    Ok(success_response(CheckResponse::from(details)))
}

/// Issues a check for an APPROVED invoice.
async fn generate_check(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<GenerateCheckRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::ChecksIssue)?;

    let details = state
        .services
        .checks
        .issue(payload.invoice_id, payload.memo)
        .await?;

    info!(
        "Check {} generated by {}",
        details.check.check_number, user.user.email
    );
    Ok(created_response(CheckResponse::from(details)))
}

async fn mark_printed(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(check_id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::ChecksIssue)?;
    let details = state.services.checks.mark_printed(check_id).await?;
    Ok(success_response(CheckResponse::from(details)))
}

async fn void_check(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(check_id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::ChecksIssue)?;
    let details = state.services.checks.void(check_id).await?;
    Ok(success_response(CheckResponse::from(details)))
}

/// Renders and downloads the single-page check PDF.
async fn download_pdf(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(check_id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::ChecksRead)?;

    let details = state.services.checks.get(check_id).await?;
    let bytes = pdf::render_check(&to_document(&details))?;

    let disposition = format!(
        "attachment; filename=\"check_{}.pdf\"",
        details.check.check_number
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

fn to_document(details: &CheckDetails) -> CheckDocument {
    let check: &check::Model = &details.check;
    CheckDocument {
        check_number: check.check_number.clone(),
        issue_date: check.issue_date,
        payee: details
            .vendor_name
            .clone()
            .unwrap_or_else(|| "N/A".to_string()),
        amount: check.amount,
        memo: check.memo.clone(),
        invoice_number: details.invoice_number.clone(),
    }
}
