use axum::{
    extract::{Json, Multipart, Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::common::{multipart_error, success_response};
use crate::auth::{Capability, CurrentUser};
use crate::entities::invoice::SourceType;
use crate::errors::ServiceError;
use crate::import::tabular;
use crate::ocr;
use crate::services::importer::{parse_amount, parse_date_permissive};
use crate::services::invoices::{InvoiceDetails, InvoiceFilter, ManualInvoiceInput};
use crate::storage::AttachmentStore;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InvoiceListQuery {
    pub status: Option<String>,
    pub store: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceUpdateRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: i32,
    pub invoice_number: String,
    pub store_number: String,
    pub vendor_id: i32,
    pub vendor_name: Option<String>,
    pub amount: Decimal,
    pub invoice_date: NaiveDate,
    pub status: String,
    pub check_id: Option<i32>,
    pub check_number: Option<String>,
    pub notes: Option<String>,
    pub attachment_filename: Option<String>,
    pub source_type: String,
    pub imported_by_name: Option<String>,
    pub imported_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<InvoiceDetails> for InvoiceResponse {
    fn from(details: InvoiceDetails) -> Self {
        let invoice = details.invoice;
        Self {
            id: invoice.id,
            invoice_number: invoice.invoice_number,
            store_number: invoice.store_number,
            vendor_id: invoice.vendor_id,
            vendor_name: details.vendor_name,
            amount: invoice.amount,
            invoice_date: invoice.invoice_date,
            status: invoice.status,
            check_id: invoice.check_id,
            check_number: details.check_number,
            notes: invoice.notes,
            attachment_filename: invoice.attachment_filename,
            source_type: invoice.source_type,
            imported_by_name: details.imported_by_name,
            imported_at: invoice.imported_at,
            created_at: invoice.created_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invoices))
        .route("/import", post(import_file))
        .route("/create", post(create_invoice))
        .route("/ocr", post(ocr_extract))
        .route("/attachment/:filename", get(get_attachment))
        .route("/:id", get(get_invoice))
        .route("/:id", put(update_invoice))
        .route("/:id/approve", post(approve_invoice))
}

async fn list_invoices(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<InvoiceListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::InvoicesRead)?;

    let details = state
        .services
        .invoices
        .list(InvoiceFilter {
            status: query.status,
            store: query.store,
            search: query.search,
        })
        .await?;

    Ok(success_response(
        details
            .into_iter()
            .map(InvoiceResponse::from)
            .collect::<Vec<_>>(),
    ))
}

async fn get_invoice(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(invoice_id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::InvoicesRead)?;
    let details = state.services.invoices.get(invoice_id).await?;
    Ok(success_response(InvoiceResponse::from(details)))
}

/// Metadata patch; notes is the only writable field. Workflow state moves
/// through the approve and check endpoints exclusively.
async fn update_invoice(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(invoice_id): Path<i32>,
    Json(payload): Json<InvoiceUpdateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::InvoicesWrite)?;
    let details = state
        .services
        .invoices
        .update_notes(invoice_id, payload.notes)
        .await?;
    Ok(success_response(InvoiceResponse::from(details)))
}

async fn approve_invoice(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(invoice_id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::InvoicesApprove)?;
    let details = state.services.invoices.approve(invoice_id).await?;
    Ok(success_response(InvoiceResponse::from(details)))
}

/// Bulk import from a CSV or spreadsheet upload.
async fn import_file(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::InvoicesWrite)?;

    let mut filename = String::new();
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or_default().to_lowercase();
            bytes = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
        }
    }

    let bytes =
        bytes.ok_or_else(|| ServiceError::Validation("No file was uploaded".to_string()))?;

    let (rows, source) = if filename.ends_with(".csv") {
        (tabular::read_csv(&bytes)?, SourceType::Csv)
    } else if filename.ends_with(".xlsx") || filename.ends_with(".xls") {
        (tabular::read_workbook(&bytes)?, SourceType::Excel)
    } else {
        return Err(ServiceError::Validation(
            "File must be .csv or .xlsx".to_string(),
        ));
    };

    let summary = state
        .services
        .importer
        .import_rows(rows, source, user.id())
        .await?;

    info!(
        "Import by {}: {} imported, {} duplicates, {} errors",
        user.user.email,
        summary.imported,
        summary.skipped_duplicates,
        summary.errors.len()
    );

    Ok(success_response(summary))
}

/// Manual entry with an optional attachment. The upload is staged first and
/// only promoted once the ledger row exists; a failed insert discards it.
async fn create_invoice(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::InvoicesWrite)?;

    let mut invoice_number = None;
    let mut store_number = None;
    let mut vendor_id = None;
    let mut amount_raw = None;
    let mut date_raw = None;
    let mut notes = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "invoice_number" => {
                invoice_number = Some(field.text().await.map_err(multipart_error)?)
            }
            "store_number" => store_number = Some(field.text().await.map_err(multipart_error)?),
            "vendor_id" => vendor_id = Some(field.text().await.map_err(multipart_error)?),
            "amount" => amount_raw = Some(field.text().await.map_err(multipart_error)?),
            "invoice_date" => date_raw = Some(field.text().await.map_err(multipart_error)?),
            "notes" => notes = Some(field.text().await.map_err(multipart_error)?),
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?.to_vec();
                if !filename.is_empty() && !data.is_empty() {
                    upload = Some((filename, data));
                }
            }
            _ => {}
        }
    }

    let invoice_number = require_field(invoice_number, "invoice_number")?;
    let store_number = require_field(store_number, "store_number")?;
    let vendor_raw = require_field(vendor_id, "vendor_id")?;
    let amount_raw = require_field(amount_raw, "amount")?;
    let date_raw = require_field(date_raw, "invoice_date")?;

    let vendor_id: i32 = vendor_raw
        .trim()
        .parse()
        .map_err(|_| ServiceError::Validation(format!("Invalid vendor id: {vendor_raw}")))?;
    let amount = parse_amount(amount_raw.trim())
        .ok_or_else(|| ServiceError::Validation(format!("Invalid amount: {amount_raw}")))?;
    let invoice_date = parse_date_permissive(&date_raw)
        .ok_or_else(|| ServiceError::Validation(format!("Invalid date: {date_raw}")))?;

    let staged = match &upload {
        Some((name, data)) => Some(state.attachments.stage(name, data).await?),
        None => None,
    };

    let result = state
        .services
        .invoices
        .create_manual(ManualInvoiceInput {
            invoice_number: invoice_number.trim().to_string(),
            store_number: store_number.trim().to_string(),
            vendor_id,
            amount,
            invoice_date,
            notes,
            attachment_filename: staged.as_ref().map(|s| s.filename.clone()),
            created_by: user.id(),
        })
        .await;

    match (result, staged) {
        (Ok(details), Some(staged)) => {
            state.attachments.promote(&staged).await?;
            Ok(success_response(InvoiceResponse::from(details)))
        }
        (Ok(details), None) => Ok(success_response(InvoiceResponse::from(details))),
        (Err(err), Some(staged)) => {
            state.attachments.discard(staged).await;
            Err(err)
        }
        (Err(err), None) => Err(err),
    }
}

/// Serves a stored attachment.
async fn get_attachment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::InvoicesRead)?;

    let bytes = state.attachments.read(&filename).await?;
    let content_type = AttachmentStore::content_type(&filename);

    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

/// OCR field-extraction preview: upload an image or PDF, get back best-guess
/// invoice fields for the entry form.
async fn ocr_extract(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::InvoicesRead)?;

    let mut filename = String::new();
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or_default().to_string();
            bytes = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
        }
    }

    let bytes =
        bytes.ok_or_else(|| ServiceError::Validation("No file was uploaded".to_string()))?;

    if AttachmentStore::allowed_extension(&filename).is_none() {
        return Err(ServiceError::Validation(format!(
            "Unsupported file type: {filename}"
        )));
    }
    if bytes.is_empty() {
        return Err(ServiceError::Validation("Empty file".to_string()));
    }

    let text = state
        .ocr
        .extract_text(&bytes, &filename)
        .await
        .map_err(|e| ServiceError::OcrFailure(e.to_string()))?;

    Ok(success_response(ocr::parse_invoice_fields(&text)))
}

fn require_field(value: Option<String>, name: &str) -> Result<String, ServiceError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ServiceError::Validation(format!("Missing required field: {name}")))
}
