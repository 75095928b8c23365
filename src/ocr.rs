//! OCR-assisted invoice field extraction.
//!
//! Text extraction itself is an external collaborator: `CommandTextExtractor`
//! shells out to `tesseract` for images and `pdftotext` for PDFs. What lives
//! here is the best-effort field parsing over whatever text came back:
//! invoice number, total amount, and invoice date, as regex guesses with no
//! confidence model.

use std::path::PathBuf;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::services::importer::parse_date_permissive;

/// Best-guess fields parsed from OCR text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedFields {
    pub invoice_number: Option<String>,
    pub amount: Option<String>,
    pub invoice_date: Option<String>,
    pub raw_text: String,
}

/// Seam for the external text-extraction step.
#[axum::async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, bytes: &[u8], filename: &str) -> Result<String, ServiceError>;
}

/// Extracts text by invoking the system `tesseract` / `pdftotext` binaries on
/// a temporary copy of the upload.
pub struct CommandTextExtractor;

#[axum::async_trait]
impl TextExtractor for CommandTextExtractor {
    async fn extract_text(&self, bytes: &[u8], filename: &str) -> Result<String, ServiceError> {
        let is_pdf = filename.to_lowercase().ends_with(".pdf");

        let tmp_path = scratch_path(filename);
        tokio::fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| ServiceError::Internal(format!("could not write scratch file: {e}")))?;

        let output = if is_pdf {
            Command::new("pdftotext")
                .arg(&tmp_path)
                .arg("-")
                .output()
                .await
        } else {
            Command::new("tesseract")
                .arg(&tmp_path)
                .arg("stdout")
                .output()
                .await
        };

        let _ = tokio::fs::remove_file(&tmp_path).await;

        let output = output.map_err(|e| {
            ServiceError::Internal(format!("text extraction command failed to start: {e}"))
        })?;

        if !output.status.success() {
            return Err(ServiceError::Internal(format!(
                "text extraction exited with {}",
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn scratch_path(filename: &str) -> PathBuf {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    std::env::temp_dir().join(format!("checkflow-ocr-{}.{}", Uuid::new_v4().simple(), ext))
}

static INVOICE_NUMBER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(?:invoice|inv|no|number|#)\s*[.:#]?\s*(\w[\w\-/]+)").unwrap(),
        Regex::new(r"(?i)(INV[-\s]?\d+)").unwrap(),
        Regex::new(r"NO\.\s*(\d+)").unwrap(),
    ]
});

static AMOUNT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(
            r"(?i)(?:total|grand\s*total|amount\s*due|balance\s*due|net\s*amount)\s*[:\s]*\$?\s*([\d,]+\.?\d*)",
        )
        .unwrap(),
    ]
});

static DOLLAR_AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\s*([\d,]+\.?\d*)").unwrap());

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // 02 June, 2030 / June 02, 2030
        Regex::new(r"(?i)(\d{1,2}\s+(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\w*[,.\s]+\d{4})")
            .unwrap(),
        Regex::new(r"(?i)((?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\w*\s+\d{1,2}[,.\s]+\d{4})")
            .unwrap(),
        // MM/DD/YYYY or MM-DD-YYYY
        Regex::new(r"(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})").unwrap(),
        // YYYY-MM-DD
        Regex::new(r"(\d{4}[/-]\d{1,2}[/-]\d{1,2})").unwrap(),
    ]
});

/// Parses OCR text into field guesses.
pub fn parse_invoice_fields(text: &str) -> ExtractedFields {
    let mut result = ExtractedFields {
        invoice_number: None,
        amount: None,
        invoice_date: None,
        raw_text: text.to_string(),
    };

    for pattern in INVOICE_NUMBER_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text) {
            result.invoice_number = Some(captures[1].trim().to_string());
            break;
        }
    }

    // A labeled total wins; otherwise fall back to the largest dollar amount
    // on the page.
    for pattern in AMOUNT_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text) {
            if let Some(amount) = normalize_amount(&captures[1]) {
                result.amount = Some(amount);
            }
            break;
        }
    }
    if result.amount.is_none() {
        result.amount = DOLLAR_AMOUNT
            .captures_iter(text)
            .filter_map(|c| normalize_amount(&c[1]))
            .max_by(|a, b| {
                let a = Decimal::from_str(a).unwrap_or_default();
                let b = Decimal::from_str(b).unwrap_or_default();
                a.cmp(&b)
            });
    }

    for pattern in DATE_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text) {
            let raw = captures[1].trim();
            // Normalize to YYYY-MM-DD where the permissive parser can; keep
            // the raw match otherwise.
            result.invoice_date = Some(
                parse_date_permissive(&raw.replace('.', " "))
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| raw.to_string()),
            );
            break;
        }
    }

    result
}

fn normalize_amount(raw: &str) -> Option<String> {
    let cleaned = raw.replace(',', "");
    let trimmed = cleaned.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed).ok().map(|d| d.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_fields_are_extracted() {
        let text = "ACME SUPPLY CO\nInvoice: INV-2044\nDate: 06/02/2030\n\nWidgets  $120.00\nTotal: $1,234.56\n";
        let fields = parse_invoice_fields(text);
        assert_eq!(fields.invoice_number.as_deref(), Some("INV-2044"));
        assert_eq!(fields.amount.as_deref(), Some("1234.56"));
        assert_eq!(fields.invoice_date.as_deref(), Some("2030-06-02"));
    }

    #[test]
    fn amount_falls_back_to_largest_dollar_value() {
        let text = "Shipping $12.00\nParts $450.25\nHandling $3.10";
        let fields = parse_invoice_fields(text);
        assert_eq!(fields.amount.as_deref(), Some("450.25"));
    }

    #[test]
    fn written_out_dates_are_normalized() {
        let text = "Statement issued 02 June, 2030 for account 9";
        let fields = parse_invoice_fields(text);
        assert_eq!(fields.invoice_date.as_deref(), Some("2030-06-02"));
    }

    #[test]
    fn empty_text_yields_no_guesses() {
        let fields = parse_invoice_fields("");
        assert_eq!(fields.invoice_number, None);
        assert_eq!(fields.amount, None);
        assert_eq!(fields.invoice_date, None);
    }
}
