//! Readers that turn uploaded CSV/XLSX bytes into header-keyed rows.
//!
//! Both readers lowercase and trim header names, verify the required columns
//! are present before any row is produced, and represent every cell as a
//! string; typed validation happens later, per row, in the importer.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::errors::ServiceError;

/// Columns every import file must declare.
pub const REQUIRED_COLUMNS: [&str; 4] = ["invoice_number", "store_number", "vendor_name", "amount"];

/// A single data row keyed by lowercased header name.
pub type Row = HashMap<String, String>;

/// Parses CSV bytes (UTF-8, optional BOM) into rows.
pub fn read_csv(bytes: &[u8]) -> Result<Vec<Row>, ServiceError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| ServiceError::Validation("File is not valid UTF-8".to_string()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ServiceError::Validation(format!("Malformed CSV header: {e}")))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    ensure_required_columns(&headers)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| ServiceError::Validation(format!("Malformed CSV row: {e}")))?;
        let mut row = Row::new();
        for (idx, header) in headers.iter().enumerate() {
            let value = record.get(idx).unwrap_or("").to_string();
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Parses an XLSX/XLS workbook's first sheet into rows.
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<Row>, ServiceError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| ServiceError::Validation(format!("Could not open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ServiceError::Validation("Workbook has no sheets".to_string()))?
        .map_err(|e| ServiceError::Validation(format!("Could not read worksheet: {e}")))?;

    let mut row_iter = range.rows();
    let headers: Vec<String> = row_iter
        .next()
        .map(|cells| {
            cells
                .iter()
                .map(|c| cell_to_string(c).trim().to_lowercase())
                .collect()
        })
        .unwrap_or_default();
    ensure_required_columns(&headers)?;

    let mut rows = Vec::new();
    for cells in row_iter {
        let mut row = Row::new();
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = cells.get(idx).map(cell_to_string).unwrap_or_default();
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn ensure_required_columns(headers: &[String]) -> Result<(), ServiceError> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|h| h == *required))
        .copied()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "File must contain columns: {}",
            REQUIRED_COLUMNS.join(", ")
        )))
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            // Spreadsheets store integers as floats; render 1001.0 as "1001".
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                format!("{f}")
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.date().format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}
