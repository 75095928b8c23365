//! Fixed-layout check rendering.
//!
//! One US-letter page: header with check number and date, payee line, amount,
//! memo, signature line, and a detachable stub block for records. Positions
//! are inches from the top-left corner, converted to printpdf's
//! bottom-left-origin millimeters.

use chrono::NaiveDate;
use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};
use rust_decimal::Decimal;

use crate::errors::ServiceError;

const PAGE_WIDTH_MM: f64 = 215.9;
const PAGE_HEIGHT_MM: f64 = 279.4;
const MM_PER_INCH: f64 = 25.4;

/// Everything the layout needs from a check and its relations.
#[derive(Debug, Clone)]
pub struct CheckDocument {
    pub check_number: String,
    pub issue_date: NaiveDate,
    pub payee: String,
    pub amount: Decimal,
    pub memo: Option<String>,
    pub invoice_number: Option<String>,
}

/// Renders the single-page check PDF.
pub fn render_check(doc_data: &CheckDocument) -> Result<Vec<u8>, ServiceError> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Check {}", doc_data.check_number),
        Mm(PAGE_WIDTH_MM as _),
        Mm(PAGE_HEIGHT_MM as _),
        "check",
    );
    let layer = doc.get_page(page).get_layer(layer);

    let helvetica = builtin_font(&doc, BuiltinFont::Helvetica)?;
    let helvetica_bold = builtin_font(&doc, BuiltinFont::HelveticaBold)?;

    let date = doc_data.issue_date.format("%m/%d/%Y").to_string();
    let amount = format!("${}", format_amount(doc_data.amount));

    // Header
    text(&layer, "CHECK", 16.0, 1.0, 1.0, &helvetica_bold);
    text(
        &layer,
        &format!("Check #: {}", doc_data.check_number),
        10.0,
        5.9,
        1.0,
        &helvetica,
    );
    text(&layer, &format!("Date: {date}"), 10.0, 5.9, 1.2, &helvetica);

    // Payee
    text(
        &layer,
        &format!("Pay to the order of: {}", doc_data.payee),
        11.0,
        1.0,
        1.8,
        &helvetica,
    );
    text(&layer, &amount, 14.0, 6.0, 1.8, &helvetica_bold);

    // Memo
    if let Some(memo) = &doc_data.memo {
        text(&layer, &format!("Memo: {memo}"), 9.0, 1.0, 2.3, &helvetica);
    }

    // Signature line
    rule(&layer, 1.0, 7.5, 2.8);
    text(&layer, "Authorized Signature", 8.0, 1.0, 3.0, &helvetica);

    // Stub
    rule(&layer, 0.5, 8.0, 3.5);
    text(
        &layer,
        "CHECK STUB - RETAIN FOR YOUR RECORDS",
        10.0,
        1.0,
        4.0,
        &helvetica_bold,
    );

    let mut offset = 4.4;
    let mut stub_lines = vec![
        format!("Check Number: {}", doc_data.check_number),
        format!("Date: {date}"),
        format!("Vendor: {}", doc_data.payee),
        format!("Amount: {amount}"),
    ];
    if let Some(invoice_number) = &doc_data.invoice_number {
        stub_lines.push(format!("Invoice: {invoice_number}"));
    }
    for line in stub_lines {
        text(&layer, &line, 9.0, 1.0, offset, &helvetica);
        offset += 0.2;
    }

    doc.save_to_bytes()
        .map_err(|e| ServiceError::Internal(format!("PDF rendering failed: {e}")))
}

fn builtin_font(
    doc: &printpdf::PdfDocumentReference,
    font: BuiltinFont,
) -> Result<IndirectFontRef, ServiceError> {
    doc.add_builtin_font(font)
        .map_err(|e| ServiceError::Internal(format!("PDF font setup failed: {e}")))
}

/// Places text at (x inches from the left, y inches from the top).
fn text(
    layer: &PdfLayerReference,
    content: &str,
    size: f64,
    x_in: f64,
    y_from_top_in: f64,
    font: &IndirectFontRef,
) {
    layer.use_text(
        content,
        size as _,
        Mm((x_in * MM_PER_INCH) as _),
        Mm((PAGE_HEIGHT_MM - y_from_top_in * MM_PER_INCH) as _),
        font,
    );
}

/// Horizontal rule spanning x1..x2 inches at the given distance from the top.
fn rule(layer: &PdfLayerReference, x1_in: f64, x2_in: f64, y_from_top_in: f64) {
    let y = Mm((PAGE_HEIGHT_MM - y_from_top_in * MM_PER_INCH) as _);
    let line = Line {
        points: vec![
            (Point::new(Mm((x1_in * MM_PER_INCH) as _), y), false),
            (Point::new(Mm((x2_in * MM_PER_INCH) as _), y), false),
        ],
        is_closed: false,
    };
    layer.add_line(line);
}

/// Thousands-separated fixed-point amount: 1234.5 -> "1,234.50".
fn format_amount(amount: Decimal) -> String {
    let mut normalized = amount.round_dp(2);
    normalized.rescale(2);
    let rendered = normalized.to_string();

    let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered.as_str(), "00"));
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::new();
    for (idx, ch) in digits.chars().enumerate() {
        let remaining = digits.len() - idx;
        if idx > 0 && remaining % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}{grouped}.{frac_part}")
}
