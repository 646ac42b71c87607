//! Forecast report export (single-page PDF).
//!
//! The page mirrors the dashboard's forecast tab: title, export timestamp, SKU,
//! the wrapped summary and a snapshot of the forecast chart. Layout positions are
//! given in millimetres from the top-left corner of an A4 page.

use std::fs;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use tracing::{debug, info};

use crate::error::AppError;
use crate::plot::{Canvas, ChartManager, ChartSlot};

pub const UNKNOWN_SKU: &str = "UNKNOWN";
pub const NO_SUMMARY: &str = "No summary.";

const PAGE_WIDTH_PT: f64 = 595.0;
const PAGE_HEIGHT_PT: f64 = 842.0;
const PT_PER_MM: f64 = 72.0 / 25.4;

const TITLE: &str = "Sales Forecast Report (AI Forecast)";
const MARGIN_X_MM: f64 = 10.0;
const TITLE_Y_MM: f64 = 20.0;
const TIMESTAMP_Y_MM: f64 = 30.0;
const SKU_Y_MM: f64 = 38.0;
const SUMMARY_LABEL_Y_MM: f64 = 50.0;
const SUMMARY_Y_MM: f64 = 58.0;
const IMAGE_Y_MM: f64 = 105.0;
const IMAGE_W_MM: f64 = 190.0;
const IMAGE_H_MM: f64 = 90.0;

const TITLE_SIZE: i64 = 18;
const LABEL_SIZE: i64 = 12;
const BODY_SIZE: i64 = 11;
const BODY_LEADING_PT: f64 = 12.65;
/// About 180 mm of 11pt Helvetica.
const SUMMARY_WRAP_CHARS: usize = 92;

/// Everything that goes on the page.
#[derive(Debug)]
pub struct ReportPage<'a> {
    pub sku: &'a str,
    pub summary: &'a str,
    pub exported_at: String,
    pub chart: &'a Canvas,
}

/// Export the live forecast chart with its summary into `out_dir`.
///
/// Fails without touching the filesystem when no forecast chart is live. The
/// file is written under a temporary name and renamed, so a failed export never
/// leaves a partial document behind.
pub fn export_forecast_report(
    charts: &ChartManager,
    sku: Option<&str>,
    summary: Option<&str>,
    out_dir: &Path,
) -> Result<PathBuf, AppError> {
    if !charts.has_live(ChartSlot::Forecast) {
        return Err(AppError::export("Nothing to export yet: run a forecast first."));
    }

    let sku = sku.filter(|s| !s.trim().is_empty()).unwrap_or(UNKNOWN_SKU);
    let summary = summary.filter(|s| !s.trim().is_empty()).unwrap_or(NO_SUMMARY);
    let page = ReportPage {
        sku,
        summary,
        exported_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        chart: charts.canvas(ChartSlot::Forecast),
    };
    let bytes = compose_report(&page)?;

    let path = out_dir.join(report_file_name(sku));
    write_atomically(&path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "forecast report exported");
    Ok(path)
}

/// `forecast_<sku>.pdf`, with path-hostile characters replaced.
pub fn report_file_name(sku: &str) -> String {
    let safe: String = sku
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("forecast_{safe}.pdf")
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .map_err(|e| AppError::export(format!("Failed to create output directory '{}': {e}", dir.display())))?;

    let tmp = path.with_extension("pdf.part");
    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(AppError::export(format!("Failed to write '{}': {e}", tmp.display())));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AppError::export(format!("Failed to save report '{}': {e}", path.display()))
    })
}

/// Build the PDF bytes for one report page.
pub fn compose_report(page: &ReportPage<'_>) -> Result<Vec<u8>, AppError> {
    let size = page.chart.size();
    let expected = size.width as usize * size.height as usize * 3;
    if page.chart.rgb().len() != expected {
        return Err(AppError::export(format!(
            "Chart '{}' could not be rasterized.",
            page.chart.id()
        )));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => size.width as i64,
            "Height" => size.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        page.chart.rgb().to_vec(),
    ));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
        "XObject" => dictionary! { "Im1" => image_id },
    });

    let content = Content {
        operations: page_operations(page),
    };
    let encoded = content
        .encode()
        .map_err(|e| AppError::export(format!("Failed to encode report page: {e}")))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), (PAGE_WIDTH_PT as i64).into(), (PAGE_HEIGHT_PT as i64).into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| AppError::export(format!("Failed to assemble PDF: {e}")))?;
    debug!(bytes = out.len(), "report composed");
    Ok(out)
}

fn page_operations(page: &ReportPage<'_>) -> Vec<Operation> {
    let mut ops = Vec::new();
    text_at(&mut ops, TITLE_SIZE, TITLE_Y_MM, TITLE);
    text_at(&mut ops, BODY_SIZE, TIMESTAMP_Y_MM, &format!("Exported at: {}", page.exported_at));
    text_at(&mut ops, BODY_SIZE, SKU_Y_MM, &format!("Forecast SKU: {}", page.sku));
    text_at(&mut ops, LABEL_SIZE, SUMMARY_LABEL_Y_MM, "Summary:");

    let top = mm_to_y(SUMMARY_Y_MM);
    for (i, line) in wrap_text(page.summary, SUMMARY_WRAP_CHARS).iter().enumerate() {
        let y = top - i as f64 * BODY_LEADING_PT;
        text_line(&mut ops, BODY_SIZE, mm(MARGIN_X_MM), y, line);
    }

    let w = mm(IMAGE_W_MM);
    let h = mm(IMAGE_H_MM);
    let bottom = mm_to_y(IMAGE_Y_MM + IMAGE_H_MM);
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new(
        "cm",
        vec![real(w), 0.into(), 0.into(), real(h), real(mm(MARGIN_X_MM)), real(bottom)],
    ));
    ops.push(Operation::new("Do", vec!["Im1".into()]));
    ops.push(Operation::new("Q", vec![]));
    ops
}

fn text_at(ops: &mut Vec<Operation>, size: i64, y_mm: f64, text: &str) {
    text_line(ops, size, mm(MARGIN_X_MM), mm_to_y(y_mm), text);
}

fn text_line(ops: &mut Vec<Operation>, size: i64, x: f64, y: f64, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec!["F1".into(), size.into()]));
    ops.push(Operation::new("Td", vec![real(x), real(y)]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(pdf_text(text))]));
    ops.push(Operation::new("ET", vec![]));
}

fn mm(v: f64) -> f64 {
    v * PT_PER_MM
}

/// Baseline in PDF user space for a position measured from the page top.
fn mm_to_y(v: f64) -> f64 {
    PAGE_HEIGHT_PT - mm(v)
}

/// Coordinates rounded to a hundredth of a point.
fn real(v: f64) -> Object {
    Object::Real(((v * 100.0).round() / 100.0) as _)
}

/// Text is kept to ASCII for the built-in font; anything else is shown as `?`.
fn pdf_text(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\t' { ' ' } else { c })
        .filter(|c| !c.is_control())
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect()
}

/// Greedy word wrap; explicit newlines are kept and over-long words are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push(word.drain(..width).collect());
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }
    lines
}
