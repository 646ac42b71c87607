//! CSV ingest.
//!
//! Sales files are positional: a header line (ignored) followed by rows of
//!
//! `date,sku,quantity,price,promotion`
//!
//! Rules:
//! - the header is never validated, columns are taken by position
//! - `,` is the only delimiter and quotes are not special, so a field cannot contain a comma
//! - `quantity` / `promotion` are coerced with [`coerce_number`]; non-numeric cells become NaN
//!   and are reported as quality issues, never as parse failures
//! - blank lines are skipped; a line of bare delimiters is a record with empty cells
//!
//! Multi-file batches are all-or-nothing: one unreadable file fails the batch.

use std::fs;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::{FlatDataset, MultiYearDataset, Price, Record, coerce_number};
use crate::error::AppError;

const DATE: usize = 0;
const SKU: usize = 1;
const QUANTITY: usize = 2;
const PRICE: usize = 3;
const PROMOTION: usize = 4;

/// Parsed file: records plus the lines whose numeric fields did not coerce.
#[derive(Debug, Clone, Default)]
pub struct ParsedCsv {
    pub records: FlatDataset,
    /// 1-based source line numbers of rows holding a NaN `quantity` or `promotion`.
    pub non_numeric_lines: Vec<u64>,
}

/// Parse CSV text into records.
pub fn parse_records(text: &str) -> Result<ParsedCsv, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut parsed = ParsedCsv::default();
    for result in reader.records() {
        let row = result.map_err(|e| AppError::parse(format!("CSV parse error: {e}")))?;
        if is_blank_line(&row) {
            continue;
        }

        let record = record_from_row(&row);
        if !record.is_numeric() {
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            parsed.non_numeric_lines.push(line);
        }
        parsed.records.push(record);
    }

    Ok(parsed)
}

/// Whitespace-only line. A row of bare delimiters (`,,,,`) is still a record.
fn is_blank_line(row: &StringRecord) -> bool {
    row.len() <= 1 && row.iter().all(|field| field.trim().is_empty())
}

fn record_from_row(row: &StringRecord) -> Record {
    let text = |idx: usize| row.get(idx).unwrap_or_default().to_string();
    // An absent numeric cell is NaN; a present but blank one is 0.
    let number = |idx: usize| row.get(idx).map(coerce_number).unwrap_or(f64::NAN);

    Record {
        date: text(DATE),
        sku: text(SKU),
        quantity: number(QUANTITY),
        price: row
            .get(PRICE)
            .map(|p| Price::Text(p.to_string()))
            .unwrap_or(Price::Missing),
        promotion: number(PROMOTION),
    }
}

/// Read and parse a single CSV file.
pub fn load_csv(path: &Path) -> Result<ParsedCsv, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::parse(format!("Failed to read CSV '{}': {e}", path.display())))?;
    let parsed = parse_records(&text)?;
    if !parsed.non_numeric_lines.is_empty() {
        warn!(
            file = %path.display(),
            rows = parsed.non_numeric_lines.len(),
            "rows with non-numeric quantity/promotion"
        );
    }
    Ok(parsed)
}

/// Year key for a multi-year file: the first four digits of its name.
///
/// `sales_2023.csv` -> `2023`. A name without digits is used as-is.
pub fn year_key(file_name: &str) -> String {
    let digits: String = file_name
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(4)
        .collect();
    if digits.is_empty() {
        file_name.to_string()
    } else {
        digits
    }
}

/// Build a multi-year dataset from `(file name, text)` pairs.
///
/// Later files replace earlier ones that map to the same year key.
pub fn build_multi_year<I, N, T>(files: I) -> Result<MultiYearDataset, AppError>
where
    I: IntoIterator<Item = (N, T)>,
    N: AsRef<str>,
    T: AsRef<str>,
{
    let mut datasets = MultiYearDataset::new();
    for (name, text) in files {
        let year = year_key(name.as_ref());
        let parsed = parse_records(text.as_ref())?;
        debug!(file = name.as_ref(), %year, rows = parsed.records.len(), "parsed yearly file");
        datasets.insert(year, parsed.records);
    }
    Ok(datasets)
}

/// Read every file of a multi-year batch.
///
/// Either every file is read and parsed, or an error is returned and nothing of
/// the batch survives.
pub fn load_multi_year(paths: &[PathBuf]) -> Result<MultiYearDataset, AppError> {
    if paths.is_empty() {
        return Err(AppError::validation("Select at least one CSV file."));
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let text = fs::read_to_string(path).map_err(|e| {
            AppError::parse(format!(
                "Could not read the multi-year CSV files ('{}': {e}).",
                path.display()
            ))
        })?;
        files.push((name, text));
    }

    build_multi_year(files)
}
