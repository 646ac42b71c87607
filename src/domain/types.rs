//! Shared domain types.
//!
//! Records are the unit of exchange between ingestion, the dataset store and the
//! sales service. They serialize to exactly the wire shape the service expects:
//!
//! `{ date, sku, quantity, price, promotion }`
//!
//! Numeric fields follow loose coercion rules (see [`coerce_number`]) so that a
//! bad cell degrades to NaN instead of rejecting the whole upload.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// Smallest horizon (days) accepted by a single forecast.
pub const MIN_HORIZON_DAYS: u32 = 7;
/// Largest horizon (days) accepted by a single forecast.
pub const MAX_HORIZON_DAYS: u32 = 30;
/// Horizon used by both legs of a comparison, independent of the forecast control.
pub const COMPARE_HORIZON_DAYS: u32 = 14;

/// One parsed sales observation.
///
/// `quantity` and `promotion` may be NaN when the source cell was not numeric.
/// That is a data-quality signal, not a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub date: String,
    #[serde(deserialize_with = "text_or_number")]
    pub sku: String,
    #[serde(deserialize_with = "coerced_number", default = "nan")]
    pub quantity: f64,
    #[serde(default)]
    pub price: Price,
    #[serde(deserialize_with = "coerced_number", default = "nan")]
    pub promotion: f64,
}

impl Record {
    /// `true` when both numeric fields hold real numbers.
    pub fn is_numeric(&self) -> bool {
        self.quantity.is_finite() && self.promotion.is_finite()
    }
}

/// Price cell, kept as it arrived.
///
/// Locally parsed files carry the raw text; the upload endpoint returns numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Price {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Number(v) => write!(f, "{v}"),
            Price::Text(s) => write!(f, "{s}"),
            Price::Missing => Ok(()),
        }
    }
}

/// All records of the current upload, SKUs intermixed, in upload order.
pub type FlatDataset = Vec<Record>;

/// Records per year key, keys in ascending order.
pub type MultiYearDataset = BTreeMap<String, Vec<Record>>;

/// One entry of the SKU pickers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuOption {
    pub value: String,
    pub label: String,
}

impl SkuOption {
    pub const PLACEHOLDER_LABEL: &'static str = "-- No SKU --";

    pub fn sku(sku: &str) -> Self {
        Self {
            value: sku.to_string(),
            label: sku.to_string(),
        }
    }

    /// Option shown when the dataset has no SKUs; selecting it selects nothing.
    pub fn placeholder() -> Self {
        Self {
            value: String::new(),
            label: Self::PLACEHOLDER_LABEL.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.value.is_empty()
    }
}

/// Validated single-forecast horizon, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon(u32);

impl Horizon {
    pub fn new(days: i64) -> Result<Self, AppError> {
        if days < i64::from(MIN_HORIZON_DAYS) || days > i64::from(MAX_HORIZON_DAYS) {
            return Err(horizon_error());
        }
        Ok(Self(days as u32))
    }

    pub fn days(self) -> u32 {
        self.0
    }
}

impl FromStr for Horizon {
    type Err = AppError;

    /// Only whole numbers are accepted: `"7.5"` and `"7days"` are rejected.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let days = input.trim().parse::<i64>().map_err(|_| horizon_error())?;
        Self::new(days)
    }
}

fn horizon_error() -> AppError {
    AppError::validation(format!(
        "Forecast horizon must be a whole number of days between {MIN_HORIZON_DAYS} and {MAX_HORIZON_DAYS}."
    ))
}

/// Coerce a text cell to a number.
///
/// Rules:
/// - blank (after trimming) -> `0.0`
/// - decimal / exponent notation and `Infinity` -> the value
/// - anything else -> NaN
pub fn coerce_number(raw: &str) -> f64 {
    let t = raw.trim();
    if t.is_empty() {
        return 0.0;
    }

    let (sign, unsigned) = match t.as_bytes()[0] {
        b'-' => (-1.0, &t[1..]),
        b'+' => (1.0, &t[1..]),
        _ => (1.0, t),
    };
    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }

    // `f64::from_str` also accepts "inf" and "nan", which are not numbers here.
    let plain = unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !plain {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

fn nan() -> f64 {
    f64::NAN
}

fn coerced_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => coerce_number(&s),
        Value::Bool(b) => {
            if b {
                1.0
            } else {
                0.0
            }
        }
        _ => f64::NAN,
    })
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {other}"
        ))),
    }
}
