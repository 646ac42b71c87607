//! Results returned by the sales service.
//!
//! These are transient: they are rendered once (text panes + charts) and dropped.
//! Loose response shapes are resolved here, at decode time, so rendering code
//! only ever sees the typed variants below.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One forecast step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastPoint {
    pub date: String,
    /// `None` when the service returned `null` for this step.
    #[serde(default)]
    pub forecast_qty: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    pub summary: String,
    pub forecast: Vec<ForecastPoint>,
}

/// One entry of an analysis list.
///
/// The service answers either with a bare label or with a structured record;
/// both are accepted and kept apart so renderers never inspect raw JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawItem")]
pub enum AnalysisItem {
    Label(String),
    Detail {
        sku: String,
        quantity: Option<String>,
        reason: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawItem {
    Label(String),
    Detail {
        sku: Value,
        #[serde(default)]
        quantity: Value,
        #[serde(default)]
        reason: Value,
    },
    Other(Value),
}

impl From<RawItem> for AnalysisItem {
    fn from(raw: RawItem) -> Self {
        match raw {
            RawItem::Label(text) => AnalysisItem::Label(text),
            RawItem::Detail {
                sku,
                quantity,
                reason,
            } => AnalysisItem::Detail {
                sku: display_value(&sku).unwrap_or_default(),
                quantity: display_value(&quantity),
                reason: display_value(&reason).filter(|r| !r.is_empty()),
            },
            RawItem::Other(value) => AnalysisItem::Label(display_value(&value).unwrap_or_default()),
        }
    }
}

/// Single-dataset analysis, as displayed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SingleAnalysis {
    pub summary: String,
    pub strong_skus: Vec<AnalysisItem>,
    pub weak_skus: Vec<AnalysisItem>,
    pub key_insights: Vec<AnalysisItem>,
}

/// Highest / lowest day of a year.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DayStat {
    Point { date: String, quantity: f64 },
    Text(String),
}

/// Month-level trend: free text or month -> total quantity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MonthlyTrend {
    Totals(BTreeMap<String, f64>),
    Text(String),
}

/// Per-year aggregate figures.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct YearStats {
    #[serde(default)]
    pub total_quantity: Option<f64>,
    #[serde(default)]
    pub average_quantity: Option<f64>,
    #[serde(default)]
    pub max_day: Option<DayStat>,
    #[serde(default)]
    pub min_day: Option<DayStat>,
    #[serde(default, alias = "monthly_total")]
    pub monthly_trend: Option<MonthlyTrend>,
}

const YEAR_STAT_KEYS: [&str; 6] = [
    "total_quantity",
    "average_quantity",
    "max_day",
    "min_day",
    "monthly_trend",
    "monthly_total",
];

/// Per-year entry of the narrative analysis.
///
/// The model is free to answer with any shape here. Objects that decode as
/// [`YearStats`] are kept typed; anything else is kept as-is for display.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum YearNote {
    Stats(YearStats),
    Text(String),
    Other(Value),
}

impl From<Value> for YearNote {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => YearNote::Text(text),
            Value::Object(ref fields)
                if fields.is_empty() || fields.keys().any(|k| YEAR_STAT_KEYS.contains(&k.as_str())) =>
            {
                match YearStats::deserialize(&value) {
                    Ok(stats) => YearNote::Stats(stats),
                    Err(_) => YearNote::Other(value),
                }
            }
            other => YearNote::Other(other),
        }
    }
}

/// Multi-year analysis, as displayed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiYearAnalysis {
    pub yearly_analysis: BTreeMap<String, YearNote>,
    pub yoy_compare: String,
    pub long_term_trend: String,
    pub key_takeaways: Vec<AnalysisItem>,
    pub python_summary: BTreeMap<String, YearStats>,
}

impl MultiYearAnalysis {
    /// Total quantity per year, missing totals counted as zero.
    pub fn year_totals(&self) -> Vec<(String, f64)> {
        self.python_summary
            .iter()
            .map(|(year, stats)| {
                let total = stats.total_quantity.filter(|v| v.is_finite()).unwrap_or(0.0);
                (year.clone(), total)
            })
            .collect()
    }
}

/// Free-form text field that may arrive as any JSON value.
///
/// Strings pass through, `null` becomes empty, anything else is kept as compact JSON.
pub fn narrative<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(display_value(&value).unwrap_or_default())
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
