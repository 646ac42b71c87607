//! Text rendering of analysis results.
//!
//! Output is a list of role-tagged lines so presenters can style them (colors,
//! indentation) without re-inspecting the analysis. Structured list items become
//! a primary line (SKU and quantity) followed by a secondary reasoning line.

use std::fmt::Write as _;

use serde_json::Value;

use crate::domain::{AnalysisItem, DayStat, MonthlyTrend, MultiYearAnalysis, SingleAnalysis, YearNote, YearStats};

const NO_DATA: &str = "No data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    Heading,
    Body,
    /// Emphasized list entry.
    Primary,
    /// Supporting detail under the previous primary line.
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub role: LineRole,
    pub text: String,
}

impl TextLine {
    fn new(role: LineRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Lines for one list entry.
pub fn item_lines(item: &AnalysisItem) -> Vec<TextLine> {
    match item {
        AnalysisItem::Label(text) => vec![TextLine::new(LineRole::Primary, text.clone())],
        AnalysisItem::Detail { sku, quantity, reason } => {
            let head = match quantity {
                Some(q) => format!("{sku} - {q}"),
                None => sku.clone(),
            };
            let mut lines = vec![TextLine::new(LineRole::Primary, head)];
            if let Some(reason) = reason {
                lines.push(TextLine::new(LineRole::Secondary, reason.clone()));
            }
            lines
        }
    }
}

fn section(out: &mut Vec<TextLine>, heading: &str, items: &[AnalysisItem]) {
    out.push(TextLine::new(LineRole::Heading, heading));
    out.extend(items.iter().flat_map(item_lines));
}

/// Single-dataset analysis: overview, strong / weak SKUs, insights.
pub fn single_analysis_lines(analysis: &SingleAnalysis) -> Vec<TextLine> {
    let mut out = vec![
        TextLine::new(LineRole::Heading, "Overview"),
        TextLine::new(LineRole::Body, analysis.summary.clone()),
    ];
    section(&mut out, "Strong SKUs", &analysis.strong_skus);
    section(&mut out, "Weak SKUs", &analysis.weak_skus);
    section(&mut out, "Key insights", &analysis.key_insights);
    out
}

/// Multi-year analysis: long-term trend, YoY comparison, one block per year, takeaways.
pub fn multi_year_lines(analysis: &MultiYearAnalysis) -> Vec<TextLine> {
    let mut out = vec![
        TextLine::new(LineRole::Heading, "Multi-year trend"),
        TextLine::new(LineRole::Body, analysis.long_term_trend.clone()),
        TextLine::new(LineRole::Heading, "Year-over-year growth"),
        TextLine::new(LineRole::Body, analysis.yoy_compare.clone()),
        TextLine::new(LineRole::Heading, "Per-year analysis"),
    ];

    for (year, note) in &analysis.yearly_analysis {
        out.push(TextLine::new(LineRole::Primary, format!("Year {year}")));
        match note {
            YearNote::Stats(stats) => out.extend(year_stats_lines(stats)),
            YearNote::Text(text) => out.push(TextLine::new(LineRole::Secondary, text.clone())),
            YearNote::Other(value) => out.extend(loose_note_lines(value)),
        }
    }

    section(&mut out, "Key takeaways", &analysis.key_takeaways);
    out
}

fn year_stats_lines(stats: &YearStats) -> Vec<TextLine> {
    let line = |label: &str, value: String| TextLine::new(LineRole::Secondary, format!("{label}: {value}"));
    vec![
        line("Total sold", opt_number(stats.total_quantity)),
        line("Daily average", opt_number(stats.average_quantity)),
        line("Highest day", stats.max_day.as_ref().map(day_stat).unwrap_or_else(|| NO_DATA.to_string())),
        line("Lowest day", stats.min_day.as_ref().map(day_stat).unwrap_or_else(|| NO_DATA.to_string())),
        line(
            "Monthly trend",
            stats
                .monthly_trend
                .as_ref()
                .map(monthly_trend)
                .unwrap_or_else(|| NO_DATA.to_string()),
        ),
    ]
}

/// Objects become `key: value` lines, arrays one line per element.
fn loose_note_lines(value: &Value) -> Vec<TextLine> {
    let line = |text: String| TextLine::new(LineRole::Secondary, text);
    match value {
        Value::Object(fields) if !fields.is_empty() => fields
            .iter()
            .map(|(key, v)| line(format!("{key}: {}", loose_text(v))))
            .collect(),
        Value::Array(items) if !items.is_empty() => items.iter().map(|v| line(loose_text(v))).collect(),
        _ => vec![line(loose_text(value))],
    }
}

fn loose_text(value: &Value) -> String {
    match value {
        Value::Null => NO_DATA.to_string(),
        Value::String(s) if s.is_empty() => NO_DATA.to_string(),
        Value::String(s) => s.clone(),
        Value::Object(m) if m.is_empty() => NO_DATA.to_string(),
        Value::Array(a) if a.is_empty() => NO_DATA.to_string(),
        other => other.to_string(),
    }
}

fn day_stat(day: &DayStat) -> String {
    match day {
        DayStat::Point { date, quantity } => format!("{date} ({})", fmt_number(*quantity)),
        DayStat::Text(text) if text.is_empty() => NO_DATA.to_string(),
        DayStat::Text(text) => text.clone(),
    }
}

fn monthly_trend(trend: &MonthlyTrend) -> String {
    match trend {
        MonthlyTrend::Text(text) if text.is_empty() => NO_DATA.to_string(),
        MonthlyTrend::Text(text) => text.clone(),
        MonthlyTrend::Totals(months) if months.is_empty() => NO_DATA.to_string(),
        MonthlyTrend::Totals(months) => months
            .iter()
            .map(|(month, qty)| format!("{month}: {}", fmt_number(*qty)))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn opt_number(v: Option<f64>) -> String {
    v.map(fmt_number).unwrap_or_else(|| NO_DATA.to_string())
}

/// Whole numbers without decimals, everything else with two.
pub fn fmt_number(v: f64) -> String {
    if !v.is_finite() {
        return "-".to_string();
    }
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

/// Plain-text rendering (headings underlined, list entries bulleted).
pub fn to_plain_text(lines: &[TextLine]) -> String {
    let mut out = String::new();
    for line in lines {
        match line.role {
            LineRole::Heading => {
                if !out.is_empty() {
                    out.push('\n');
                }
                let _ = writeln!(out, "{}", line.text);
                let _ = writeln!(out, "{}", "-".repeat(line.text.chars().count()));
            }
            LineRole::Body => {
                let _ = writeln!(out, "{}", line.text);
            }
            LineRole::Primary => {
                let _ = writeln!(out, "  • {}", line.text);
            }
            LineRole::Secondary => {
                let _ = writeln!(out, "      {}", line.text);
            }
        }
    }
    out
}
