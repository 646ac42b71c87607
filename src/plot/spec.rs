//! Render-only chart descriptions.
//!
//! A `ChartSpec` is pure data (labels, series, styling). It is computed outside the
//! chart manager so the data prep can be tested without drawing anything.

use crate::domain::{ForecastPoint, ForecastResult, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const GREEN: Rgb = Rgb(0x22, 0xc5, 0x5e);
pub const AMBER: Rgb = Rgb(0xea, 0xb3, 0x08);
pub const SKY: Rgb = Rgb(0x0e, 0xa5, 0xe9);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesStyle {
    pub color: Rgb,
    pub dashed: bool,
    pub stroke_width: u32,
    /// Marker radius in pixels; `0` draws no markers.
    pub point_radius: u32,
}

impl SeriesStyle {
    pub fn line(color: Rgb) -> Self {
        Self {
            color,
            dashed: false,
            stroke_width: 2,
            point_radius: 2,
        }
    }

    pub fn dashed(color: Rgb) -> Self {
        Self {
            dashed: true,
            ..Self::line(color)
        }
    }

    pub fn bar(color: Rgb) -> Self {
        Self {
            color,
            dashed: false,
            stroke_width: 0,
            point_radius: 0,
        }
    }
}

/// One data series; `None` entries are gaps, never zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub values: Vec<Option<f64>>,
    pub style: SeriesStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

impl ChartSpec {
    /// History and forecast on one axis.
    ///
    /// The forecast series is blank over the historical span so it only starts
    /// after the last observed date.
    pub fn forecast(sku: &str, history: &[&Record], forecast: &[ForecastPoint]) -> Self {
        let labels = history
            .iter()
            .map(|r| r.date.clone())
            .chain(forecast.iter().map(|f| f.date.clone()))
            .collect();

        let actual = history.iter().map(|r| finite(r.quantity)).collect();
        let projected = std::iter::repeat_n(None, history.len())
            .chain(forecast.iter().map(|f| f.forecast_qty.and_then(finite)))
            .collect();

        Self {
            kind: ChartKind::Line,
            title: format!("Forecast for {sku}"),
            labels,
            series: vec![
                Series {
                    label: "Actual".to_string(),
                    values: actual,
                    style: SeriesStyle::line(GREEN),
                },
                Series {
                    label: "Forecast".to_string(),
                    values: projected,
                    style: SeriesStyle::dashed(AMBER),
                },
            ],
        }
    }

    /// Two forecasts on the first forecast's dates.
    pub fn comparison(sku1: &str, first: &ForecastResult, sku2: &str, second: &ForecastResult) -> Self {
        let values = |result: &ForecastResult| -> Vec<Option<f64>> {
            result
                .forecast
                .iter()
                .map(|f| f.forecast_qty.and_then(finite))
                .collect()
        };

        Self {
            kind: ChartKind::Line,
            title: format!("{sku1} vs {sku2}"),
            labels: first.forecast.iter().map(|f| f.date.clone()).collect(),
            series: vec![
                Series {
                    label: format!("SKU {sku1}"),
                    values: values(first),
                    style: SeriesStyle {
                        point_radius: 0,
                        ..SeriesStyle::line(GREEN)
                    },
                },
                Series {
                    label: format!("SKU {sku2}"),
                    values: values(second),
                    style: SeriesStyle {
                        point_radius: 0,
                        ..SeriesStyle::line(AMBER)
                    },
                },
            ],
        }
    }

    /// Single-series bar chart of `(label, total)` pairs, in the given order.
    pub fn totals(title: &str, series_label: &str, totals: &[(String, f64)]) -> Self {
        Self {
            kind: ChartKind::Bar,
            title: title.to_string(),
            labels: totals.iter().map(|(label, _)| label.clone()).collect(),
            series: vec![Series {
                label: series_label.to_string(),
                values: totals.iter().map(|(_, v)| finite(*v)).collect(),
                style: SeriesStyle::bar(SKY),
            }],
        }
    }

    /// `(min, max)` over every finite value, if any.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().flatten().copied())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Price;

    fn rec(date: &str, qty: f64) -> Record {
        Record {
            date: date.to_string(),
            sku: "A".to_string(),
            quantity: qty,
            price: Price::Missing,
            promotion: 0.0,
        }
    }

    fn point(date: &str, qty: f64) -> ForecastPoint {
        ForecastPoint {
            date: date.to_string(),
            forecast_qty: Some(qty),
        }
    }

    #[test]
    fn forecast_series_starts_after_history() {
        let history = [rec("d1", 5.0), rec("d2", f64::NAN)];
        let refs: Vec<&Record> = history.iter().collect();
        let spec = ChartSpec::forecast("A", &refs, &[point("d3", 7.0), point("d4", 8.0)]);

        assert_eq!(spec.labels, vec!["d1", "d2", "d3", "d4"]);
        assert_eq!(spec.series[0].values, vec![Some(5.0), None]);
        assert_eq!(spec.series[1].values, vec![None, None, Some(7.0), Some(8.0)]);
        assert!(spec.series[1].style.dashed);
    }

    #[test]
    fn comparison_uses_first_forecast_dates() {
        let first = ForecastResult {
            summary: String::new(),
            forecast: vec![point("d1", 1.0), point("d2", 2.0)],
        };
        let second = ForecastResult {
            summary: String::new(),
            forecast: vec![point("x1", 3.0), point("x2", 4.0)],
        };
        let spec = ChartSpec::comparison("A", &first, "B", &second);
        assert_eq!(spec.labels, vec!["d1", "d2"]);
        assert_eq!(spec.series[0].label, "SKU A");
        assert_eq!(spec.series[1].values, vec![Some(3.0), Some(4.0)]);
    }

    #[test]
    fn value_range_skips_gaps() {
        let spec = ChartSpec::totals("t", "s", &[("a".into(), 3.0), ("b".into(), f64::NAN), ("c".into(), -1.0)]);
        assert_eq!(spec.value_range(), Some((-1.0, 3.0)));
        assert_eq!(ChartSpec::totals("t", "s", &[]).value_range(), None);
    }
}
