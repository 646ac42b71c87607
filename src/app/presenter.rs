//! User-facing surfaces of the dashboard.
//!
//! The orchestrator never prints; it talks to a [`Presenter`]. The console
//! implementation prints to the terminal and can drop PNG snapshots of every
//! rendered chart next to exported reports.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::warn;

use crate::app::dashboard::DashboardStatus;
use crate::domain::{MultiYearDataset, SkuOption};
use crate::error::AppError;
use crate::plot::{Canvas, ChartInstance};
use crate::report::{TextLine, to_plain_text};

pub trait Presenter {
    /// Show or hide the busy indicator.
    fn set_busy(&self, busy: bool);
    /// The single error channel: one call per failed operation.
    fn notify(&self, error: &AppError);
    fn info(&self, message: &str);
    fn show_upload_preview(&self, preview: &Value);
    fn show_sku_options(&self, options: &[SkuOption], selected: Option<&str>);
    fn show_forecast_summary(&self, sku: &str, summary: &str);
    fn show_analysis(&self, lines: &[TextLine]);
    fn show_multi_raw(&self, datasets: &MultiYearDataset);
    fn show_multi_analysis(&self, lines: &[TextLine]);
    fn chart_rendered(&self, instance: &ChartInstance, canvas: &Canvas);
    fn report_saved(&self, path: &Path);
    fn show_status(&self, status: &DashboardStatus);
}

/// Keeps the busy indicator up until dropped.
pub struct BusyGuard<'a, P: Presenter + ?Sized> {
    presenter: &'a P,
}

impl<'a, P: Presenter + ?Sized> BusyGuard<'a, P> {
    pub fn new(presenter: &'a P) -> Self {
        presenter.set_busy(true);
        Self { presenter }
    }
}

impl<P: Presenter + ?Sized> Drop for BusyGuard<'_, P> {
    fn drop(&mut self) {
        self.presenter.set_busy(false);
    }
}

/// Terminal presenter for the shell.
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    snapshot_dir: Option<PathBuf>,
    busy: Cell<bool>,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write `<canvas-id>.png` into `dir` whenever a chart is rendered.
    pub fn with_snapshots(dir: PathBuf) -> Self {
        Self {
            snapshot_dir: Some(dir),
            busy: Cell::new(false),
        }
    }

    fn write_snapshot(&self, dir: &Path, canvas: &Canvas) -> Result<PathBuf, AppError> {
        let png = canvas.to_png()?;
        fs::create_dir_all(dir)
            .map_err(|e| AppError::render(format!("Failed to create '{}': {e}", dir.display())))?;
        let path = dir.join(format!("{}.png", canvas.id()));
        fs::write(&path, png).map_err(|e| AppError::render(format!("Failed to write '{}': {e}", path.display())))?;
        Ok(path)
    }
}

impl Presenter for ConsolePresenter {
    fn set_busy(&self, busy: bool) {
        if busy && !self.busy.get() {
            eprintln!("… working");
        }
        self.busy.set(busy);
    }

    fn notify(&self, error: &AppError) {
        eprintln!("error: {error}");
    }

    fn info(&self, message: &str) {
        println!("{message}");
    }

    fn show_upload_preview(&self, preview: &Value) {
        let text = serde_json::to_string_pretty(preview).unwrap_or_else(|_| preview.to_string());
        println!("Preview:\n{text}");
    }

    fn show_sku_options(&self, options: &[SkuOption], selected: Option<&str>) {
        let labels: Vec<String> = options
            .iter()
            .map(|o| {
                if !o.is_placeholder() && Some(o.value.as_str()) == selected {
                    format!("[{}]", o.label)
                } else {
                    o.label.clone()
                }
            })
            .collect();
        println!("SKUs: {}", labels.join(", "));
    }

    fn show_forecast_summary(&self, sku: &str, summary: &str) {
        println!("Forecast for {sku}:\n{summary}");
    }

    fn show_analysis(&self, lines: &[TextLine]) {
        print!("{}", to_plain_text(lines));
    }

    fn show_multi_raw(&self, datasets: &MultiYearDataset) {
        match serde_json::to_string_pretty(datasets) {
            Ok(text) => println!("{text}"),
            Err(e) => warn!(error = %e, "could not serialize multi-year data"),
        }
    }

    fn show_multi_analysis(&self, lines: &[TextLine]) {
        print!("{}", to_plain_text(lines));
    }

    fn chart_rendered(&self, instance: &ChartInstance, canvas: &Canvas) {
        let spec = instance.spec();
        let series: Vec<&str> = spec.series.iter().map(|s| s.label.as_str()).collect();
        println!(
            "[{}] {} ({} points: {})",
            canvas.id(),
            spec.title,
            spec.labels.len(),
            series.join(", ")
        );

        if let Some(dir) = &self.snapshot_dir {
            match self.write_snapshot(dir, canvas) {
                Ok(path) => println!("  snapshot: {}", path.display()),
                Err(err) => warn!(error = %err, canvas = canvas.id(), "chart snapshot failed"),
            }
        }
    }

    fn report_saved(&self, path: &Path) {
        println!("Report saved to {}", path.display());
    }

    fn show_status(&self, status: &DashboardStatus) {
        println!("Records:    {}", status.records);
        println!("SKUs:       {}", status.skus);
        println!("Selected:   {}", status.selected_sku.as_deref().unwrap_or("-"));
        if status.years.is_empty() {
            println!("Years:      -");
        } else {
            println!("Years:      {}", status.years.join(", "));
        }
        let charts: Vec<&str> = status.live_charts.iter().map(|s| s.canvas_id()).collect();
        println!("Charts:     {}", if charts.is_empty() { "-".to_string() } else { charts.join(", ") });
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct BusyLog(RefCell<Vec<bool>>);

    impl Presenter for BusyLog {
        fn set_busy(&self, busy: bool) {
            self.0.borrow_mut().push(busy);
        }
        fn notify(&self, _: &AppError) {}
        fn info(&self, _: &str) {}
        fn show_upload_preview(&self, _: &Value) {}
        fn show_sku_options(&self, _: &[SkuOption], _: Option<&str>) {}
        fn show_forecast_summary(&self, _: &str, _: &str) {}
        fn show_analysis(&self, _: &[TextLine]) {}
        fn show_multi_raw(&self, _: &MultiYearDataset) {}
        fn show_multi_analysis(&self, _: &[TextLine]) {}
        fn chart_rendered(&self, _: &ChartInstance, _: &Canvas) {}
        fn report_saved(&self, _: &Path) {}
        fn show_status(&self, _: &DashboardStatus) {}
    }

    #[test]
    fn busy_guard_clears_on_early_return() {
        fn failing(p: &BusyLog) -> Result<(), AppError> {
            let _busy = BusyGuard::new(p);
            Err(AppError::transport("down"))
        }

        let log = BusyLog::default();
        assert!(failing(&log).is_err());
        assert_eq!(*log.0.borrow(), vec![true, false]);
    }

    #[test]
    fn console_snapshots_land_in_output_dir() {
        use crate::config::ChartSize;
        use crate::plot::{ChartManager, ChartSlot, ChartSpec};

        let dir = tempfile::tempdir().unwrap();
        let presenter = ConsolePresenter::with_snapshots(dir.path().to_path_buf());
        let mut charts = ChartManager::new(ChartSize { width: 80, height: 64 });
        charts
            .render(ChartSlot::Analytics, ChartSpec::totals("t", "s", &[("a".into(), 1.0)]))
            .unwrap();
        let instance = charts.live(ChartSlot::Analytics).unwrap();

        presenter.chart_rendered(instance, charts.canvas(ChartSlot::Analytics));
        assert!(dir.path().join("analytics_chart.png").exists());
    }
}
