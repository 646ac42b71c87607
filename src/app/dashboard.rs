//! The request orchestrator.
//!
//! `Dashboard` owns the session state (datasets, chart slots, current selection)
//! and runs one [`Command`] at a time:
//!
//! validate locally -> busy on -> call the service -> render -> busy off
//!
//! Validation always happens before any I/O. Every failure ends up as exactly
//! one `Presenter::notify` call, and nothing is committed on a failed call.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::app::command::Command;
use crate::app::presenter::{BusyGuard, Presenter};
use crate::config::DashboardConfig;
use crate::data::service::{ForecastRequest, SalesService};
use crate::data::store::DatasetStore;
use crate::domain::{COMPARE_HORIZON_DAYS, FlatDataset, ForecastResult, Horizon, Record};
use crate::error::{AppError, ErrorKind};
use crate::io::{export_forecast_report, load_csv, load_multi_year};
use crate::plot::{ChartManager, ChartSlot, ChartSpec};
use crate::report::{multi_year_lines, single_analysis_lines};

const NO_DATA: &str = "No data yet. Upload a CSV file first.";
const NO_MULTI_DATA: &str = "No multi-year data yet. Upload the yearly CSV files first.";
const PREVIEW_ROWS: usize = 5;

/// What the last successful forecast showed; the export reads it.
#[derive(Debug, Clone)]
struct ForecastView {
    sku: String,
    summary: String,
}

/// Snapshot of the session for the status command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStatus {
    pub records: usize,
    pub skus: usize,
    pub selected_sku: Option<String>,
    pub years: Vec<String>,
    pub live_charts: Vec<ChartSlot>,
}

pub struct Dashboard<S: SalesService, P: Presenter> {
    service: S,
    presenter: P,
    store: DatasetStore,
    charts: ChartManager,
    selected_sku: Option<String>,
    last_forecast: Option<ForecastView>,
    last_failure: Option<ErrorKind>,
    output_dir: PathBuf,
}

impl<S: SalesService, P: Presenter> Dashboard<S, P> {
    pub fn new(service: S, presenter: P, config: &DashboardConfig) -> Self {
        Self {
            service,
            presenter,
            store: DatasetStore::new(),
            charts: ChartManager::new(config.chart_size),
            selected_sku: None,
            last_forecast: None,
            last_failure: None,
            output_dir: config.output_dir.clone(),
        }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    pub fn charts(&self) -> &ChartManager {
        &self.charts
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn selected_sku(&self) -> Option<&str> {
        self.selected_sku.as_deref()
    }

    /// Kind of the most recent failed command, if the last one failed.
    pub fn last_failure(&self) -> Option<ErrorKind> {
        self.last_failure
    }

    pub fn status(&self) -> DashboardStatus {
        DashboardStatus {
            records: self.store.flat().len(),
            skus: self.store.skus().len(),
            selected_sku: self.selected_sku.clone(),
            years: self.store.multi_year().keys().cloned().collect(),
            live_charts: self.charts.live_slots(),
        }
    }

    /// Run one user action.
    ///
    /// Returns `false` when the action failed; the failure has already been
    /// reported through the presenter.
    pub fn dispatch(&mut self, command: Command) -> bool {
        let name = command.name();
        debug!(command = name, "dispatch");
        let outcome = self.execute(command);
        self.last_failure = outcome.as_ref().err().map(AppError::kind);
        match outcome {
            Ok(()) => {
                debug!(command = name, "done");
                true
            }
            Err(err) => {
                warn!(command = name, kind = ?err.kind(), error = %err, "command failed");
                self.presenter.notify(&err);
                false
            }
        }
    }

    fn execute(&mut self, command: Command) -> Result<(), AppError> {
        match command {
            Command::Upload { path } => self.upload(&path),
            Command::Load { path } => self.load(&path),
            Command::UploadMulti { paths } => self.upload_multi(&paths),
            Command::Select { sku } => self.select(sku),
            Command::Forecast { sku, days } => self.forecast(sku, &days),
            Command::Analyze => self.analyze(),
            Command::Compare { sku1, sku2 } => self.compare(&sku1, &sku2),
            Command::AnalyzeMulti => self.analyze_multi(),
            Command::Export => self.export(),
            Command::Status => {
                self.presenter.show_status(&self.status());
                Ok(())
            }
        }
    }

    fn upload(&mut self, path: &Path) -> Result<(), AppError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes =
            fs::read(path).map_err(|e| AppError::parse(format!("Could not read '{}': {e}", path.display())))?;

        let _busy = BusyGuard::new(&self.presenter);
        let result = self
            .service
            .upload(&file_name, bytes)
            .map_err(|e| e.context("Upload failed"))?;
        info!(file = %file_name, records = result.records.len(), "upload accepted");

        self.presenter.show_upload_preview(&result.preview);
        self.selected_sku = replace_flat(&mut self.store, &self.presenter, result.records);
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<(), AppError> {
        let parsed = load_csv(path)?;
        if !parsed.non_numeric_lines.is_empty() {
            self.presenter.info(&format!(
                "Warning: {} row(s) have a non-numeric quantity or promotion (lines {}).",
                parsed.non_numeric_lines.len(),
                join_lines(&parsed.non_numeric_lines)
            ));
        }

        let head = &parsed.records[..parsed.records.len().min(PREVIEW_ROWS)];
        let preview = serde_json::to_value(head)
            .map_err(|e| AppError::parse(format!("Could not build a preview of '{}': {e}", path.display())))?;
        info!(path = %path.display(), records = parsed.records.len(), "csv loaded");

        self.presenter.show_upload_preview(&preview);
        self.selected_sku = replace_flat(&mut self.store, &self.presenter, parsed.records);
        Ok(())
    }

    fn upload_multi(&mut self, paths: &[PathBuf]) -> Result<(), AppError> {
        let datasets = load_multi_year(paths)?;
        let years: Vec<&str> = datasets.keys().map(String::as_str).collect();
        info!(files = paths.len(), years = ?years, "multi-year batch loaded");
        let message = format!("Loaded {} year(s): {}", datasets.len(), years.join(", "));

        self.store.replace_multi_year(datasets);
        self.presenter.info(&message);
        self.presenter.show_multi_raw(self.store.multi_year());
        Ok(())
    }

    fn select(&mut self, sku: String) -> Result<(), AppError> {
        require_known_sku(&self.store, &sku)?;
        self.presenter.info(&format!("Selected SKU {sku}."));
        self.selected_sku = Some(sku);
        Ok(())
    }

    fn forecast(&mut self, sku: Option<String>, days: &str) -> Result<(), AppError> {
        if self.store.flat().is_empty() {
            return Err(AppError::validation(NO_DATA));
        }
        let sku = sku
            .or_else(|| self.selected_sku.clone())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::validation("Select a SKU to forecast."))?;
        let horizon: Horizon = days.parse()?;
        require_known_sku(&self.store, &sku)?;

        let request = ForecastRequest {
            sku: &sku,
            data: self.store.records_for(&sku),
            days: horizon.days(),
        };

        let _busy = BusyGuard::new(&self.presenter);
        info!(sku = %sku, days = request.days, history = request.data.len(), "requesting forecast");
        let result = self
            .service
            .forecast(&request)
            .map_err(|e| e.context("Forecast failed"))?;

        let spec = ChartSpec::forecast(&sku, &request.data, &result.forecast);
        render_chart(&mut self.charts, &self.presenter, ChartSlot::Forecast, spec)?;
        self.presenter.show_forecast_summary(&sku, &result.summary);

        self.last_forecast = Some(ForecastView {
            sku: sku.clone(),
            summary: result.summary,
        });
        self.selected_sku = Some(sku);
        Ok(())
    }

    fn compare(&mut self, sku1: &str, sku2: &str) -> Result<(), AppError> {
        if self.store.flat().is_empty() {
            return Err(AppError::validation(NO_DATA));
        }
        if sku1.is_empty() || sku2.is_empty() {
            return Err(AppError::validation("Select two SKUs to compare."));
        }
        if sku1 == sku2 {
            return Err(AppError::validation("Select two different SKUs to compare."));
        }
        require_known_sku(&self.store, sku1)?;
        require_known_sku(&self.store, sku2)?;

        let first = ForecastRequest {
            sku: sku1,
            data: self.store.records_for(sku1),
            days: COMPARE_HORIZON_DAYS,
        };
        let second = ForecastRequest {
            sku: sku2,
            data: self.store.records_for(sku2),
            days: COMPARE_HORIZON_DAYS,
        };

        let _busy = BusyGuard::new(&self.presenter);
        info!(sku1, sku2, "requesting comparison");
        let service = &self.service;
        let (a, b) = rayon::join(
            || forecast_for(service, &first),
            || forecast_for(service, &second),
        );
        // Both legs must succeed before the chart is touched.
        let (a, b) = (a?, b?);

        let spec = ChartSpec::comparison(sku1, &a, sku2, &b);
        render_chart(&mut self.charts, &self.presenter, ChartSlot::Compare, spec)
    }

    fn analyze(&mut self) -> Result<(), AppError> {
        if self.store.flat().is_empty() {
            return Err(AppError::validation(NO_DATA));
        }

        let _busy = BusyGuard::new(&self.presenter);
        info!(records = self.store.flat().len(), "requesting analysis");
        let analysis = self
            .service
            .explain(self.store.flat())
            .map_err(|e| e.context("AI analysis failed"))?;

        self.presenter.show_analysis(&single_analysis_lines(&analysis));
        let spec = ChartSpec::totals("Total quantity by SKU", "Total quantity", &self.store.sku_totals());
        render_chart(&mut self.charts, &self.presenter, ChartSlot::Analytics, spec)
    }

    fn analyze_multi(&mut self) -> Result<(), AppError> {
        if self.store.multi_year().is_empty() {
            return Err(AppError::validation(NO_MULTI_DATA));
        }

        let _busy = BusyGuard::new(&self.presenter);
        info!(years = self.store.multi_year().len(), "requesting multi-year analysis");
        let analysis = self
            .service
            .explain_multi_year(self.store.multi_year())
            .map_err(|e| e.context("Multi-year analysis failed"))?;

        self.presenter.show_multi_analysis(&multi_year_lines(&analysis));
        let spec = ChartSpec::totals("Total quantity by year", "Total quantity", &analysis.year_totals());
        render_chart(&mut self.charts, &self.presenter, ChartSlot::Multi, spec)
    }

    fn export(&mut self) -> Result<(), AppError> {
        let view = self.last_forecast.as_ref();

        let _busy = BusyGuard::new(&self.presenter);
        let path = export_forecast_report(
            &self.charts,
            view.map(|v| v.sku.as_str()),
            view.map(|v| v.summary.as_str()),
            &self.output_dir,
        )?;
        self.presenter.report_saved(&path);
        Ok(())
    }
}

/// Commit a new flat dataset and refresh the pickers; returns the new selection.
fn replace_flat<P: Presenter>(store: &mut DatasetStore, presenter: &P, records: FlatDataset) -> Option<String> {
    store.replace_flat(records);
    let options = store.sku_options();
    let selected = options
        .first()
        .filter(|o| !o.is_placeholder())
        .map(|o| o.value.clone());
    presenter.show_sku_options(&options, selected.as_deref());
    selected
}

fn require_known_sku(store: &DatasetStore, sku: &str) -> Result<(), AppError> {
    if store.flat().iter().any(|r: &Record| r.sku == sku) {
        Ok(())
    } else {
        Err(AppError::validation(format!("Unknown SKU '{sku}'.")))
    }
}

fn forecast_for<S: SalesService>(
    service: &S,
    request: &ForecastRequest<'_>,
) -> Result<ForecastResult, AppError> {
    service
        .forecast(request)
        .map_err(|e| e.context(format!("Forecast failed for SKU {}", request.sku)))
}

fn render_chart<P: Presenter>(
    charts: &mut ChartManager,
    presenter: &P,
    slot: ChartSlot,
    spec: ChartSpec,
) -> Result<(), AppError> {
    charts.render(slot, spec)?;
    if let Some(instance) = charts.live(slot) {
        presenter.chart_rendered(instance, charts.canvas(slot));
    }
    Ok(())
}

fn join_lines(lines: &[u64]) -> String {
    const SHOWN: usize = 10;
    let mut parts: Vec<String> = lines.iter().take(SHOWN).map(u64::to_string).collect();
    if lines.len() > SHOWN {
        parts.push("…".to_string());
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;

    use serde_json::{Value, json};

    use super::*;
    use crate::config::ChartSize;
    use crate::data::service::UploadResult;
    use crate::domain::{ForecastPoint, MultiYearAnalysis, MultiYearDataset, Price, SingleAnalysis, SkuOption, YearStats};
    use crate::plot::{Canvas, ChartInstance};
    use crate::report::TextLine;

    fn rec(date: &str, sku: &str, qty: f64) -> Record {
        Record {
            date: date.to_string(),
            sku: sku.to_string(),
            quantity: qty,
            price: Price::Number(9.5),
            promotion: 0.0,
        }
    }

    fn sample_records() -> Vec<Record> {
        vec![
            rec("2024-01-01", "B", 3.0),
            rec("2024-01-01", "A", 5.0),
            rec("2024-01-02", "B", 4.0),
            rec("2024-01-02", "A", 6.0),
            rec("2024-01-03", "C", 1.0),
        ]
    }

    #[derive(Default)]
    struct FakeService {
        upload_records: Vec<Record>,
        failing_skus: HashSet<String>,
        fail_explain: bool,
        forecasts: Mutex<Vec<(String, u32, usize)>>,
        explains: Mutex<usize>,
    }

    impl FakeService {
        fn with_records(records: Vec<Record>) -> Self {
            Self {
                upload_records: records,
                ..Self::default()
            }
        }

        fn failing(mut self, sku: &str) -> Self {
            self.failing_skus.insert(sku.to_string());
            self
        }

        fn forecast_calls(&self) -> Vec<(String, u32, usize)> {
            let mut calls = self.forecasts.lock().unwrap().clone();
            calls.sort();
            calls
        }

        fn explain_calls(&self) -> usize {
            *self.explains.lock().unwrap()
        }
    }

    impl SalesService for FakeService {
        fn upload(&self, _file_name: &str, _bytes: Vec<u8>) -> Result<UploadResult, AppError> {
            Ok(UploadResult {
                records: self.upload_records.clone(),
                preview: json!({ "rows": self.upload_records.len() }),
            })
        }

        fn forecast(&self, request: &ForecastRequest<'_>) -> Result<ForecastResult, AppError> {
            self.forecasts
                .lock()
                .unwrap()
                .push((request.sku.to_string(), request.days, request.data.len()));
            if self.failing_skus.contains(request.sku) {
                return Err(AppError::transport("Request to /api/forecast failed with status 500."));
            }
            let forecast = (1..=request.days)
                .map(|d| ForecastPoint {
                    date: format!("2024-02-{d:02}"),
                    forecast_qty: Some(f64::from(d)),
                })
                .collect();
            Ok(ForecastResult {
                summary: format!("{} trends up", request.sku),
                forecast,
            })
        }

        fn explain(&self, _data: &[Record]) -> Result<SingleAnalysis, AppError> {
            *self.explains.lock().unwrap() += 1;
            if self.fail_explain {
                return Err(AppError::transport("Request to /api/explain failed with status 502."));
            }
            Ok(SingleAnalysis {
                summary: "steady".to_string(),
                ..SingleAnalysis::default()
            })
        }

        fn explain_multi_year(&self, datasets: &MultiYearDataset) -> Result<MultiYearAnalysis, AppError> {
            *self.explains.lock().unwrap() += 1;
            let python_summary: BTreeMap<String, YearStats> = datasets
                .iter()
                .map(|(year, rows)| {
                    let stats = YearStats {
                        total_quantity: Some(rows.iter().map(|r| r.quantity).sum()),
                        ..YearStats::default()
                    };
                    (year.clone(), stats)
                })
                .collect();
            Ok(MultiYearAnalysis {
                long_term_trend: "growing".to_string(),
                python_summary,
                ..MultiYearAnalysis::default()
            })
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Busy(bool),
        Notify(ErrorKind, String),
        Info(String),
        Preview(Value),
        Options(Vec<String>, Option<String>),
        Summary(String, String),
        Analysis(Vec<TextLine>),
        MultiRaw(Vec<String>),
        MultiAnalysis(Vec<TextLine>),
        Chart(ChartSlot, u64),
        Report(PathBuf),
        Status(DashboardStatus),
    }

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Event>>);

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.0.borrow().clone()
        }

        fn push(&self, event: Event) {
            self.0.borrow_mut().push(event);
        }
    }

    impl Presenter for Recorder {
        fn set_busy(&self, busy: bool) {
            self.push(Event::Busy(busy));
        }
        fn notify(&self, error: &AppError) {
            self.push(Event::Notify(error.kind(), error.message().to_string()));
        }
        fn info(&self, message: &str) {
            self.push(Event::Info(message.to_string()));
        }
        fn show_upload_preview(&self, preview: &Value) {
            self.push(Event::Preview(preview.clone()));
        }
        fn show_sku_options(&self, options: &[SkuOption], selected: Option<&str>) {
            let labels = options.iter().map(|o| o.label.clone()).collect();
            self.push(Event::Options(labels, selected.map(str::to_string)));
        }
        fn show_forecast_summary(&self, sku: &str, summary: &str) {
            self.push(Event::Summary(sku.to_string(), summary.to_string()));
        }
        fn show_analysis(&self, lines: &[TextLine]) {
            self.push(Event::Analysis(lines.to_vec()));
        }
        fn show_multi_raw(&self, datasets: &MultiYearDataset) {
            self.push(Event::MultiRaw(datasets.keys().cloned().collect()));
        }
        fn show_multi_analysis(&self, lines: &[TextLine]) {
            self.push(Event::MultiAnalysis(lines.to_vec()));
        }
        fn chart_rendered(&self, instance: &ChartInstance, _canvas: &Canvas) {
            self.push(Event::Chart(instance.slot(), instance.id()));
        }
        fn report_saved(&self, path: &Path) {
            self.push(Event::Report(path.to_path_buf()));
        }
        fn show_status(&self, status: &DashboardStatus) {
            self.push(Event::Status(status.clone()));
        }
    }

    type TestDashboard = Dashboard<FakeService, Recorder>;

    fn dashboard(service: FakeService, out_dir: &Path) -> TestDashboard {
        let config = DashboardConfig {
            output_dir: out_dir.to_path_buf(),
            chart_size: ChartSize { width: 96, height: 64 },
            ..DashboardConfig::default()
        };
        Dashboard::new(service, Recorder::default(), &config)
    }

    /// Dashboard with `sample_records` uploaded through the fake service.
    fn loaded(service: FakeService, dir: &tempfile::TempDir) -> TestDashboard {
        let csv = dir.path().join("upload.csv");
        fs::write(&csv, "date,sku,quantity,price,promotion\n").unwrap();
        let mut dash = dashboard(service, dir.path());
        assert!(dash.dispatch(Command::Upload { path: csv }));
        dash.presenter.0.borrow_mut().clear();
        dash
    }

    fn forecast(days: &str) -> Command {
        Command::Forecast {
            sku: None,
            days: days.to_string(),
        }
    }

    fn notifications(events: &[Event]) -> Vec<(ErrorKind, String)> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Notify(kind, msg) => Some((*kind, msg.clone())),
                _ => None,
            })
            .collect()
    }

    fn busy_is_balanced(events: &[Event]) -> bool {
        let on = events.iter().filter(|e| **e == Event::Busy(true)).count();
        let off = events.iter().filter(|e| **e == Event::Busy(false)).count();
        on == off && events.iter().rev().find(|e| matches!(e, Event::Busy(_))) != Some(&Event::Busy(true))
    }

    #[test]
    fn upload_offers_distinct_skus_and_selects_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let dash = loaded(FakeService::with_records(sample_records()), &dir);

        assert_eq!(dash.store().flat().len(), 5);
        assert_eq!(dash.selected_sku(), Some("B"));
        assert_eq!(dash.store().skus(), vec!["B", "A", "C"]);
    }

    #[test]
    fn empty_upload_yields_placeholder_option() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("empty.csv");
        fs::write(&csv, "date,sku,quantity,price,promotion\n").unwrap();
        let mut dash = dashboard(FakeService::default(), dir.path());

        assert!(dash.dispatch(Command::Upload { path: csv }));
        let events = dash.presenter().events();
        assert!(events.contains(&Event::Options(vec![SkuOption::PLACEHOLDER_LABEL.to_string()], None)));
        assert_eq!(dash.selected_sku(), None);
        assert!(busy_is_balanced(&events));
    }

    #[test]
    fn forecast_without_data_is_rejected_locally() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = dashboard(FakeService::default(), dir.path());

        assert!(!dash.dispatch(forecast("14")));
        let events = dash.presenter().events();
        assert_eq!(notifications(&events), vec![(ErrorKind::Validation, NO_DATA.to_string())]);
        assert!(dash.service().forecast_calls().is_empty());
        assert!(!events.contains(&Event::Busy(true)));
    }

    #[test]
    fn horizon_bounds_are_enforced_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = loaded(FakeService::with_records(sample_records()), &dir);

        for days in ["6", "31", "0", "-7", "7.5", "abc", ""] {
            assert!(!dash.dispatch(forecast(days)), "{days} should be rejected");
        }
        assert!(dash.service().forecast_calls().is_empty());
        assert_eq!(notifications(&dash.presenter().events()).len(), 7);

        assert!(dash.dispatch(forecast("7")));
        assert!(dash.dispatch(forecast("30")));
        let calls = dash.service().forecast_calls();
        assert_eq!(calls, vec![("B".to_string(), 7, 2), ("B".to_string(), 30, 2)]);
        assert!(busy_is_balanced(&dash.presenter().events()));
    }

    #[test]
    fn forecast_sends_only_selected_sku_history_and_renders() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = loaded(FakeService::with_records(sample_records()), &dir);

        assert!(dash.dispatch(Command::Select { sku: "A".to_string() }));
        assert!(dash.dispatch(forecast("10")));

        assert_eq!(dash.service().forecast_calls(), vec![("A".to_string(), 10, 2)]);
        let live = dash.charts().live(ChartSlot::Forecast).unwrap();
        // two history points followed by ten forecast steps
        assert_eq!(live.spec().labels.len(), 12);
        assert!(
            dash.presenter()
                .events()
                .contains(&Event::Summary("A".to_string(), "A trends up".to_string()))
        );
    }

    #[test]
    fn unknown_sku_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = loaded(FakeService::with_records(sample_records()), &dir);

        assert!(!dash.dispatch(Command::Select { sku: "Z".to_string() }));
        assert_eq!(dash.selected_sku(), Some("B"));
        assert!(!dash.dispatch(Command::Forecast {
            sku: Some("Z".to_string()),
            days: "14".to_string(),
        }));
        assert!(dash.service().forecast_calls().is_empty());
    }

    #[test]
    fn failed_forecast_keeps_previous_chart_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = loaded(FakeService::with_records(sample_records()).failing("A"), &dir);

        assert!(dash.dispatch(forecast("14")));
        let before = dash.charts().live(ChartSlot::Forecast).unwrap().id();

        assert!(!dash.dispatch(Command::Forecast {
            sku: Some("A".to_string()),
            days: "14".to_string(),
        }));
        assert_eq!(dash.charts().live(ChartSlot::Forecast).unwrap().id(), before);
        assert_eq!(dash.selected_sku(), Some("B"));

        let events = dash.presenter().events();
        let notes = notifications(&events);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].0, ErrorKind::Transport);
        assert!(notes[0].1.contains("500"));
        assert!(busy_is_balanced(&events));

        // Export still reflects the last successful forecast.
        assert!(dash.dispatch(Command::Export));
        assert!(dir.path().join("forecast_B.pdf").exists());
    }

    #[test]
    fn repeated_forecasts_keep_one_live_chart() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = loaded(FakeService::with_records(sample_records()), &dir);

        for _ in 0..4 {
            assert!(dash.dispatch(forecast("14")));
        }
        let stats = dash.charts().stats();
        assert_eq!(stats.created, 4);
        assert_eq!(stats.destroyed, 3);
        assert_eq!(dash.charts().live_slots(), vec![ChartSlot::Forecast]);
    }

    #[test]
    fn compare_rejects_identical_or_missing_skus_without_requests() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = loaded(FakeService::with_records(sample_records()), &dir);

        let same = Command::Compare {
            sku1: "A".to_string(),
            sku2: "A".to_string(),
        };
        let missing = Command::Compare {
            sku1: "A".to_string(),
            sku2: String::new(),
        };
        assert!(!dash.dispatch(same));
        assert!(!dash.dispatch(missing));
        assert!(dash.service().forecast_calls().is_empty());
        assert!(
            notifications(&dash.presenter().events())
                .iter()
                .all(|(kind, _)| *kind == ErrorKind::Validation)
        );
    }

    #[test]
    fn compare_issues_two_fixed_horizon_requests() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = loaded(FakeService::with_records(sample_records()), &dir);

        assert!(dash.dispatch(Command::Compare {
            sku1: "A".to_string(),
            sku2: "B".to_string(),
        }));
        assert_eq!(
            dash.service().forecast_calls(),
            vec![("A".to_string(), 14, 2), ("B".to_string(), 14, 2)]
        );
        let live = dash.charts().live(ChartSlot::Compare).unwrap();
        assert_eq!(live.spec().series.len(), 2);
        assert_eq!(live.spec().labels.len(), 14);
    }

    #[test]
    fn compare_with_one_failing_leg_renders_nothing() {
        for failing in ["A", "B"] {
            let dir = tempfile::tempdir().unwrap();
            let mut dash = loaded(FakeService::with_records(sample_records()).failing(failing), &dir);

            assert!(!dash.dispatch(Command::Compare {
                sku1: "A".to_string(),
                sku2: "B".to_string(),
            }));
            assert_eq!(dash.service().forecast_calls().len(), 2);
            assert!(!dash.charts().has_live(ChartSlot::Compare));

            let events = dash.presenter().events();
            let notes = notifications(&events);
            assert_eq!(notes.len(), 1);
            assert!(notes[0].1.starts_with(&format!("Forecast failed for SKU {failing}")));
            assert!(!events.iter().any(|e| matches!(e, Event::Chart(..))));
            assert!(busy_is_balanced(&events));
        }
    }

    #[test]
    fn failed_compare_leaves_previous_comparison_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = loaded(FakeService::with_records(sample_records()).failing("C"), &dir);

        assert!(dash.dispatch(Command::Compare {
            sku1: "A".to_string(),
            sku2: "B".to_string(),
        }));
        let before = dash.charts().live(ChartSlot::Compare).unwrap().id();

        assert!(!dash.dispatch(Command::Compare {
            sku1: "A".to_string(),
            sku2: "C".to_string(),
        }));
        assert_eq!(dash.charts().live(ChartSlot::Compare).unwrap().id(), before);
    }

    #[test]
    fn analyze_shows_text_and_sku_totals() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = loaded(FakeService::with_records(sample_records()), &dir);

        assert!(dash.dispatch(Command::Analyze));
        assert_eq!(dash.service().explain_calls(), 1);

        let live = dash.charts().live(ChartSlot::Analytics).unwrap();
        assert_eq!(live.spec().labels, vec!["B", "A", "C"]);
        assert_eq!(live.spec().series[0].values, vec![Some(7.0), Some(11.0), Some(1.0)]);
        assert!(
            dash.presenter()
                .events()
                .iter()
                .any(|e| matches!(e, Event::Analysis(lines) if lines.iter().any(|l| l.text == "steady")))
        );
    }

    #[test]
    fn failed_analysis_renders_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = FakeService {
            fail_explain: true,
            ..FakeService::with_records(sample_records())
        };
        let mut dash = loaded(service, &dir);

        assert!(!dash.dispatch(Command::Analyze));
        assert!(!dash.charts().has_live(ChartSlot::Analytics));
        let events = dash.presenter().events();
        assert!(notifications(&events)[0].1.starts_with("AI analysis failed"));
        assert!(busy_is_balanced(&events));
    }

    #[test]
    fn analyze_without_data_does_not_call_service() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = dashboard(FakeService::default(), dir.path());

        assert!(!dash.dispatch(Command::Analyze));
        assert!(!dash.dispatch(Command::AnalyzeMulti));
        assert_eq!(dash.service().explain_calls(), 0);
        let kinds: Vec<ErrorKind> = notifications(&dash.presenter().events())
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(kinds, vec![ErrorKind::Validation, ErrorKind::Validation]);
    }

    fn write_year(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut text = String::from("date,sku,quantity,price,promotion\n");
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn multi_upload_batches_replace_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_year(dir.path(), "sales_2022.csv", &["2022-01-01,A,2,9.5,0", "2022-01-02,A,3,9.5,1"]);
        let b = write_year(dir.path(), "sales_2023.csv", &["2023-01-01,A,4,9.5,0"]);
        let c = write_year(dir.path(), "sales_2024.csv", &["2024-01-01,B,5,9.5,0"]);
        let mut dash = dashboard(FakeService::default(), dir.path());

        assert!(dash.dispatch(Command::UploadMulti { paths: vec![a, b] }));
        let years: Vec<&String> = dash.store().multi_year().keys().collect();
        assert_eq!(years, vec!["2022", "2023"]);
        assert_eq!(dash.store().multi_year()["2022"].len(), 2);
        assert_eq!(dash.store().multi_year()["2022"][1].promotion, 1.0);

        assert!(dash.dispatch(Command::UploadMulti { paths: vec![c] }));
        let years: Vec<&String> = dash.store().multi_year().keys().collect();
        assert_eq!(years, vec!["2024"]);
        assert!(
            dash.presenter()
                .events()
                .contains(&Event::MultiRaw(vec!["2024".to_string()]))
        );
    }

    #[test]
    fn failed_multi_upload_keeps_prior_years() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_year(dir.path(), "sales_2022.csv", &["2022-01-01,A,2,9.5,0"]);
        let b = write_year(dir.path(), "sales_2023.csv", &["2023-01-01,A,4,9.5,0"]);
        let mut dash = dashboard(FakeService::default(), dir.path());
        assert!(dash.dispatch(Command::UploadMulti { paths: vec![a] }));

        let missing = dir.path().join("sales_2025.csv");
        assert!(!dash.dispatch(Command::UploadMulti {
            paths: vec![b, missing]
        }));
        let years: Vec<&String> = dash.store().multi_year().keys().collect();
        assert_eq!(years, vec!["2022"]);
        assert_eq!(notifications(&dash.presenter().events())[0].0, ErrorKind::Parse);

        assert!(!dash.dispatch(Command::UploadMulti { paths: vec![] }));
        assert_eq!(dash.store().multi_year().len(), 1);
    }

    #[test]
    fn analyze_multi_charts_year_totals() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_year(dir.path(), "sales_2022.csv", &["2022-01-01,A,2,9.5,0", "2022-01-02,A,3,9.5,1"]);
        let b = write_year(dir.path(), "sales_2023.csv", &["2023-01-01,A,4,9.5,0"]);
        let mut dash = dashboard(FakeService::default(), dir.path());
        assert!(dash.dispatch(Command::UploadMulti { paths: vec![a, b] }));

        assert!(dash.dispatch(Command::AnalyzeMulti));
        let live = dash.charts().live(ChartSlot::Multi).unwrap();
        assert_eq!(live.spec().labels, vec!["2022", "2023"]);
        assert_eq!(live.spec().series[0].values, vec![Some(5.0), Some(4.0)]);
    }

    #[test]
    fn export_before_forecast_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");
        let mut dash = dashboard(FakeService::default(), &out);

        assert!(!dash.dispatch(Command::Export));
        assert!(!out.exists());
        let events = dash.presenter().events();
        assert_eq!(notifications(&events)[0].0, ErrorKind::Export);
        assert!(!events.iter().any(|e| matches!(e, Event::Report(_))));
        assert!(busy_is_balanced(&events));
    }

    #[test]
    fn export_after_forecast_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = loaded(FakeService::with_records(sample_records()), &dir);

        assert!(dash.dispatch(Command::Forecast {
            sku: Some("C".to_string()),
            days: "7".to_string(),
        }));
        assert!(dash.dispatch(Command::Export));

        let path = dir.path().join("forecast_C.pdf");
        assert!(path.exists());
        assert!(dash.presenter().events().contains(&Event::Report(path)));
    }

    #[test]
    fn local_load_previews_first_rows_and_warns_on_bad_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_year(
            dir.path(),
            "local.csv",
            &[
                "2024-01-01,A,1,9.5,0",
                "2024-01-02,A,x,9.5,0",
                "2024-01-03,B,3,9.5,0",
                "2024-01-04,B,4,9.5,0",
                "2024-01-05,C,5,9.5,0",
                "2024-01-06,C,6,9.5,0",
            ],
        );
        let mut dash = dashboard(FakeService::default(), dir.path());

        assert!(dash.dispatch(Command::Load { path }));
        assert_eq!(dash.store().flat().len(), 6);
        assert_eq!(dash.selected_sku(), Some("A"));

        let events = dash.presenter().events();
        let preview = events
            .iter()
            .find_map(|e| match e {
                Event::Preview(v) => Some(v.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(preview.as_array().unwrap().len(), PREVIEW_ROWS);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, Event::Info(msg) if msg.starts_with("Warning: 1 row")))
        );
    }

    #[test]
    fn status_reports_session_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = loaded(FakeService::with_records(sample_records()), &dir);
        assert!(dash.dispatch(forecast("14")));
        assert!(dash.dispatch(Command::Status));

        let expected = DashboardStatus {
            records: 5,
            skus: 3,
            selected_sku: Some("B".to_string()),
            years: vec![],
            live_charts: vec![ChartSlot::Forecast],
        };
        assert!(dash.presenter().events().contains(&Event::Status(expected)));
    }
}
