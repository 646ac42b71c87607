//! Sales service client (upload, forecast, explain).
//!
//! The service is an external collaborator: it owns forecasting and AI analysis.
//! This module only shapes requests and decodes responses against explicit
//! schemas; any non-2xx status is a hard failure with the status code in the
//! message, and the body of a failed response is never inspected.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::{Client, Response, multipart};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DashboardConfig;
use crate::domain::{
    AnalysisItem, ForecastPoint, ForecastResult, MultiYearAnalysis, MultiYearDataset, Record, SingleAnalysis,
    YearNote, YearStats, narrative,
};
use crate::error::AppError;

const UPLOAD_PATH: &str = "/api/upload";
const FORECAST_PATH: &str = "/api/forecast";
const EXPLAIN_PATH: &str = "/api/explain";

/// Text shown when the service returns a forecast without a summary.
pub const NO_SUMMARY: &str = "No summary returned.";

/// Forecast request body: `{ sku, data, days }`.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastRequest<'a> {
    pub sku: &'a str,
    pub data: Vec<&'a Record>,
    pub days: u32,
}

/// Decoded upload response.
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub records: Vec<Record>,
    pub preview: Value,
}

/// Operations offered by the sales service.
///
/// `Sync` so both legs of a comparison can run on separate threads.
pub trait SalesService: Sync {
    fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadResult, AppError>;
    fn forecast(&self, request: &ForecastRequest<'_>) -> Result<ForecastResult, AppError>;
    fn explain(&self, data: &[Record]) -> Result<SingleAnalysis, AppError>;
    fn explain_multi_year(&self, datasets: &MultiYearDataset) -> Result<MultiYearAnalysis, AppError>;
}

/// HTTP implementation over a blocking `reqwest` client.
pub struct HttpSalesService {
    client: Client,
    base_url: String,
}

impl HttpSalesService {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, AppError> {
        Self::with_builder(Client::builder(), base_url, timeout)
    }

    fn with_builder(
        mut builder: reqwest::blocking::ClientBuilder,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, AppError> {
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self, AppError> {
        Self::new(&config.api_url, config.timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, AppError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(path, "POST");
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .map_err(|e| request_failed(path, e))?;
        decode(path, resp)
    }
}

impl SalesService for HttpSalesService {
    fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadResult, AppError> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .map_err(|e| AppError::transport(format!("Invalid upload part: {e}")))?;
        let form = multipart::Form::new().part("file", part);

        debug!(path = UPLOAD_PATH, file_name, "POST multipart");
        let resp = self
            .client
            .post(self.url(UPLOAD_PATH))
            .multipart(form)
            .send()
            .map_err(|e| request_failed(UPLOAD_PATH, e))?;
        let body: UploadResponse = decode(UPLOAD_PATH, resp)?;

        Ok(UploadResult {
            records: body.raw_data,
            preview: body.data_preview,
        })
    }

    fn forecast(&self, request: &ForecastRequest<'_>) -> Result<ForecastResult, AppError> {
        let body: ForecastResponse = self.post_json(FORECAST_PATH, request)?;
        Ok(body.into())
    }

    fn explain(&self, data: &[Record]) -> Result<SingleAnalysis, AppError> {
        let body: ExplainResponse = self.post_json(EXPLAIN_PATH, &ExplainRequest { data })?;
        Ok(body.into())
    }

    fn explain_multi_year(&self, datasets: &MultiYearDataset) -> Result<MultiYearAnalysis, AppError> {
        let body: MultiExplainResponse = self.post_json(EXPLAIN_PATH, &MultiExplainRequest { datasets })?;
        Ok(body.into())
    }
}

fn request_failed(path: &str, err: reqwest::Error) -> AppError {
    warn!(path, error = %err, "request failed");
    if err.is_timeout() {
        AppError::transport(format!("Request to {path} timed out."))
    } else {
        AppError::transport(format!("Request to {path} failed: {err}"))
    }
}

fn decode<R: DeserializeOwned>(path: &str, resp: Response) -> Result<R, AppError> {
    let status = resp.status();
    if !status.is_success() {
        warn!(path, status = status.as_u16(), "service returned failure status");
        return Err(AppError::transport(format!(
            "Request to {path} failed with status {}.",
            status.as_u16()
        )));
    }
    debug!(path, status = status.as_u16(), "response received");

    resp.json::<R>()
        .map_err(|e| AppError::transport(format!("Malformed response from {path}: {e}")))
}

#[derive(Serialize)]
struct ExplainRequest<'a> {
    data: &'a [Record],
}

#[derive(Serialize)]
struct MultiExplainRequest<'a> {
    datasets: &'a MultiYearDataset,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    raw_data: Vec<Record>,
    #[serde(default)]
    data_preview: Value,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    summary: Option<String>,
    forecast: Vec<ForecastPoint>,
}

impl From<ForecastResponse> for ForecastResult {
    fn from(body: ForecastResponse) -> Self {
        ForecastResult {
            summary: body
                .summary
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| NO_SUMMARY.to_string()),
            forecast: body.forecast,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AiAnalysis {
    #[serde(default, deserialize_with = "narrative")]
    overall_summary: String,
    #[serde(default)]
    strong_skus: Vec<AnalysisItem>,
    #[serde(default)]
    weak_skus: Vec<AnalysisItem>,
    #[serde(default)]
    key_insights: Vec<AnalysisItem>,
}

#[derive(Debug, Deserialize)]
struct ExplainResponse {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    ai_analysis: Option<AiAnalysis>,
}

impl From<ExplainResponse> for SingleAnalysis {
    fn from(body: ExplainResponse) -> Self {
        let ai = body.ai_analysis.unwrap_or_default();
        let summary = body
            .summary
            .filter(|s| !s.is_empty())
            .unwrap_or(ai.overall_summary);
        SingleAnalysis {
            summary,
            strong_skus: ai.strong_skus,
            weak_skus: ai.weak_skus,
            key_insights: ai.key_insights,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AiMultiYear {
    #[serde(default)]
    yearly_analysis: BTreeMap<String, YearNote>,
    #[serde(default, deserialize_with = "narrative")]
    yoy_compare: String,
    #[serde(default, deserialize_with = "narrative")]
    long_term_trend: String,
    #[serde(default)]
    key_takeaways: Vec<AnalysisItem>,
}

#[derive(Debug, Deserialize)]
struct MultiExplainResponse {
    #[serde(default)]
    ai_analysis: Option<AiMultiYear>,
    #[serde(default)]
    python_summary: BTreeMap<String, YearStats>,
}

impl From<MultiExplainResponse> for MultiYearAnalysis {
    fn from(body: MultiExplainResponse) -> Self {
        let ai = body.ai_analysis.unwrap_or_default();
        MultiYearAnalysis {
            yearly_analysis: ai.yearly_analysis,
            yoy_compare: ai.yoy_compare,
            long_term_trend: ai.long_term_trend,
            key_takeaways: ai.key_takeaways,
            python_summary: body.python_summary,
        }
    }
}
