//! Session data: the in-memory dataset store and the sales service client.

pub mod service;
pub mod store;

pub use service::{ForecastRequest, HttpSalesService, SalesService, UploadResult};
pub use store::DatasetStore;
