//! `salescope` library crate.
//!
//! The binary (`salescope`) is a thin wrapper around this library so that:
//!
//! - the orchestration logic is testable without a terminal or a live service
//! - every user-facing surface sits behind a trait (`SalesService`, `Presenter`)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod plot;
pub mod report;
