//! Loan collection reporting: CSV ingestion, dashboard aggregates and
//! detection of loans whose days-past-due rose after a promise to pay and
//! later came back down.

pub mod cache;
pub mod config;
pub mod detector;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use detector::{detect, get_timeline, resolve_loan_id, Detection};
pub use error::{ReportError, ReportResult};
