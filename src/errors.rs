//! Error types for quoting, table loading and quote delivery

use crate::quote::ValidationResult;
use crate::rates::{CoverageType, TransitMethod};
use thiserror::Error;

/// Failure to produce a quote
#[derive(Debug, Clone, Error)]
pub enum QuoteError {
    /// User-correctable input problems, all reported together
    #[error("invalid quote request: {0}")]
    Validation(ValidationResult),

    /// No rate entry for the selected combination; a table/config problem
    #[error("rate unavailable for selection: {transit_method} / {coverage_type}")]
    RateUnavailable {
        transit_method: TransitMethod,
        coverage_type: CoverageType,
    },
}

/// Failure to load rate or deductible tables from a source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("malformed table: {0}")]
    Malformed(String),

    #[error("no usable {0} rows")]
    Empty(&'static str),
}

/// Failure to hand a quote to the customer
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("email is required")]
    MissingEmail,

    #[error("unknown goods category: {0}")]
    UnknownCategory(String),

    #[error("failed to send quote to customer: {0}")]
    Notify(String),

    #[error("failed to record delivery: {0}")]
    Ledger(String),
}
