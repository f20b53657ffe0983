//! Freight Quote - indicative freight insurance pricing
//!
//! This library provides:
//! - Rate tables keyed by transit method and coverage type, with minimum premiums
//! - Tiered deductibles by cargo value, with a manual-quote outcome for high values
//! - Form validation that reports every field error at once
//! - Premium computation and rate/currency display formatting
//! - Goods category list offered when describing a shipment
//! - Table sources (built-in, CSV files, REST rate store) with fallback
//! - Quote delivery to customer and admin behind transport traits

pub mod config;
pub mod delivery;
pub mod errors;
pub mod quote;
pub mod rates;

// Re-export commonly used types
pub use config::SourceConfig;
pub use errors::{DeliveryError, QuoteError, SourceError};
pub use quote::{compute_quote, validate, Quote, QuoteEngine, QuoteForm, QuoteRequest, ValidationResult};
pub use rates::{
    resolve_deductible, CategoryList, CoverageFor, CoverageType, Deductible, DeductibleTable, DeductibleTier, RateEntry,
    RateTable, TableSet, TransitMethod,
};
