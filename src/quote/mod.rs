//! Quote forms, validation, and premium computation

mod engine;
mod form;
mod format;
pub mod validation;

pub use engine::{compute_quote, Quote, QuoteEngine};
pub use form::{parse_amount, QuoteForm, QuoteRequest};
pub use format::{format_currency, format_rate_percentage, round_to_cents};
pub use validation::{validate, Field, FieldError, ValidationResult, Violation};
