//! Premium and deductible computation

use super::form::{QuoteForm, QuoteRequest};
use super::format::{format_rate_percentage, round_to_cents};
use crate::errors::QuoteError;
use crate::rates::{CoverageFor, Deductible, DeductibleTable, RateTable, TableSet};
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Computed quote
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Rate fraction exactly as stored in the table
    pub rate: f64,

    /// Premium after the minimum floor, rounded to cents
    pub premium: f64,

    /// Deductible, or the manual-quote sentinel
    pub deductible: Deductible,

    /// Minimum premium of the selected rate entry
    pub minimum_premium: f64,

    /// Amount the rate was applied to
    pub insured_amount: f64,

    /// True when the cargo value is beyond automatic underwriting
    pub needs_manual_quote: bool,
}

impl Quote {
    /// Rate as a display percentage ("0.115%")
    pub fn rate_display(&self) -> String {
        format_rate_percentage(self.rate)
    }
}

/// Price a validated request against the given tables.
///
/// Fails only when the rate table has no entry for the selected transit
/// method and coverage type. Deductibles apply to full-value coverage only;
/// top-up coverage always carries a zero deductible.
pub fn compute_quote(
    request: &QuoteRequest,
    rates: &RateTable,
    deductibles: &DeductibleTable,
) -> Result<Quote, QuoteError> {
    let entry = rates
        .get(request.transit_method(), request.coverage_type())
        .ok_or(QuoteError::RateUnavailable {
            transit_method: request.transit_method(),
            coverage_type: request.coverage_type(),
        })?;

    let rate = entry.rate_for(request.coverage_for());
    let insured_amount = request.insured_amount();
    let raw_premium = insured_amount * rate;
    let premium = round_to_cents(raw_premium.max(entry.minimum_premium));

    let deductible = match request.coverage_for() {
        CoverageFor::FullValue => deductibles.resolve(request.cargo_value()),
        CoverageFor::Additional => Deductible::Amount(0.0),
    };

    debug!(
        "{} / {} / {}: insured {:.2} x {} = {:.2}, premium {:.2}, deductible {}",
        request.transit_method(),
        request.coverage_type(),
        request.coverage_for(),
        insured_amount,
        rate,
        raw_premium,
        premium,
        deductible
    );

    Ok(Quote {
        rate,
        premium,
        deductible,
        minimum_premium: entry.minimum_premium,
        insured_amount,
        needs_manual_quote: deductible.is_manual_quote(),
    })
}

/// Quote engine bound to a resolved set of tables
#[derive(Debug, Clone)]
pub struct QuoteEngine {
    tables: TableSet,
}

impl QuoteEngine {
    pub fn new(tables: TableSet) -> Self {
        Self { tables }
    }

    /// Engine over the built-in tables
    pub fn with_fallback_tables() -> Self {
        Self::new(TableSet::fallback())
    }

    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    pub fn compute(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        compute_quote(request, &self.tables.rates, &self.tables.deductibles)
    }

    /// Validate a submitted form and price it. Nothing is computed unless the
    /// form is valid.
    pub fn quote(&self, form: &QuoteForm) -> Result<Quote, QuoteError> {
        let request = form.into_request().map_err(QuoteError::Validation)?;
        self.compute(&request)
    }

    /// Quote many forms in parallel; results keep input order
    pub fn quote_batch(&self, forms: &[QuoteForm]) -> Vec<Result<Quote, QuoteError>> {
        forms.par_iter().map(|form| self.quote(form)).collect()
    }
}

impl Default for QuoteEngine {
    fn default() -> Self {
        Self::with_fallback_tables()
    }
}
