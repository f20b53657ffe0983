//! Field-scoped validation of quote forms

use super::form::{parse_amount, QuoteForm};
use crate::rates::{CoverageFor, CoverageType, TransitMethod};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::fmt;

/// Allowed gap between cargo value and additional + carrier insurance
pub const CARGO_VALUE_TOLERANCE: f64 = 0.01;

// Absorbs binary rounding so that a gap of exactly one cent is accepted
const FLOAT_SLACK: f64 = 1e-9;

/// Form field an error is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    TransitMethod,
    CoverageType,
    CoverageFor,
    CargoValue,
    AdditionalValue,
    CarrierInsurance,
}

/// A single user-correctable problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    TransitMethodRequired,
    CoverageTypeRequired,
    CoverageBasisRequired,
    InvalidCargoValue,
    InvalidAdditionalValue,
    InvalidCarrierInsurance,
    CargoValueMismatch,
}

impl Violation {
    pub fn field(&self) -> Field {
        match self {
            Violation::TransitMethodRequired => Field::TransitMethod,
            Violation::CoverageTypeRequired => Field::CoverageType,
            Violation::CoverageBasisRequired => Field::CoverageFor,
            Violation::InvalidCargoValue | Violation::CargoValueMismatch => Field::CargoValue,
            Violation::InvalidAdditionalValue => Field::AdditionalValue,
            Violation::InvalidCarrierInsurance => Field::CarrierInsurance,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Violation::TransitMethodRequired => "transit method required",
            Violation::CoverageTypeRequired => "coverage type required",
            Violation::CoverageBasisRequired => "coverage basis required",
            Violation::InvalidCargoValue => "invalid cargo value",
            Violation::InvalidAdditionalValue => "invalid additional value",
            Violation::InvalidCarrierInsurance => "invalid carrier insurance",
            Violation::CargoValueMismatch => "cargo value mismatch",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Violation with the field it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub violation: Violation,
}

impl Serialize for FieldError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FieldError", 3)?;
        state.serialize_field("field", &self.field)?;
        state.serialize_field("code", &self.violation)?;
        state.serialize_field("message", self.violation.message())?;
        state.end()
    }
}

/// Every violation found in one validation pass, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationResult {
    errors: Vec<FieldError>,
}

impl ValidationResult {
    fn push(&mut self, violation: Violation) {
        self.errors.push(FieldError {
            field: violation.field(),
            violation,
        });
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn violations(&self) -> impl Iterator<Item = Violation> + '_ {
        self.errors.iter().map(|e| e.violation)
    }

    pub fn for_field(&self, field: Field) -> Vec<Violation> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.violation)
            .collect()
    }

    pub fn contains(&self, violation: Violation) -> bool {
        self.errors.iter().any(|e| e.violation == violation)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.violations().map(|v| v.message()).collect();
        f.write_str(&messages.join(", "))
    }
}

/// Check a quote form, collecting every violation instead of stopping at the
/// first one.
///
/// The cross-field cargo value check runs whenever all three amounts parse,
/// even if the cargo value itself was rejected as non-positive, so both cargo
/// value errors can be reported together.
pub fn validate(form: &QuoteForm) -> ValidationResult {
    let mut result = ValidationResult::default();

    if TransitMethod::from_label(&form.transit_method).is_none() {
        result.push(Violation::TransitMethodRequired);
    }
    if CoverageType::from_label(&form.coverage_type).is_none() {
        result.push(Violation::CoverageTypeRequired);
    }
    let coverage_for = CoverageFor::from_label(&form.coverage_for);
    if coverage_for.is_none() {
        result.push(Violation::CoverageBasisRequired);
    }

    let cargo = parse_amount(&form.cargo_value);
    if !cargo.is_some_and(|v| v > 0.0) {
        result.push(Violation::InvalidCargoValue);
    }

    if coverage_for == Some(CoverageFor::Additional) {
        let additional = form
            .additional_value
            .as_deref()
            .and_then(parse_amount)
            .filter(|v| *v > 0.0);
        let carrier = form
            .carrier_insurance
            .as_deref()
            .and_then(parse_amount)
            .filter(|v| *v >= 0.0);

        if additional.is_none() {
            result.push(Violation::InvalidAdditionalValue);
        }
        if carrier.is_none() {
            result.push(Violation::InvalidCarrierInsurance);
        }

        if let (Some(cargo), Some(additional), Some(carrier)) = (cargo, additional, carrier) {
            if ((additional + carrier) - cargo).abs() > CARGO_VALUE_TOLERANCE + FLOAT_SLACK {
                result.push(Violation::CargoValueMismatch);
            }
        }
    }

    result
}
