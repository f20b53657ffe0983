//! Raw quote form input and the typed request built from it

use super::validation::{validate, ValidationResult};
use crate::rates::{CoverageFor, CoverageType, TransitMethod};
use serde::{Deserialize, Deserializer, Serialize};

/// Accept either a JSON number or display text for amount fields
fn amount_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(optional_amount_text(deserializer)?.unwrap_or_default())
}

fn optional_amount_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    Ok(Option::<Repr>::deserialize(deserializer)?.map(|repr| match repr {
        Repr::Number(n) => n.to_string(),
        Repr::Text(s) => s,
    }))
}

/// Parse an amount as typed into the form.
///
/// Thousands separators, whitespace and a leading `$` are ignored, so
/// "$10,000" parses as 10000. Returns None for blank, non-numeric or
/// non-finite input.
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Quote form as submitted, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteForm {
    #[serde(default, alias = "transit_method")]
    pub transit_method: String,

    #[serde(default, alias = "coverage_type")]
    pub coverage_type: String,

    #[serde(default, alias = "coverage_for")]
    pub coverage_for: String,

    #[serde(default, alias = "cargo_value", deserialize_with = "amount_text")]
    pub cargo_value: String,

    /// Only read for Additional coverage
    #[serde(default, alias = "additional_value", deserialize_with = "optional_amount_text")]
    pub additional_value: Option<String>,

    /// Only read for Additional coverage
    #[serde(default, alias = "carrier_insurance", deserialize_with = "optional_amount_text")]
    pub carrier_insurance: Option<String>,
}

impl QuoteForm {
    /// Form for full-value coverage
    pub fn full_value(transit_method: &str, coverage_type: &str, cargo_value: &str) -> Self {
        Self {
            transit_method: transit_method.to_string(),
            coverage_type: coverage_type.to_string(),
            coverage_for: CoverageFor::FullValue.as_str().to_string(),
            cargo_value: cargo_value.to_string(),
            additional_value: None,
            carrier_insurance: None,
        }
    }

    /// Form for top-up coverage over the carrier's insurance
    pub fn additional(
        transit_method: &str,
        coverage_type: &str,
        cargo_value: &str,
        additional_value: &str,
        carrier_insurance: &str,
    ) -> Self {
        Self {
            transit_method: transit_method.to_string(),
            coverage_type: coverage_type.to_string(),
            coverage_for: CoverageFor::Additional.as_str().to_string(),
            cargo_value: cargo_value.to_string(),
            additional_value: Some(additional_value.to_string()),
            carrier_insurance: Some(carrier_insurance.to_string()),
        }
    }

    /// For Additional coverage, fill the cargo value with additional value +
    /// carrier insurance once either part has been entered. Unparseable parts
    /// count as zero. Other forms are returned unchanged.
    pub fn with_derived_cargo_value(mut self) -> Self {
        if CoverageFor::from_label(&self.coverage_for) != Some(CoverageFor::Additional) {
            return self;
        }

        let additional = self.additional_value.as_deref().and_then(parse_amount).unwrap_or(0.0);
        let carrier = self.carrier_insurance.as_deref().and_then(parse_amount).unwrap_or(0.0);
        if additional > 0.0 || carrier > 0.0 {
            self.cargo_value = (additional + carrier).to_string();
        }
        self
    }

    pub fn validate(&self) -> ValidationResult {
        validate(self)
    }

    /// Validate and convert into a typed request
    pub fn into_request(&self) -> Result<QuoteRequest, ValidationResult> {
        let result = validate(self);
        if !result.is_valid() {
            return Err(result);
        }

        // Every field below parsed during validation
        match (
            TransitMethod::from_label(&self.transit_method),
            CoverageType::from_label(&self.coverage_type),
            CoverageFor::from_label(&self.coverage_for),
            parse_amount(&self.cargo_value),
        ) {
            (Some(transit_method), Some(coverage_type), Some(coverage_for), Some(cargo_value)) => {
                let (additional_value, carrier_insurance) = match coverage_for {
                    CoverageFor::FullValue => (None, None),
                    CoverageFor::Additional => (
                        self.additional_value.as_deref().and_then(parse_amount),
                        self.carrier_insurance.as_deref().and_then(parse_amount),
                    ),
                };
                Ok(QuoteRequest {
                    transit_method,
                    coverage_type,
                    coverage_for,
                    cargo_value,
                    additional_value,
                    carrier_insurance,
                })
            }
            _ => Err(result),
        }
    }
}

/// Validated quote input
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuoteRequest {
    transit_method: TransitMethod,
    coverage_type: CoverageType,
    coverage_for: CoverageFor,
    cargo_value: f64,
    additional_value: Option<f64>,
    carrier_insurance: Option<f64>,
}

impl QuoteRequest {
    /// Full-value request, validated like a submitted form
    pub fn full_value(
        transit_method: TransitMethod,
        coverage_type: CoverageType,
        cargo_value: f64,
    ) -> Result<Self, ValidationResult> {
        QuoteForm::full_value(transit_method.as_str(), coverage_type.as_str(), &cargo_value.to_string())
            .into_request()
    }

    /// Additional-coverage request; cargo value is the sum of both parts
    pub fn additional(
        transit_method: TransitMethod,
        coverage_type: CoverageType,
        additional_value: f64,
        carrier_insurance: f64,
    ) -> Result<Self, ValidationResult> {
        QuoteForm::additional(
            transit_method.as_str(),
            coverage_type.as_str(),
            &(additional_value + carrier_insurance).to_string(),
            &additional_value.to_string(),
            &carrier_insurance.to_string(),
        )
        .into_request()
    }

    pub fn transit_method(&self) -> TransitMethod {
        self.transit_method
    }

    pub fn coverage_type(&self) -> CoverageType {
        self.coverage_type
    }

    pub fn coverage_for(&self) -> CoverageFor {
        self.coverage_for
    }

    pub fn cargo_value(&self) -> f64 {
        self.cargo_value
    }

    /// Present iff coverage is Additional
    pub fn additional_value(&self) -> Option<f64> {
        self.additional_value
    }

    /// Present iff coverage is Additional
    pub fn carrier_insurance(&self) -> Option<f64> {
        self.carrier_insurance
    }

    /// Amount the premium rate applies to
    pub fn insured_amount(&self) -> f64 {
        match self.coverage_for {
            CoverageFor::FullValue => self.cargo_value,
            CoverageFor::Additional => self.additional_value.unwrap_or(self.cargo_value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::validation::{Field, Violation};

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("10000"), Some(10_000.0));
        assert_eq!(parse_amount(" 10,000 "), Some(10_000.0));
        assert_eq!(parse_amount("$1,250.50"), Some(1_250.5));
        assert_eq!(parse_amount("-5"), Some(-5.0));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("12abc"), None);
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_amount("NaN"), None);
    }

    #[test]
    fn test_into_request_full_value() {
        let form = QuoteForm::full_value("Land", "All Risk", "10,000");
        let request = form.into_request().unwrap();

        assert_eq!(request.transit_method(), TransitMethod::Land);
        assert_eq!(request.coverage_type(), CoverageType::AllRisk);
        assert_eq!(request.coverage_for(), CoverageFor::FullValue);
        assert_eq!(request.cargo_value(), 10_000.0);
        assert_eq!(request.additional_value(), None);
        assert_eq!(request.insured_amount(), 10_000.0);
    }

    #[test]
    fn test_into_request_ignores_additional_fields_for_full_value() {
        let mut form = QuoteForm::full_value("Air", "Total Loss", "8000");
        form.additional_value = Some("oops".into());
        let request = form.into_request().unwrap();
        assert_eq!(request.carrier_insurance(), None);
    }

    #[test]
    fn test_into_request_additional() {
        let form = QuoteForm::additional("Ocean", "Total Loss", "25000", "20000", "5000");
        let request = form.into_request().unwrap();

        assert_eq!(request.additional_value(), Some(20_000.0));
        assert_eq!(request.carrier_insurance(), Some(5_000.0));
        assert_eq!(request.insured_amount(), 20_000.0);
    }

    #[test]
    fn test_into_request_rejects_invalid() {
        let form = QuoteForm::full_value("Land", "All Risk", "abc");
        let errors = form.into_request().unwrap_err();
        assert_eq!(errors.for_field(Field::CargoValue), vec![Violation::InvalidCargoValue]);
    }

    #[test]
    fn test_typed_constructors() {
        let request = QuoteRequest::additional(TransitMethod::Air, CoverageType::AllRisk, 1_000.5, 250.25).unwrap();
        assert_eq!(request.cargo_value(), 1_250.75);

        assert!(QuoteRequest::full_value(TransitMethod::Air, CoverageType::AllRisk, 0.0).is_err());
        assert!(QuoteRequest::full_value(TransitMethod::Air, CoverageType::AllRisk, f64::NAN).is_err());
    }

    #[test]
    fn test_derived_cargo_value() {
        let form = QuoteForm::additional("Land", "All Risk", "", "20,000", "5000").with_derived_cargo_value();
        assert_eq!(form.cargo_value, "25000");
        assert!(form.validate().is_valid());

        // Full value forms are untouched
        let form = QuoteForm::full_value("Land", "All Risk", "").with_derived_cargo_value();
        assert_eq!(form.cargo_value, "");

        // Nothing entered yet
        let form = QuoteForm::additional("Land", "All Risk", "", "", "").with_derived_cargo_value();
        assert_eq!(form.cargo_value, "");
    }

    #[test]
    fn test_form_from_json() {
        let json = r#"{
            "transitMethod": "Ocean",
            "coverageType": "Total Loss",
            "coverageFor": "Additional",
            "cargoValue": 25000,
            "additionalValue": "20,000",
            "carrierInsurance": 5000
        }"#;
        let form: QuoteForm = serde_json::from_str(json).unwrap();
        assert_eq!(form.cargo_value, "25000");
        assert_eq!(form.additional_value.as_deref(), Some("20,000"));
        assert_eq!(form.carrier_insurance.as_deref(), Some("5000"));
        assert!(form.validate().is_valid());

        let snake = r#"{"transit_method": "Air", "coverage_type": "All Risk", "coverage_for": "Full Value", "cargo_value": "900"}"#;
        let form: QuoteForm = serde_json::from_str(snake).unwrap();
        assert_eq!(form, QuoteForm::full_value("Air", "All Risk", "900"));

        let empty: QuoteForm = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, QuoteForm::default());
    }
}
