//! Tiered deductibles by cargo value

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serialized form of the manual-quote sentinel
pub const MANUAL_QUOTE_LABEL: &str = "quote";

/// Deductible outcome for a cargo value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deductible {
    /// Fixed out-of-pocket amount
    Amount(f64),
    /// Value is outside automatic underwriting and needs a human quote
    ManualQuote,
}

impl Deductible {
    pub fn is_manual_quote(&self) -> bool {
        matches!(self, Deductible::ManualQuote)
    }

    pub fn amount(&self) -> Option<f64> {
        match self {
            Deductible::Amount(amount) => Some(*amount),
            Deductible::ManualQuote => None,
        }
    }
}

impl fmt::Display for Deductible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deductible::Amount(amount) => f.write_str(&crate::quote::format_currency(*amount)),
            Deductible::ManualQuote => f.write_str("requires manual quote"),
        }
    }
}

// Amounts serialize as numbers and the sentinel as "quote"
impl Serialize for Deductible {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Deductible::Amount(amount) => serializer.serialize_f64(*amount),
            Deductible::ManualQuote => serializer.serialize_str(MANUAL_QUOTE_LABEL),
        }
    }
}

impl<'de> Deserialize<'de> for Deductible {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Amount(f64),
            Label(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Amount(amount) => Ok(Deductible::Amount(amount)),
            Repr::Label(label) if label == MANUAL_QUOTE_LABEL => Ok(Deductible::ManualQuote),
            Repr::Label(other) => Err(de::Error::custom(format!("unknown deductible label: {}", other))),
        }
    }
}

/// One cargo-value band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeductibleTier {
    /// Lower bound, inclusive
    pub min: f64,

    /// Upper bound, inclusive (None = unbounded)
    pub max: Option<f64>,

    pub deductible: Deductible,
}

impl DeductibleTier {
    pub fn new(min: f64, max: Option<f64>, deductible: Deductible) -> Self {
        Self { min, max, deductible }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && self.max.map_or(true, |max| value <= max)
    }
}

/// Resolve the deductible for a cargo value.
///
/// Tiers are scanned in table order and the first tier whose inclusive range
/// contains the value wins, so overlapping tiers resolve to the earlier one.
/// A value that matches no tier (gaps, values above the last bound, NaN)
/// resolves to [`Deductible::ManualQuote`].
pub fn resolve_deductible(value: f64, tiers: &[DeductibleTier]) -> Deductible {
    tiers
        .iter()
        .find(|tier| tier.contains(value))
        .map(|tier| tier.deductible)
        .unwrap_or(Deductible::ManualQuote)
}

/// Ordered deductible tiers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeductibleTable {
    tiers: Vec<DeductibleTier>,
}

impl DeductibleTable {
    /// Tiers are kept in the given order; contiguity is not checked
    pub fn new(tiers: Vec<DeductibleTier>) -> Self {
        Self { tiers }
    }

    /// Static schedule used when no rate store is configured or reachable
    pub fn fallback() -> Self {
        Self::new(vec![
            DeductibleTier::new(0.0, Some(5_000.0), Deductible::Amount(0.0)),
            DeductibleTier::new(5_000.01, Some(50_999.0), Deductible::Amount(500.0)),
            DeductibleTier::new(50_999.01, Some(100_999.0), Deductible::Amount(750.0)),
            DeductibleTier::new(100_999.01, Some(350_999.0), Deductible::Amount(1_500.0)),
            DeductibleTier::new(350_999.01, Some(500_000.0), Deductible::Amount(2_000.0)),
            DeductibleTier::new(500_000.01, None, Deductible::ManualQuote),
        ])
    }

    pub fn resolve(&self, value: f64) -> Deductible {
        resolve_deductible(value, &self.tiers)
    }

    pub fn tiers(&self) -> &[DeductibleTier] {
        &self.tiers
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}
