//! Rate tables, deductible tiers, goods categories, and the sources that supply them

mod category;
mod deductible;
pub mod loader;
pub mod source;

pub use category::{CategoryList, FALLBACK_CATEGORIES};
pub use deductible::{resolve_deductible, Deductible, DeductibleTable, DeductibleTier};
pub use loader::{CategoryRow, DeductibleRow, RateRow};
pub use source::{
    CategorySource, DeductibleSource, FileSource, RateSource, RestSource, StaticSource, TableSet, WithFallback,
};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Minimum premium applied when a rate row does not carry one
pub const DEFAULT_MINIMUM_PREMIUM: f64 = 75.0;

/// How the cargo travels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransitMethod {
    Land,
    Air,
    Ocean,
}

impl TransitMethod {
    pub const ALL: [TransitMethod; 3] = [TransitMethod::Land, TransitMethod::Air, TransitMethod::Ocean];

    /// Parse the label used by the quote form and the rate store
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Land" => Some(TransitMethod::Land),
            "Air" => Some(TransitMethod::Air),
            "Ocean" => Some(TransitMethod::Ocean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitMethod::Land => "Land",
            TransitMethod::Air => "Air",
            TransitMethod::Ocean => "Ocean",
        }
    }
}

impl fmt::Display for TransitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Perils covered by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CoverageType {
    #[serde(rename = "All Risk")]
    AllRisk,
    #[serde(rename = "Total Loss")]
    TotalLoss,
}

impl CoverageType {
    pub const ALL: [CoverageType; 2] = [CoverageType::AllRisk, CoverageType::TotalLoss];

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "All Risk" => Some(CoverageType::AllRisk),
            "Total Loss" => Some(CoverageType::TotalLoss),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageType::AllRisk => "All Risk",
            CoverageType::TotalLoss => "Total Loss",
        }
    }
}

impl fmt::Display for CoverageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coverage basis: insure the whole cargo value, or only a top-up over the
/// carrier's own liability cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoverageFor {
    #[serde(rename = "Full Value")]
    FullValue,
    Additional,
}

impl CoverageFor {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Full Value" => Some(CoverageFor::FullValue),
            "Additional" => Some(CoverageFor::Additional),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageFor::FullValue => "Full Value",
            CoverageFor::Additional => "Additional",
        }
    }
}

impl fmt::Display for CoverageFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rates for one (transit method, coverage type) combination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    /// Rate applied to the additional value on top-up coverage
    pub additional_rate: f64,

    /// Rate applied to the full cargo value
    pub full_value_rate: f64,

    /// Floor premium regardless of rate x insured amount
    pub minimum_premium: f64,
}

impl RateEntry {
    pub fn new(additional_rate: f64, full_value_rate: f64, minimum_premium: f64) -> Self {
        Self {
            additional_rate,
            full_value_rate,
            minimum_premium,
        }
    }

    /// Rate for the given coverage basis, as a fraction (0.00115 = 0.115%)
    pub fn rate_for(&self, coverage_for: CoverageFor) -> f64 {
        match coverage_for {
            CoverageFor::FullValue => self.full_value_rate,
            CoverageFor::Additional => self.additional_rate,
        }
    }
}

/// Rate lookup keyed by (transit method, coverage type)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    entries: HashMap<(TransitMethod, CoverageType), RateEntry>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Static table used when no rate store is configured or reachable
    pub fn fallback() -> Self {
        let mut table = Self::new();
        for coverage_type in CoverageType::ALL {
            table.insert(TransitMethod::Land, coverage_type, RateEntry::new(0.0011, 0.00115, 75.0));
            table.insert(TransitMethod::Air, coverage_type, RateEntry::new(0.002, 0.002, 75.0));
            table.insert(TransitMethod::Ocean, coverage_type, RateEntry::new(0.0025, 0.0025, 75.0));
        }
        table
    }

    /// Insert or replace the entry for a combination
    pub fn insert(&mut self, transit_method: TransitMethod, coverage_type: CoverageType, entry: RateEntry) {
        self.entries.insert((transit_method, coverage_type), entry);
    }

    pub fn get(&self, transit_method: TransitMethod, coverage_type: CoverageType) -> Option<&RateEntry> {
        self.entries.get(&(transit_method, coverage_type))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in stable (transit method, coverage type) order
    pub fn entries(&self) -> Vec<(TransitMethod, CoverageType, RateEntry)> {
        let mut rows: Vec<_> = self
            .entries
            .iter()
            .map(|(&(transit, coverage), &entry)| (transit, coverage, entry))
            .collect();
        rows.sort_by_key(|&(transit, coverage, _)| (transit, coverage));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_covers_every_combination() {
        let table = RateTable::fallback();
        assert_eq!(table.len(), 6);

        for transit in TransitMethod::ALL {
            for coverage in CoverageType::ALL {
                assert!(table.get(transit, coverage).is_some(), "{} / {}", transit, coverage);
            }
        }
    }

    #[test]
    fn test_fallback_land_rates() {
        let table = RateTable::fallback();
        let land = table.get(TransitMethod::Land, CoverageType::AllRisk).unwrap();

        assert_eq!(land.additional_rate, 0.0011);
        assert_eq!(land.full_value_rate, 0.00115);
        assert_eq!(land.minimum_premium, 75.0);
        assert_eq!(land.rate_for(CoverageFor::FullValue), 0.00115);
        assert_eq!(land.rate_for(CoverageFor::Additional), 0.0011);
    }

    #[test]
    fn test_labels() {
        assert_eq!(TransitMethod::from_label(" Ocean "), Some(TransitMethod::Ocean));
        assert_eq!(TransitMethod::from_label("Rail"), None);
        assert_eq!(CoverageType::from_label("Total Loss"), Some(CoverageType::TotalLoss));
        assert_eq!(CoverageType::from_label("total loss"), None);
        assert_eq!(CoverageFor::from_label("Full Value"), Some(CoverageFor::FullValue));
        assert_eq!(CoverageFor::Additional.to_string(), "Additional");
    }

    #[test]
    fn test_entries_sorted() {
        let table = RateTable::fallback();
        let entries = table.entries();
        assert_eq!(entries[0].0, TransitMethod::Land);
        assert_eq!(entries[0].1, CoverageType::AllRisk);
        assert_eq!(entries[5].0, TransitMethod::Ocean);
        assert_eq!(entries[5].1, CoverageType::TotalLoss);
    }
}
