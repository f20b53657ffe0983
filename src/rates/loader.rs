//! Row-level loading of rate, deductible and goods category tables
//!
//! The rate store exposes one row per (transit method, coverage type, coverage
//! basis), one row per deductible tier and one row per goods category. The same column names are used for
//! the CSV exports in data/tables/ and for the JSON returned by the REST store.

use super::{
    CategoryList, CoverageFor, CoverageType, Deductible, DeductibleTable, DeductibleTier, RateEntry, RateTable,
    TransitMethod, DEFAULT_MINIMUM_PREMIUM,
};
use crate::errors::SourceError;
use crate::quote::round_to_cents;
use csv::Reader;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Default directory holding rates.csv and deductible_tiers.csv
pub const DEFAULT_TABLE_PATH: &str = "data/tables";

pub const RATES_FILE: &str = "rates.csv";
pub const DEDUCTIBLES_FILE: &str = "deductible_tiers.csv";
pub const CATEGORIES_FILE: &str = "goods_categories.csv";

fn default_active() -> bool {
    true
}

/// Raw row of the rates_overview table
#[derive(Debug, Clone, Deserialize)]
pub struct RateRow {
    pub transit_method: String,
    pub coverage_type: String,
    pub coverage_for: String,
    pub rate: f64,
    #[serde(default)]
    pub minimum_premium: Option<f64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Raw row of the deductible_tiers table
#[derive(Debug, Clone, Deserialize)]
pub struct DeductibleRow {
    pub min_cargo_value: f64,
    /// Missing upper bound means unbounded
    #[serde(default)]
    pub max_cargo_value: Option<f64>,
    #[serde(default)]
    pub deductible_amount: Option<f64>,
    #[serde(default)]
    pub requires_quote: bool,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Raw row of the goods_categories table
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRow {
    pub name: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Default)]
struct PartialEntry {
    full_value: Option<f64>,
    additional: Option<f64>,
    minimum: Option<f64>,
}

/// Build a rate table from store rows.
///
/// Rows are grouped per (transit method, coverage type). A combination only
/// becomes an entry when both a Full Value and an Additional rate are present;
/// incomplete combinations are dropped so that lookups fail instead of pricing
/// with an undefined rate. Later rows overwrite earlier ones. Minimum premiums
/// are kept in whole cents.
pub fn rates_from_rows(rows: &[RateRow]) -> Result<RateTable, SourceError> {
    let mut partial: BTreeMap<(TransitMethod, CoverageType), PartialEntry> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.is_active) {
        let transit = TransitMethod::from_label(&row.transit_method).ok_or_else(|| {
            SourceError::Malformed(format!("unknown transit method: {}", row.transit_method))
        })?;
        let coverage = CoverageType::from_label(&row.coverage_type).ok_or_else(|| {
            SourceError::Malformed(format!("unknown coverage type: {}", row.coverage_type))
        })?;
        let coverage_for = CoverageFor::from_label(&row.coverage_for).ok_or_else(|| {
            SourceError::Malformed(format!("unknown coverage basis: {}", row.coverage_for))
        })?;

        if !row.rate.is_finite() || row.rate <= 0.0 {
            return Err(SourceError::Malformed(format!(
                "rate for {} / {} / {} must be positive, got {}",
                transit, coverage, coverage_for, row.rate
            )));
        }

        let minimum = match row.minimum_premium {
            Some(minimum) if minimum.is_finite() && minimum >= 0.0 => Some(round_to_cents(minimum)),
            Some(minimum) => {
                return Err(SourceError::Malformed(format!(
                    "minimum premium for {} / {} / {} must be non-negative, got {}",
                    transit, coverage, coverage_for, minimum
                )))
            }
            None => None,
        };

        let entry = partial.entry((transit, coverage)).or_default();
        match coverage_for {
            CoverageFor::FullValue => entry.full_value = Some(row.rate),
            CoverageFor::Additional => entry.additional = Some(row.rate),
        }
        if minimum.is_some() {
            entry.minimum = minimum;
        }
    }

    let mut table = RateTable::new();
    for ((transit, coverage), entry) in partial {
        match (entry.additional, entry.full_value) {
            (Some(additional), Some(full_value)) => {
                let minimum = entry.minimum.unwrap_or(DEFAULT_MINIMUM_PREMIUM);
                table.insert(transit, coverage, RateEntry::new(additional, full_value, minimum));
            }
            _ => warn!(
                "Dropping incomplete rate combination {} / {} (needs both Full Value and Additional rows)",
                transit, coverage
            ),
        }
    }

    if table.is_empty() {
        return Err(SourceError::Empty("rates"));
    }

    debug!("Built rate table with {} entries from {} rows", table.len(), rows.len());
    Ok(table)
}

/// Build a deductible table from store rows, ordered by display_order
pub fn deductibles_from_rows(rows: &[DeductibleRow]) -> Result<DeductibleTable, SourceError> {
    let mut active: Vec<&DeductibleRow> = rows.iter().filter(|r| r.is_active).collect();
    // Stable sort keeps file order for equal display_order
    active.sort_by_key(|r| r.display_order);

    let mut tiers = Vec::with_capacity(active.len());
    for row in active {
        let deductible = if row.requires_quote {
            Deductible::ManualQuote
        } else {
            match row.deductible_amount {
                Some(amount) if amount.is_finite() && amount >= 0.0 => Deductible::Amount(amount),
                Some(amount) => {
                    return Err(SourceError::Malformed(format!(
                        "deductible for tier starting at {} must be non-negative, got {}",
                        row.min_cargo_value, amount
                    )))
                }
                None => {
                    return Err(SourceError::Malformed(format!(
                        "tier starting at {} has no deductible amount and does not require a quote",
                        row.min_cargo_value
                    )))
                }
            }
        };
        tiers.push(DeductibleTier::new(row.min_cargo_value, row.max_cargo_value, deductible));
    }

    if tiers.is_empty() {
        return Err(SourceError::Empty("deductible tiers"));
    }

    Ok(DeductibleTable::new(tiers))
}

/// Build the category list from store rows, ordered by display_order.
///
/// Blank names are skipped and repeated names keep their first position.
pub fn categories_from_rows(rows: &[CategoryRow]) -> Result<CategoryList, SourceError> {
    let mut active: Vec<&CategoryRow> = rows.iter().filter(|r| r.is_active).collect();
    active.sort_by_key(|r| r.display_order);

    let mut names: Vec<String> = Vec::with_capacity(active.len());
    for row in active {
        let name = row.name.trim();
        if name.is_empty() || names.iter().any(|n| n == name) {
            continue;
        }
        names.push(name.to_string());
    }

    if names.is_empty() {
        return Err(SourceError::Empty("goods categories"));
    }

    Ok(CategoryList::new(names))
}

/// Read rate rows from any CSV reader
pub fn load_rate_rows_from_reader<R: Read>(reader: R) -> Result<Vec<RateRow>, SourceError> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut rows = Vec::new();

    for result in csv_reader.deserialize() {
        let row: RateRow = result?;
        rows.push(row);
    }

    Ok(rows)
}

/// Read deductible rows from any CSV reader
pub fn load_deductible_rows_from_reader<R: Read>(reader: R) -> Result<Vec<DeductibleRow>, SourceError> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut rows = Vec::new();

    for result in csv_reader.deserialize() {
        let row: DeductibleRow = result?;
        rows.push(row);
    }

    Ok(rows)
}

/// Read category rows from any CSV reader
pub fn load_category_rows_from_reader<R: Read>(reader: R) -> Result<Vec<CategoryRow>, SourceError> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut rows = Vec::new();

    for result in csv_reader.deserialize() {
        let row: CategoryRow = result?;
        rows.push(row);
    }

    Ok(rows)
}

/// Load the rate table from `rates.csv` in the given directory
pub fn load_rates(dir: &Path) -> Result<RateTable, SourceError> {
    let file = std::fs::File::open(dir.join(RATES_FILE))?;
    let rows = load_rate_rows_from_reader(file)?;
    rates_from_rows(&rows)
}

/// Load the deductible table from `deductible_tiers.csv` in the given directory
pub fn load_deductibles(dir: &Path) -> Result<DeductibleTable, SourceError> {
    let file = std::fs::File::open(dir.join(DEDUCTIBLES_FILE))?;
    let rows = load_deductible_rows_from_reader(file)?;
    deductibles_from_rows(&rows)
}

/// Load the category list from `goods_categories.csv` in the given directory
pub fn load_categories(dir: &Path) -> Result<CategoryList, SourceError> {
    let file = std::fs::File::open(dir.join(CATEGORIES_FILE))?;
    let rows = load_category_rows_from_reader(file)?;
    categories_from_rows(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::{compute_quote, QuoteRequest};

    const RATES_CSV: &str = "\
transit_method,coverage_type,coverage_for,rate,minimum_premium,is_active
Land,All Risk,Full Value,0.00115,75,true
Land,All Risk,Additional,0.0011,75,true
Air,All Risk,Full Value,0.002,100,true
Air,All Risk,Additional,0.0018,,true
Ocean,All Risk,Full Value,0.0025,75,true
Ocean,Total Loss,Full Value,0.003,75,false
";

    const DEDUCTIBLES_CSV: &str = "\
min_cargo_value,max_cargo_value,deductible_amount,requires_quote,display_order,is_active
5000.01,50999,500,false,2,true
0,5000,0,false,1,true
50999.01,,,true,3,true
0,100,999,false,0,false
";

    #[test]
    fn test_rates_from_csv() {
        let rows = load_rate_rows_from_reader(RATES_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 6);

        let table = rates_from_rows(&rows).unwrap();
        // Ocean/All Risk lacks an Additional row; Ocean/Total Loss is inactive
        assert_eq!(table.len(), 2);
        assert!(table.get(TransitMethod::Ocean, CoverageType::AllRisk).is_none());
        assert!(table.get(TransitMethod::Ocean, CoverageType::TotalLoss).is_none());

        let land = table.get(TransitMethod::Land, CoverageType::AllRisk).unwrap();
        assert_eq!(land.full_value_rate, 0.00115);
        assert_eq!(land.additional_rate, 0.0011);

        // Minimum premium from the Full Value row survives a blank on the Additional row
        let air = table.get(TransitMethod::Air, CoverageType::AllRisk).unwrap();
        assert_eq!(air.minimum_premium, 100.0);
        assert_eq!(air.additional_rate, 0.0018);
    }

    #[test]
    fn test_missing_minimum_defaults() {
        let rows = vec![
            RateRow {
                transit_method: "Air".into(),
                coverage_type: "Total Loss".into(),
                coverage_for: "Full Value".into(),
                rate: 0.002,
                minimum_premium: None,
                is_active: true,
            },
            RateRow {
                transit_method: "Air".into(),
                coverage_type: "Total Loss".into(),
                coverage_for: "Additional".into(),
                rate: 0.002,
                minimum_premium: None,
                is_active: true,
            },
        ];
        let table = rates_from_rows(&rows).unwrap();
        let entry = table.get(TransitMethod::Air, CoverageType::TotalLoss).unwrap();
        assert_eq!(entry.minimum_premium, DEFAULT_MINIMUM_PREMIUM);
    }

    #[test]
    fn test_unknown_label_is_malformed() {
        let csv = "transit_method,coverage_type,coverage_for,rate,minimum_premium\nRail,All Risk,Full Value,0.001,75\n";
        let rows = load_rate_rows_from_reader(csv.as_bytes()).unwrap();
        assert!(matches!(rates_from_rows(&rows), Err(SourceError::Malformed(_))));
    }

    fn rate_pair(minimum: f64) -> Vec<RateRow> {
        ["Full Value", "Additional"]
            .into_iter()
            .map(|coverage_for| RateRow {
                transit_method: "Land".into(),
                coverage_type: "Total Loss".into(),
                coverage_for: coverage_for.into(),
                rate: 0.0001,
                minimum_premium: Some(minimum),
                is_active: true,
            })
            .collect()
    }

    #[test]
    fn test_bad_minimum_premium_is_malformed() {
        for minimum in [-50.0, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(rates_from_rows(&rate_pair(minimum)), Err(SourceError::Malformed(_))),
                "{}",
                minimum
            );
        }
    }

    #[test]
    fn test_minimum_premium_rounded_to_cents() {
        let table = rates_from_rows(&rate_pair(75.554)).unwrap();
        let entry = table.get(TransitMethod::Land, CoverageType::TotalLoss).unwrap();
        assert_eq!(entry.minimum_premium, 75.55);

        let request = QuoteRequest::full_value(TransitMethod::Land, CoverageType::TotalLoss, 1_000.0).unwrap();
        let quote = compute_quote(&request, &table, &DeductibleTable::fallback()).unwrap();
        assert_eq!(quote.premium, 75.55);
        assert!(quote.premium >= quote.minimum_premium);
    }

    #[test]
    fn test_no_complete_rows_is_empty() {
        let csv = "transit_method,coverage_type,coverage_for,rate\nLand,All Risk,Full Value,0.001\n";
        let rows = load_rate_rows_from_reader(csv.as_bytes()).unwrap();
        assert!(matches!(rates_from_rows(&rows), Err(SourceError::Empty(_))));
    }

    #[test]
    fn test_deductibles_from_csv() {
        let rows = load_deductible_rows_from_reader(DEDUCTIBLES_CSV.as_bytes()).unwrap();
        let table = deductibles_from_rows(&rows).unwrap();

        // Inactive row dropped, remaining rows ordered by display_order
        assert_eq!(table.len(), 3);
        assert_eq!(table.tiers()[0].min, 0.0);
        assert_eq!(table.tiers()[2].max, None);

        assert_eq!(table.resolve(999.0), Deductible::Amount(0.0));
        assert_eq!(table.resolve(20_000.0), Deductible::Amount(500.0));
        assert_eq!(table.resolve(2_000_000.0), Deductible::ManualQuote);
    }

    #[test]
    fn test_deductible_without_amount_is_malformed() {
        let csv = "min_cargo_value,max_cargo_value,deductible_amount,requires_quote\n0,5000,,false\n";
        let rows = load_deductible_rows_from_reader(csv.as_bytes()).unwrap();
        assert!(matches!(deductibles_from_rows(&rows), Err(SourceError::Malformed(_))));
    }

    #[test]
    fn test_load_default_tables() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_TABLE_PATH);

        let rates = load_rates(&dir).expect("Failed to load rates.csv");
        assert_eq!(rates, RateTable::fallback());

        let deductibles = load_deductibles(&dir).expect("Failed to load deductible_tiers.csv");
        assert_eq!(deductibles, DeductibleTable::fallback());

        let categories = load_categories(&dir).expect("Failed to load goods_categories.csv");
        assert_eq!(categories, CategoryList::fallback());
    }

    #[test]
    fn test_categories_from_csv() {
        let csv = "\
name,display_order,is_active
Vehicles (Road),3,true
Textiles & Apparel,1,true
Livestock,2,false
  ,4,true
Textiles & Apparel,5,true
";
        let rows = load_category_rows_from_reader(csv.as_bytes()).unwrap();
        let categories = categories_from_rows(&rows).unwrap();
        assert_eq!(categories.names(), ["Textiles & Apparel", "Vehicles (Road)"]);
    }

    #[test]
    fn test_no_active_categories_is_empty() {
        let csv = "name,is_active\nLivestock,false\n";
        let rows = load_category_rows_from_reader(csv.as_bytes()).unwrap();
        assert!(matches!(categories_from_rows(&rows), Err(SourceError::Empty(_))));
    }
}
