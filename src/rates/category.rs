//! Goods categories offered when describing a shipment

use serde::{Deserialize, Serialize};

/// Built-in category list, used when no source provides one
pub const FALLBACK_CATEGORIES: [&str; 32] = [
    "Automotive Parts & Accessories",
    "Aviation & Aerospace Equipment",
    "Battery Cells & Modules",
    "Chemicals & Consumables",
    "Construction Vehicles (Off-Road)",
    "Electrical & Control Components",
    "Electrical & Electronic Equipment",
    "Electronics & Consumer Goods",
    "Energy Storage Systems",
    "EV Charging Systems",
    "Food & Agricultural Products",
    "Foodservice & Kitchen Equipment",
    "Furniture & Home Goods",
    "Heavy Machinery & Construction Equipment",
    "Industrial Machinery & Manufacturing Equipment",
    "Machine Parts & Accessories",
    "Marine Vessels & Equipment",
    "Medical & Laboratory Equipment",
    "Metals & Raw Materials",
    "Military & Defense Equipment",
    "Miscellaneous & Consumables",
    "Miscellaneous General Cargo",
    "Oilfield & Mining Equipment",
    "Packaging & Logistics",
    "Packaging & Paper Products",
    "Power Generation & Energy Equipment",
    "Renewable Energy Equipment",
    "Textiles & Apparel",
    "Tools & Workshop Equipment",
    "Trade Show & Display Equipment",
    "Vehicles (Road)",
    "Wood & Building Materials",
];

/// Ordered list of goods category names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryList {
    names: Vec<String>,
}

impl CategoryList {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn fallback() -> Self {
        Self::new(FALLBACK_CATEGORIES.iter().map(|name| name.to_string()).collect())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Listed spelling of a category, ignoring case and surrounding whitespace
    pub fn find(&self, category: &str) -> Option<&str> {
        let wanted = category.trim();
        self.names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(wanted))
            .map(String::as_str)
    }
}

impl Default for CategoryList {
    fn default() -> Self {
        Self::fallback()
    }
}
