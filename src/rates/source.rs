//! Capability traits for supplying rate, deductible and goods category tables
//!
//! Implementations:
//! - [`StaticSource`]: built-in fallback tables
//! - [`FileSource`]: CSV exports of the rate store
//! - [`RestSource`]: the rate store's REST interface
//! - [`WithFallback`]: any source, degrading to the static tables on failure
//!   (an empty category list counts as a failure)

use super::loader::{self, CategoryRow, DeductibleRow, RateRow};
use super::{CategoryList, DeductibleTable, RateTable};
use crate::errors::SourceError;
use log::{info, warn};
use reqwest::blocking::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;

const USER_AGENT: &str = concat!("freight-quote/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Supplies the rate table
pub trait RateSource {
    fn load_rates(&self) -> Result<RateTable, SourceError>;
}

/// Supplies the deductible tier table
pub trait DeductibleSource {
    fn load_deductibles(&self) -> Result<DeductibleTable, SourceError>;
}

/// Supplies the goods category list
pub trait CategorySource {
    fn load_categories(&self) -> Result<CategoryList, SourceError>;
}

/// Every table resolved from a single source
#[derive(Debug, Clone, PartialEq)]
pub struct TableSet {
    pub rates: RateTable,
    pub deductibles: DeductibleTable,
    pub categories: CategoryList,
}

impl TableSet {
    /// The built-in tables
    pub fn fallback() -> Self {
        Self {
            rates: RateTable::fallback(),
            deductibles: DeductibleTable::fallback(),
            categories: CategoryList::fallback(),
        }
    }

    pub fn load<S>(source: &S) -> Result<Self, SourceError>
    where
        S: RateSource + DeductibleSource + CategorySource + ?Sized,
    {
        Ok(Self {
            rates: source.load_rates()?,
            deductibles: source.load_deductibles()?,
            categories: source.load_categories()?,
        })
    }
}

/// Built-in tables
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSource;

impl RateSource for StaticSource {
    fn load_rates(&self) -> Result<RateTable, SourceError> {
        Ok(RateTable::fallback())
    }
}

impl DeductibleSource for StaticSource {
    fn load_deductibles(&self) -> Result<DeductibleTable, SourceError> {
        Ok(DeductibleTable::fallback())
    }
}

impl CategorySource for StaticSource {
    fn load_categories(&self) -> Result<CategoryList, SourceError> {
        Ok(CategoryList::fallback())
    }
}

/// CSV exports of the rate store in a directory
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Source reading from data/tables
    pub fn default_path() -> Self {
        Self::new(loader::DEFAULT_TABLE_PATH)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RateSource for FileSource {
    fn load_rates(&self) -> Result<RateTable, SourceError> {
        loader::load_rates(&self.dir)
    }
}

impl DeductibleSource for FileSource {
    fn load_deductibles(&self) -> Result<DeductibleTable, SourceError> {
        loader::load_deductibles(&self.dir)
    }
}

impl CategorySource for FileSource {
    fn load_categories(&self) -> Result<CategoryList, SourceError> {
        loader::load_categories(&self.dir)
    }
}

/// REST interface of the rate store (PostgREST-style filters)
#[derive(Debug, Clone)]
pub struct RestSource {
    base_url: String,
    api_key: String,
    http: Client,
}

impl RestSource {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, SourceError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }

    fn endpoint(&self, query: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, query)
    }

    fn fetch<T: serde::de::DeserializeOwned>(&self, query: &str) -> Result<T, SourceError> {
        let endpoint = self.endpoint(query);
        let response = self
            .http
            .get(&endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        Ok(response.json()?)
    }
}

impl RateSource for RestSource {
    fn load_rates(&self) -> Result<RateTable, SourceError> {
        let rows: Vec<RateRow> = self.fetch("rates_overview?is_active=eq.true")?;
        loader::rates_from_rows(&rows)
    }
}

impl DeductibleSource for RestSource {
    fn load_deductibles(&self) -> Result<DeductibleTable, SourceError> {
        let rows: Vec<DeductibleRow> = self.fetch("deductible_tiers?is_active=eq.true&order=display_order")?;
        loader::deductibles_from_rows(&rows)
    }
}

impl CategorySource for RestSource {
    fn load_categories(&self) -> Result<CategoryList, SourceError> {
        let rows: Vec<CategoryRow> = self.fetch("goods_categories?is_active=eq.true&order=display_order")?;
        loader::categories_from_rows(&rows)
    }
}

/// Wraps a source so that any load failure degrades to the built-in tables.
///
/// Each table falls back independently.
#[derive(Debug, Clone)]
pub struct WithFallback<S> {
    primary: S,
}

impl<S> WithFallback<S> {
    pub fn new(primary: S) -> Self {
        Self { primary }
    }

    pub fn primary(&self) -> &S {
        &self.primary
    }
}

impl<S: RateSource> RateSource for WithFallback<S> {
    fn load_rates(&self) -> Result<RateTable, SourceError> {
        match self.primary.load_rates() {
            Ok(table) => {
                info!("Loaded {} rate entries from configured source", table.len());
                Ok(table)
            }
            Err(e) => {
                warn!("Rate source failed ({}), using fallback rates", e);
                StaticSource.load_rates()
            }
        }
    }
}

impl<S: DeductibleSource> DeductibleSource for WithFallback<S> {
    fn load_deductibles(&self) -> Result<DeductibleTable, SourceError> {
        match self.primary.load_deductibles() {
            Ok(table) => {
                info!("Loaded {} deductible tiers from configured source", table.len());
                Ok(table)
            }
            Err(e) => {
                warn!("Deductible source failed ({}), using fallback tiers", e);
                StaticSource.load_deductibles()
            }
        }
    }
}

impl<S: CategorySource> CategorySource for WithFallback<S> {
    fn load_categories(&self) -> Result<CategoryList, SourceError> {
        match self.primary.load_categories() {
            Ok(categories) => {
                info!("Loaded {} goods categories from configured source", categories.len());
                Ok(categories)
            }
            Err(e) => {
                warn!("Category source failed ({}), using fallback categories", e);
                StaticSource.load_categories()
            }
        }
    }
}
