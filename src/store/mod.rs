//! Persistence contract for yearly production records and installations.
//!
//! The aggregation and intake layers only talk to [`ProductionStore`];
//! [`SqliteStore`] is the bundled implementation.

pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::estimator::PanelTechnology;

pub use sqlite::SqliteStore;

/// Errors raised by a [`ProductionStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("database connection lock poisoned")]
    Poisoned,
}

/// Measured production of one category for one calendar year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearValue {
    pub year: i32,
    /// Measured value (GWh).
    pub value_gwh: f64,
}

/// Measured production of one named category within a given year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryValue {
    pub category: String,
    /// Measured value (GWh).
    pub value_gwh: f64,
}

/// One audited figure: production of `category` during `year`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyRecord {
    pub year: i32,
    pub category: String,
    /// Measured value (GWh).
    pub value_gwh: f64,
}

/// A validated installation ready to be registered.
///
/// The surface is never stored on this type; it is derived from
/// `length_m × width_m` at insertion time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInstallation {
    pub street: String,
    pub street_number: i32,
    pub postal_code: i32,
    pub locality: String,
    pub energy_type: Option<String>,
    pub panel_technology: Option<PanelTechnology>,
    pub integration_type: Option<String>,
    /// Roof azimuth as entered by the operator, in [0, 360] degrees.
    pub azimuth_deg: f64,
    /// Roof inclination in [0, 90] degrees.
    pub inclination_deg: f64,
    pub length_m: f64,
    pub width_m: f64,
}

impl NewInstallation {
    /// Panel surface (m²).
    pub fn surface_m2(&self) -> f64 {
        self.length_m * self.width_m
    }
}

/// A registered installation as read back from the store.
///
/// Numeric columns are nullable in storage, so they are optional here.
/// Technology is kept as the stored token; rows written by other tools are
/// not guaranteed to hold a catalog value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Installation {
    pub registration_number: i64,
    pub street: String,
    pub street_number: i32,
    pub postal_code: i32,
    pub locality: String,
    pub energy_type: Option<String>,
    pub panel_technology: Option<String>,
    pub integration_type: Option<String>,
    pub azimuth_deg: Option<f64>,
    pub inclination_deg: Option<f64>,
    pub length_m: Option<f64>,
    pub width_m: Option<f64>,
    pub surface_m2: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Query and insert operations consumed by the estimation core.
///
/// Implementations must be safe to share between request handlers.
pub trait ProductionStore: Send + Sync {
    /// The most recent `limit` values of `category` strictly before
    /// `before_year`, newest first.
    fn latest_values(
        &self,
        category: &str,
        before_year: i32,
        limit: usize,
    ) -> Result<Vec<YearValue>, StoreError>;

    /// Values of `category` for years in `[start_year, end_year]`, oldest first.
    fn values_in_range(
        &self,
        category: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<YearValue>, StoreError>;

    /// The latest recorded calendar year, if any year exists.
    fn max_year(&self) -> Result<Option<i32>, StoreError>;

    /// Values recorded for `year`, restricted to the named categories.
    ///
    /// Order of the result is unspecified.
    fn values_for_year(
        &self,
        year: i32,
        categories: &[&str],
    ) -> Result<Vec<CategoryValue>, StoreError>;

    /// Installations whose selected energy type contains `pattern`,
    /// compared case-insensitively.
    fn installations_by_energy_type(&self, pattern: &str)
    -> Result<Vec<Installation>, StoreError>;

    /// Highest registration number handed out so far.
    ///
    /// Informational only; new numbers are assigned by
    /// [`ProductionStore::insert_installation`].
    fn max_registration_number(&self) -> Result<Option<i64>, StoreError>;

    /// Persists a new installation and returns its registration number.
    ///
    /// Numbers are assigned atomically by the store, strictly increase and
    /// are never reused.
    fn insert_installation(&self, installation: &NewInstallation) -> Result<i64, StoreError>;

    /// Records `value_gwh` for (`year`, `category`), replacing any previous value.
    fn upsert_yearly_value(
        &self,
        year: i32,
        category: &str,
        value_gwh: f64,
    ) -> Result<(), StoreError>;

    /// Records every value in `records`, all or none.
    fn upsert_yearly_values(&self, records: &[YearlyRecord]) -> Result<(), StoreError>;
}
