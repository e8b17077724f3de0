//! TOML-based service configuration.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Top-level configuration parsed from TOML.
///
/// Every section has defaults, so an empty file (or no file at all) yields
/// a working configuration. Load with [`AppConfig::from_toml_file`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database location.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Chart, series and breakdown parameters.
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Interface to bind.
    pub bind: String,
    /// TCP port (must be > 0).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("valais-energy.db"),
        }
    }
}

/// One entry of the ordered breakdown allow-list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BreakdownEntry {
    /// Stored category name.
    pub category: String,
    /// Label shown to readers.
    pub label: String,
}

impl BreakdownEntry {
    fn new(category: &str, label: &str) -> Self {
        Self {
            category: category.to_string(),
            label: label.to_string(),
        }
    }
}

/// Parameters of the production chart, PV series and breakdown.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregationConfig {
    /// Year of the synthesized estimate. Defaults to the current calendar year.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporting_year: Option<i32>,
    /// Number of historical years shown on the production chart.
    pub chart_years: usize,
    /// Title of the production chart.
    pub chart_title: String,
    /// Category holding gross cantonal production.
    pub gross_production_category: String,
    /// Category holding photovoltaic production.
    pub pv_category: String,
    /// Title of the photovoltaic series.
    pub pv_title: String,
    /// First year of the photovoltaic series (inclusive).
    pub pv_window_start: i32,
    /// Last year of the photovoltaic series (inclusive).
    pub pv_window_end: i32,
    /// Substring identifying photovoltaic installations by energy type.
    pub pv_energy_type_pattern: String,
    /// Ordered allow-list of breakdown categories.
    pub breakdown: Vec<BreakdownEntry>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            reporting_year: None,
            chart_years: 10,
            chart_title: "Production [GWh]".to_string(),
            gross_production_category: "Production cantonale brute".to_string(),
            pv_category: "Installations photovoltaïques".to_string(),
            pv_title: "Photovoltaic production [GWh]".to_string(),
            pv_window_start: 2015,
            pv_window_end: 2024,
            pv_energy_type_pattern: "photovolta".to_string(),
            breakdown: vec![
                BreakdownEntry::new("Centrales hydrauliques - Total", "Hydraulique"),
                BreakdownEntry::new("Centrales thermiques - Total", "Thermiques"),
                BreakdownEntry::new("Installations biogaz", "Biogaz"),
                BreakdownEntry::new("Installations photovoltaïques", "Photovoltaïque"),
                BreakdownEntry::new("Installations éoliennes", "Éolien"),
            ],
        }
    }
}

impl AggregationConfig {
    /// The year the synthesized estimate is reported under.
    pub fn reporting_year(&self) -> i32 {
        self.reporting_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, thiserror::Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"aggregation.chart_years"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl AppConfig {
    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Renders the default configuration as TOML.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::new("server.port", "must be > 0"));
        }
        if self.database.path.as_os_str().is_empty() {
            errors.push(ConfigError::new("database.path", "must not be empty"));
        }

        let agg = &self.aggregation;
        if agg.chart_years == 0 {
            errors.push(ConfigError::new("aggregation.chart_years", "must be > 0"));
        }
        if agg.pv_window_start > agg.pv_window_end {
            errors.push(ConfigError::new(
                "aggregation.pv_window_start",
                "must be <= aggregation.pv_window_end",
            ));
        }
        for (field, value) in [
            (
                "aggregation.gross_production_category",
                &agg.gross_production_category,
            ),
            ("aggregation.pv_category", &agg.pv_category),
            ("aggregation.pv_energy_type_pattern", &agg.pv_energy_type_pattern),
        ] {
            if value.trim().is_empty() {
                errors.push(ConfigError::new(field, "must not be empty"));
            }
        }

        if agg.breakdown.is_empty() {
            errors.push(ConfigError::new("aggregation.breakdown", "must list at least one category"));
        }
        let mut seen = HashSet::new();
        for entry in &agg.breakdown {
            if !seen.insert(entry.category.as_str()) {
                errors.push(ConfigError::new(
                    "aggregation.breakdown",
                    format!("category \"{}\" listed more than once", entry.category),
                ));
            }
        }

        errors
    }
}
