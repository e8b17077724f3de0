//! Merges audited yearly production with the estimate for registered
//! photovoltaic installations.
//!
//! Historical values come from the [`ProductionStore`]; the current
//! reporting year is synthesized by summing [`Estimate::compute_kwh`] over
//! every photovoltaic installation and converting kWh to GWh.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::AggregationConfig;
use crate::estimator::{Estimate, EstimateInput, EstimatorError};
use crate::store::{Installation, ProductionStore, StoreError, YearValue};

/// kWh in one GWh.
pub const KWH_PER_GWH: f64 = 1_000_000.0;

/// Errors raised while building a chart or breakdown.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Estimate(#[from] EstimatorError),
    #[error("no yearly production has been recorded")]
    NoData,
}

/// A yearly time series. `years` and `values` are parallel and ascending by year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionChart {
    pub title: String,
    pub years: Vec<i32>,
    pub values: Vec<f64>,
}

/// Production per category for a single year, in allow-list order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionBreakdown {
    pub year: i32,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl fmt::Display for ProductionChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--- {} ---", self.title)?;
        for (year, value) in self.years.iter().zip(&self.values) {
            write!(f, "\n{year}:  {value:>12.3}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ProductionBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--- Production by category, {} [GWh] ---", self.year)?;
        for (label, value) in self.labels.iter().zip(&self.values) {
            write!(f, "\n{label:<16}{value:>12.3}")?;
        }
        Ok(())
    }
}

/// Builds the chart, PV series and breakdown views.
///
/// Borrowing the store and config keeps construction cheap enough to do
/// once per request.
#[derive(Debug)]
pub struct Aggregator<'a, S: ?Sized, E> {
    store: &'a S,
    estimator: E,
    config: &'a AggregationConfig,
}

impl<'a, S, E> Aggregator<'a, S, E>
where
    S: ProductionStore + ?Sized,
    E: Estimate,
{
    pub fn new(store: &'a S, estimator: E, config: &'a AggregationConfig) -> Self {
        Self {
            store,
            estimator,
            config,
        }
    }

    /// The most recent `chart_years` values of gross cantonal production,
    /// oldest first, followed by the estimate for the reporting year.
    ///
    /// # Errors
    ///
    /// Returns an `AggregateError` if the historical values cannot be read.
    /// A failing estimate does not fail the chart; see
    /// [`Aggregator::current_year_estimate_gwh`].
    pub fn build_production_chart(&self) -> Result<ProductionChart, AggregateError> {
        let year = self.config.reporting_year();
        let mut history = self.store.latest_values(
            &self.config.gross_production_category,
            year,
            self.config.chart_years,
        )?;
        history.reverse();
        Ok(self.with_current_year(&self.config.chart_title, history, year))
    }

    /// Photovoltaic production over the configured closed window, followed
    /// by the estimate for the reporting year.
    ///
    /// Window years at or after the reporting year are left out so the
    /// synthesized entry stays last.
    ///
    /// # Errors
    ///
    /// Returns an `AggregateError` if the historical values cannot be read.
    pub fn build_pv_series(&self) -> Result<ProductionChart, AggregateError> {
        let year = self.config.reporting_year();
        let start = self.config.pv_window_start;
        let end = self.config.pv_window_end.min(year - 1);
        let history = if start <= end {
            self.store
                .values_in_range(&self.config.pv_category, start, end)?
        } else {
            Vec::new()
        };
        Ok(self.with_current_year(&self.config.pv_title, history, year))
    }

    /// Values of the allow-listed categories for the latest recorded year.
    ///
    /// Labels follow the allow-list order. Categories without a record for
    /// that year are omitted rather than reported as zero.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::NoData`] when no year has been recorded at all.
    pub fn build_production_breakdown(&self) -> Result<ProductionBreakdown, AggregateError> {
        let year = self.store.max_year()?.ok_or(AggregateError::NoData)?;
        let categories: Vec<&str> = self
            .config
            .breakdown
            .iter()
            .map(|entry| entry.category.as_str())
            .collect();
        let rows = self.store.values_for_year(year, &categories)?;

        let mut breakdown = ProductionBreakdown {
            year,
            labels: Vec::with_capacity(rows.len()),
            values: Vec::with_capacity(rows.len()),
        };
        for entry in &self.config.breakdown {
            if let Some(row) = rows.iter().find(|r| r.category == entry.category) {
                breakdown.labels.push(entry.label.clone());
                breakdown.values.push(row.value_gwh);
            }
        }
        Ok(breakdown)
    }

    /// Estimated production of every photovoltaic installation (GWh).
    ///
    /// # Errors
    ///
    /// Fails if the installations cannot be read or if any single
    /// installation cannot be estimated.
    pub fn current_year_estimate_gwh(&self) -> Result<f64, AggregateError> {
        let installations = self
            .store
            .installations_by_energy_type(&self.config.pv_energy_type_pattern)?;
        let inputs: Vec<EstimateInput> = installations.iter().map(estimate_input).collect();
        let kwh = self.estimator.compute_total_kwh(&inputs)?;
        debug!(installations = inputs.len(), kwh, "estimated photovoltaic production");
        Ok(kwh / KWH_PER_GWH)
    }

    fn with_current_year(&self, title: &str, history: Vec<YearValue>, year: i32) -> ProductionChart {
        let estimate = self.current_year_estimate_gwh().unwrap_or_else(|err| {
            warn!(year, error = %err, "current-year estimate failed, reporting 0");
            0.0
        });

        let (mut years, mut values): (Vec<i32>, Vec<f64>) = history
            .into_iter()
            .map(|row| (row.year, row.value_gwh))
            .unzip();
        years.push(year);
        values.push(estimate);

        ProductionChart {
            title: title.to_string(),
            years,
            values,
        }
    }
}

/// Converts a stored installation into estimator input.
///
/// Absent numeric fields become 0 and an absent technology becomes an empty
/// token. Azimuths entered on the 0–360 scale are mapped onto (-180, 180].
pub fn estimate_input(installation: &Installation) -> EstimateInput {
    EstimateInput {
        panel_technology: installation.panel_technology.clone().unwrap_or_default(),
        length_m: installation.length_m.unwrap_or(0.0),
        width_m: installation.width_m.unwrap_or(0.0),
        azimuth_deg: signed_azimuth(installation.azimuth_deg.unwrap_or(0.0)),
    }
}

fn signed_azimuth(azimuth_deg: f64) -> f64 {
    if azimuth_deg > 180.0 && azimuth_deg <= 360.0 {
        azimuth_deg - 360.0
    } else {
        azimuth_deg
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::config::BreakdownEntry;
    use crate::estimator::RooftopEstimator;
    use crate::store::{CategoryValue, NewInstallation, YearlyRecord};

    /// Vector-backed store with deliberately unordered storage.
    #[derive(Default)]
    struct FakeStore {
        yearly: Vec<(i32, String, f64)>,
        installations: Vec<Installation>,
        fail_installations: bool,
    }

    impl ProductionStore for FakeStore {
        fn latest_values(
            &self,
            category: &str,
            before_year: i32,
            limit: usize,
        ) -> Result<Vec<YearValue>, StoreError> {
            let mut rows: Vec<YearValue> = self
                .yearly
                .iter()
                .filter(|(y, c, _)| c == category && *y < before_year)
                .map(|(y, _, v)| YearValue { year: *y, value_gwh: *v })
                .collect();
            rows.sort_by(|a, b| b.year.cmp(&a.year));
            rows.truncate(limit);
            Ok(rows)
        }

        fn values_in_range(
            &self,
            category: &str,
            start_year: i32,
            end_year: i32,
        ) -> Result<Vec<YearValue>, StoreError> {
            let mut rows: Vec<YearValue> = self
                .yearly
                .iter()
                .filter(|(y, c, _)| c == category && (start_year..=end_year).contains(y))
                .map(|(y, _, v)| YearValue { year: *y, value_gwh: *v })
                .collect();
            rows.sort_by_key(|r| r.year);
            Ok(rows)
        }

        fn max_year(&self) -> Result<Option<i32>, StoreError> {
            Ok(self.yearly.iter().map(|(y, _, _)| *y).max())
        }

        fn values_for_year(
            &self,
            year: i32,
            categories: &[&str],
        ) -> Result<Vec<CategoryValue>, StoreError> {
            Ok(self
                .yearly
                .iter()
                .filter(|(y, c, _)| *y == year && categories.contains(&c.as_str()))
                .map(|(_, c, v)| CategoryValue {
                    category: c.clone(),
                    value_gwh: *v,
                })
                .collect())
        }

        fn installations_by_energy_type(
            &self,
            pattern: &str,
        ) -> Result<Vec<Installation>, StoreError> {
            if self.fail_installations {
                return Err(StoreError::InvalidRecord("unreadable".into()));
            }
            let pattern = pattern.to_lowercase();
            Ok(self
                .installations
                .iter()
                .filter(|i| {
                    i.energy_type
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&pattern))
                })
                .cloned()
                .collect())
        }

        fn max_registration_number(&self) -> Result<Option<i64>, StoreError> {
            Ok(self.installations.iter().map(|i| i.registration_number).max())
        }

        fn insert_installation(&self, _installation: &NewInstallation) -> Result<i64, StoreError> {
            Err(StoreError::InvalidRecord("read-only".into()))
        }

        fn upsert_yearly_value(&self, _: i32, _: &str, _: f64) -> Result<(), StoreError> {
            Err(StoreError::InvalidRecord("read-only".into()))
        }

        fn upsert_yearly_values(&self, _: &[YearlyRecord]) -> Result<(), StoreError> {
            Err(StoreError::InvalidRecord("read-only".into()))
        }
    }

    fn installation(energy: &str, tech: &str, length: f64, width: f64, azimuth: f64) -> Installation {
        Installation {
            registration_number: 1,
            street: "Rue".into(),
            street_number: 1,
            postal_code: 1950,
            locality: "Sion".into(),
            energy_type: Some(energy.into()),
            panel_technology: Some(tech.into()),
            integration_type: None,
            azimuth_deg: Some(azimuth),
            inclination_deg: Some(30.0),
            length_m: Some(length),
            width_m: Some(width),
            surface_m2: Some(length * width),
            created_at: Utc::now(),
        }
    }

    fn config() -> AggregationConfig {
        AggregationConfig {
            reporting_year: Some(2025),
            chart_years: 3,
            gross_production_category: "gross".into(),
            pv_category: "pv".into(),
            pv_window_start: 2020,
            pv_window_end: 2030,
            breakdown: vec![
                BreakdownEntry {
                    category: "hydro".into(),
                    label: "Hydraulique".into(),
                },
                BreakdownEntry {
                    category: "wind".into(),
                    label: "Éolien".into(),
                },
                BreakdownEntry {
                    category: "pv".into(),
                    label: "Photovoltaïque".into(),
                },
            ],
            ..AggregationConfig::default()
        }
    }

    #[test]
    fn chart_takes_latest_years_ascending_then_estimate() {
        let store = FakeStore {
            yearly: [2019, 2024, 2021, 2020, 2023, 2022, 2025]
                .into_iter()
                .map(|y| (y, "gross".to_string(), f64::from(y - 2000)))
                .collect(),
            installations: vec![installation("Photovoltaïque", "monocrystalline", 10.0, 5.0, 0.0)],
            ..FakeStore::default()
        };
        let cfg = config();
        let chart = Aggregator::new(&store, RooftopEstimator, &cfg)
            .build_production_chart()
            .unwrap();

        assert_eq!(chart.years, vec![2022, 2023, 2024, 2025]);
        assert_eq!(chart.values[..3], [22.0, 23.0, 24.0]);
        assert!((chart.values[3] - 0.0125).abs() < 1e-12);
        assert_eq!(chart.title, cfg.chart_title);
    }

    #[test]
    fn failing_estimate_reports_zero_for_current_year() {
        let store = FakeStore {
            yearly: vec![(2024, "gross".into(), 10.0)],
            installations: vec![
                installation("photovoltaic", "monocrystalline", 10.0, 5.0, 0.0),
                installation("photovoltaic", "amorphous", 10.0, 5.0, 0.0),
            ],
            ..FakeStore::default()
        };
        let cfg = config();
        let chart = Aggregator::new(&store, RooftopEstimator, &cfg)
            .build_production_chart()
            .unwrap();
        assert_eq!(chart.years, vec![2024, 2025]);
        assert_eq!(chart.values, vec![10.0, 0.0]);
    }

    #[test]
    fn unreadable_installations_report_zero() {
        let store = FakeStore {
            fail_installations: true,
            ..FakeStore::default()
        };
        let cfg = config();
        let chart = Aggregator::new(&store, RooftopEstimator, &cfg)
            .build_pv_series()
            .unwrap();
        assert_eq!(chart.years, vec![2025]);
        assert_eq!(chart.values, vec![0.0]);
    }

    #[test]
    fn non_photovoltaic_installations_are_ignored() {
        let store = FakeStore {
            installations: vec![
                installation("Hydraulique", "amorphous", 10.0, 5.0, 0.0),
                installation("PHOTOVOLTAIC", "polycrystalline", 4.0, 2.0, 90.0),
            ],
            ..FakeStore::default()
        };
        let cfg = config();
        let gwh = Aggregator::new(&store, RooftopEstimator, &cfg)
            .current_year_estimate_gwh()
            .unwrap();
        assert!((gwh - 175.0 * 8.0 * 0.8 / KWH_PER_GWH).abs() < 1e-12);
    }

    #[test]
    fn pv_series_is_clipped_to_window_and_reporting_year() {
        let store = FakeStore {
            yearly: (2015..=2026)
                .map(|y| (y, "pv".to_string(), 1.0))
                .chain([(2022, "gross".to_string(), 99.0)])
                .collect(),
            ..FakeStore::default()
        };
        let cfg = config();
        let chart = Aggregator::new(&store, RooftopEstimator, &cfg)
            .build_pv_series()
            .unwrap();
        assert_eq!(chart.years, vec![2020, 2021, 2022, 2023, 2024, 2025]);
        assert_eq!(chart.values.len(), chart.years.len());
        assert_eq!(chart.title, cfg.pv_title);
    }

    #[test]
    fn breakdown_follows_allow_list_and_omits_missing() {
        let store = FakeStore {
            yearly: vec![
                (2023, "pv".into(), 3.0),
                (2023, "thermal".into(), 7.0),
                (2023, "hydro".into(), 1.0),
                (2022, "wind".into(), 5.0),
            ],
            ..FakeStore::default()
        };
        let cfg = config();
        let breakdown = Aggregator::new(&store, RooftopEstimator, &cfg)
            .build_production_breakdown()
            .unwrap();
        assert_eq!(breakdown.year, 2023);
        assert_eq!(breakdown.labels, vec!["Hydraulique", "Photovoltaïque"]);
        assert_eq!(breakdown.values, vec![1.0, 3.0]);
    }

    #[test]
    fn breakdown_without_any_year_is_no_data() {
        let store = FakeStore::default();
        let cfg = config();
        let result = Aggregator::new(&store, RooftopEstimator, &cfg).build_production_breakdown();
        assert!(matches!(result, Err(AggregateError::NoData)));
    }

    #[test]
    fn estimate_input_fills_absent_fields_and_signs_azimuth() {
        let mut inst = installation("pv", "monocrystalline", 3.0, 2.0, 270.0);
        assert_eq!(estimate_input(&inst).azimuth_deg, -90.0);
        inst.azimuth_deg = Some(180.0);
        assert_eq!(estimate_input(&inst).azimuth_deg, 180.0);
        inst.azimuth_deg = None;
        inst.length_m = None;
        inst.panel_technology = None;
        let input = estimate_input(&inst);
        assert_eq!(input.azimuth_deg, 0.0);
        assert_eq!(input.length_m, 0.0);
        assert_eq!(input.panel_technology, "");
    }
}
