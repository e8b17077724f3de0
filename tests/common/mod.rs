//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use valais_energy::config::AggregationConfig;
use valais_energy::estimator::PanelTechnology;
use valais_energy::store::{NewInstallation, ProductionStore, SqliteStore};

/// Year the synthesized estimate is reported under in every fixture.
pub const REPORTING_YEAR: i32 = 2025;

pub const GROSS: &str = "Production cantonale brute";
pub const PV: &str = "Installations photovoltaïques";
pub const HYDRO: &str = "Centrales hydrauliques - Total";
pub const BIOGAS: &str = "Installations biogaz";
pub const WIND: &str = "Installations éoliennes";

/// Aggregation defaults pinned to [`REPORTING_YEAR`].
pub fn aggregation_config() -> AggregationConfig {
    AggregationConfig {
        reporting_year: Some(REPORTING_YEAR),
        ..AggregationConfig::default()
    }
}

/// In-memory store with gross production for 2010–2024, photovoltaic
/// production for 2012–2024 and a partial breakdown for 2024.
pub fn seeded_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().expect("in-memory store");
    for year in 2010..=2024 {
        let offset = f64::from(year - 2010);
        store
            .upsert_yearly_value(year, GROSS, 10_000.0 + 100.0 * offset)
            .expect("seed gross");
    }
    for year in 2012..=2024 {
        let offset = f64::from(year - 2012);
        store
            .upsert_yearly_value(year, PV, 50.0 + 25.0 * offset)
            .expect("seed pv");
    }
    for (category, value) in [(HYDRO, 9_800.0), (BIOGAS, 14.5), (WIND, 2.25)] {
        store
            .upsert_yearly_value(2024, category, value)
            .expect("seed breakdown");
    }
    store
}

/// A photovoltaic installation in Sion with the given panel parameters.
pub fn pv_installation(
    technology: PanelTechnology,
    length_m: f64,
    width_m: f64,
    azimuth_deg: f64,
) -> NewInstallation {
    NewInstallation {
        street: "Rue Exemple".to_string(),
        street_number: 10,
        postal_code: 1950,
        locality: "Sion".to_string(),
        energy_type: Some("Photovoltaïque".to_string()),
        panel_technology: Some(technology),
        integration_type: Some("integrated".to_string()),
        azimuth_deg,
        inclination_deg: 30.0,
        length_m,
        width_m,
    }
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
