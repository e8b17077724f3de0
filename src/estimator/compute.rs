//! Annual yield computation for rooftop photovoltaic installations.

use super::EstimatorError;
use super::catalog::{Direction, PanelTechnology};

/// The inputs the yield model needs from an installation.
///
/// Callers decide how absent fields are filled in before building this;
/// the estimator itself never substitutes defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateInput {
    /// Panel technology token, matched exactly against the catalog.
    pub panel_technology: String,
    /// Roof length (m).
    pub length_m: f64,
    /// Roof width (m).
    pub width_m: f64,
    /// Azimuth in degrees, 0 = due south, within [-180, 180].
    pub azimuth_deg: f64,
}

/// Computes the panel surface from its length and width.
///
/// # Errors
///
/// Returns [`EstimatorError::NegativeDimension`] if either side is negative
/// (or not a number).
pub fn compute_surface(length_m: f64, width_m: f64) -> Result<f64, EstimatorError> {
    for (name, value) in [("length", length_m), ("width", width_m)] {
        if !(value >= 0.0) {
            return Err(EstimatorError::NegativeDimension { name, value });
        }
    }
    Ok(length_m * width_m)
}

/// Maps an azimuth onto a compass direction using half-open windows.
///
/// | window          | direction |
/// |-----------------|-----------|
/// | (-45, 45]       | south     |
/// | (45, 135]       | west      |
/// | (-135, -45]     | east      |
/// | everything else | north     |
///
/// # Errors
///
/// Returns [`EstimatorError::AzimuthOutOfRange`] outside [-180, 180].
pub fn determine_direction(azimuth_deg: f64) -> Result<Direction, EstimatorError> {
    if !(-180.0..=180.0).contains(&azimuth_deg) {
        return Err(EstimatorError::AzimuthOutOfRange(azimuth_deg));
    }

    let direction = if azimuth_deg > -45.0 && azimuth_deg <= 45.0 {
        Direction::South
    } else if azimuth_deg > 45.0 && azimuth_deg <= 135.0 {
        Direction::West
    } else if azimuth_deg > -135.0 && azimuth_deg <= -45.0 {
        Direction::East
    } else {
        Direction::North
    };
    Ok(direction)
}

/// Looks up the orientation factor for a textual direction.
///
/// # Errors
///
/// Returns [`EstimatorError::UnknownOrientation`] for unrecognized tokens.
pub fn determine_orientation_factor(direction: &str) -> Result<f64, EstimatorError> {
    Ok(direction.parse::<Direction>()?.orientation_factor())
}

/// Looks up the specific yield (kWh/m²) for a panel technology token.
///
/// # Errors
///
/// Returns [`EstimatorError::UnknownTechnology`] for unrecognized or empty tokens.
pub fn determine_specific_yield(panel_technology: &str) -> Result<f64, EstimatorError> {
    Ok(panel_technology
        .parse::<PanelTechnology>()?
        .specific_yield_kwh_per_m2())
}

pub fn convert_watt_into_kilowatt(watt: f64) -> f64 {
    watt / 1000.0
}

/// A yield model that turns installations into annual kWh estimates.
pub trait Estimate {
    /// Estimated annual production of one installation (kWh).
    fn compute_kwh(&self, input: &EstimateInput) -> Result<f64, EstimatorError>;

    /// Sum of [`Estimate::compute_kwh`] over `inputs`; 0 when empty.
    ///
    /// The first failing installation aborts the whole total.
    fn compute_total_kwh(&self, inputs: &[EstimateInput]) -> Result<f64, EstimatorError> {
        inputs
            .iter()
            .try_fold(0.0, |total, input| Ok(total + self.compute_kwh(input)?))
    }
}

/// Reference-yield model: `specific_yield × surface × orientation_factor`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RooftopEstimator;

impl Estimate for RooftopEstimator {
    fn compute_kwh(&self, input: &EstimateInput) -> Result<f64, EstimatorError> {
        let specific_yield = determine_specific_yield(&input.panel_technology)?;
        let surface = compute_surface(input.length_m, input.width_m)?;
        let direction = determine_direction(input.azimuth_deg)?;
        let factor = determine_orientation_factor(direction.as_str())?;
        Ok(specific_yield * surface * factor)
    }
}
