//! Annual yield estimation for private photovoltaic installations.
//!
//! Everything here is pure and deterministic. Out-of-domain inputs are
//! reported as [`EstimatorError`]; callers are expected to validate user
//! input before it reaches the estimator.

pub mod catalog;
pub mod compute;

pub use catalog::{Direction, PanelTechnology};
pub use compute::{
    Estimate, EstimateInput, RooftopEstimator, compute_surface, convert_watt_into_kilowatt,
    determine_direction, determine_orientation_factor, determine_specific_yield,
};

/// Input outside the domain of the yield model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimatorError {
    #[error("{name} must be non-negative, got {value}")]
    NegativeDimension { name: &'static str, value: f64 },
    #[error("azimuth {0}° is outside [-180°, 180°]")]
    AzimuthOutOfRange(f64),
    #[error("unknown orientation \"{0}\"")]
    UnknownOrientation(String),
    #[error("unknown panel technology \"{0}\"")]
    UnknownTechnology(String),
}
