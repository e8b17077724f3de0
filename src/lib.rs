//! Renewable-energy production estimation and aggregation for Valais.
//!
//! Combines audited yearly production figures with a rooftop photovoltaic
//! estimate for the current year, and runs the intake workflow that
//! registers new installations.

pub mod aggregate;
pub mod config;
pub mod estimator;
pub mod io;
pub mod store;
pub mod workflow;

#[cfg(feature = "api")]
pub mod api;
