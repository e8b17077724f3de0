//! Closed catalogs for roof orientation and panel technology.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::EstimatorError;

/// Surface of the reference installation the specific yields are derived from (m²).
pub const REFERENCE_SURFACE_M2: f64 = 40.0;

/// Annual production of the monocrystalline reference installation (kWh).
const MONO_REFERENCE_KWH: f64 = 10_000.0;

/// Annual production of the polycrystalline reference installation (kWh).
const POLY_REFERENCE_KWH: f64 = 7_000.0;

/// Compass direction a roof surface faces, relative to due south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    South,
    West,
    East,
    North,
}

impl Direction {
    /// Yield multiplier for this direction.
    ///
    /// South-facing roofs produce the full reference yield, east and west
    /// lose a fifth, north-facing roofs keep 60%.
    pub fn orientation_factor(self) -> f64 {
        match self {
            Self::South => 1.0,
            Self::East | Self::West => 0.8,
            Self::North => 0.6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::South => "south",
            Self::West => "west",
            Self::East => "east",
            Self::North => "north",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = EstimatorError;

    /// Parses a direction token, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError::UnknownOrientation`] for anything other
    /// than `south`, `west`, `east` or `north`. There is no fallback factor.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "south" => Ok(Self::South),
            "west" => Ok(Self::West),
            "east" => Ok(Self::East),
            "north" => Ok(Self::North),
            _ => Err(EstimatorError::UnknownOrientation(s.to_string())),
        }
    }
}

/// Photovoltaic cell technology with a known specific yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelTechnology {
    Monocrystalline,
    Polycrystalline,
}

impl PanelTechnology {
    /// Every recognized technology.
    pub const ALL: [Self; 2] = [Self::Monocrystalline, Self::Polycrystalline];

    /// Expected annual production per square meter (kWh/m²).
    ///
    /// Derived from the annual output of a [`REFERENCE_SURFACE_M2`] reference
    /// installation of each technology.
    pub fn specific_yield_kwh_per_m2(self) -> f64 {
        let reference_kwh = match self {
            Self::Monocrystalline => MONO_REFERENCE_KWH,
            Self::Polycrystalline => POLY_REFERENCE_KWH,
        };
        reference_kwh / REFERENCE_SURFACE_M2
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monocrystalline => "monocrystalline",
            Self::Polycrystalline => "polycrystalline",
        }
    }
}

impl fmt::Display for PanelTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PanelTechnology {
    type Err = EstimatorError;

    /// Exact-match lookup; the catalog is not extensible through free text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tech| tech.as_str() == s)
            .ok_or_else(|| EstimatorError::UnknownTechnology(s.to_string()))
    }
}
