//! Travel modes and their per-mode constant tables.
//!
//! The source data tags edges with free-form mode names ("car,bike"), and
//! several speed/emission/health constants differ per mode. Everything
//! mode-dependent lives in one [`ModeProfile`] table so the fallback order
//! of speed resolution is a named policy rather than scattered defaults.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Hard floor on any resolved speed, km/h. Prevents travel-time blow-up on
/// edges with degenerate speed data.
pub const SPEED_FLOOR_KMH: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Walking,
    Cycling,
    Motorcycle,
    Driving,
}

/// Per-mode constants: default speed, emission factor and the health-score
/// parameters of the segment mode assigner.
#[derive(Debug, Clone, Copy)]
pub struct ModeProfile {
    /// Free-flow speed used when the edge carries no speed data, km/h.
    pub default_speed_kmh: f64,
    /// Relative emission per kilometer traveled (0 for active modes).
    pub emission_per_km: f64,
    /// Base health score granted per segment before penalties.
    pub health_base: f64,
    /// Distance up to which the mode stays comfortable, km.
    pub comfort_km: f64,
    /// Health penalty per kilometer past the comfort distance.
    pub overage_penalty_per_km: f64,
    /// Health penalty per unit of AQI exposure.
    pub pollution_sensitivity: f64,
}

const WALKING: ModeProfile = ModeProfile {
    default_speed_kmh: 5.0,
    emission_per_km: 0.0,
    health_base: 10.0,
    comfort_km: 2.0,
    overage_penalty_per_km: 2.0,
    pollution_sensitivity: 0.03,
};

const CYCLING: ModeProfile = ModeProfile {
    default_speed_kmh: 15.0,
    emission_per_km: 0.0,
    health_base: 8.0,
    comfort_km: 8.0,
    overage_penalty_per_km: 0.5,
    pollution_sensitivity: 0.025,
};

const MOTORCYCLE: ModeProfile = ModeProfile {
    default_speed_kmh: 45.0,
    emission_per_km: 0.6,
    health_base: 0.0,
    comfort_km: f64::INFINITY,
    overage_penalty_per_km: 0.0,
    pollution_sensitivity: 0.01,
};

const DRIVING: ModeProfile = ModeProfile {
    default_speed_kmh: 40.0,
    emission_per_km: 1.0,
    health_base: 0.0,
    comfort_km: f64::INFINITY,
    overage_penalty_per_km: 0.0,
    pollution_sensitivity: 0.005,
};

impl TravelMode {
    pub const ALL: [TravelMode; 4] = [
        TravelMode::Walking,
        TravelMode::Cycling,
        TravelMode::Motorcycle,
        TravelMode::Driving,
    ];

    pub fn profile(self) -> &'static ModeProfile {
        match self {
            TravelMode::Walking => &WALKING,
            TravelMode::Cycling => &CYCLING,
            TravelMode::Motorcycle => &MOTORCYCLE,
            TravelMode::Driving => &DRIVING,
        }
    }

    pub fn is_motorized(self) -> bool {
        matches!(self, TravelMode::Motorcycle | TravelMode::Driving)
    }

    pub fn key(self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Cycling => "cycling",
            TravelMode::Motorcycle => "motorcycle",
            TravelMode::Driving => "driving",
        }
    }

    /// Whether a single mode-tag token (one comma-separated entry of an
    /// edge's mode tag) admits this mode.
    pub fn matches_tag(self, token: &str) -> bool {
        let token = token.trim().to_ascii_lowercase();
        match self {
            TravelMode::Walking => {
                matches!(token.as_str(), "walk" | "walking" | "foot" | "pedestrian")
            }
            TravelMode::Cycling => {
                matches!(token.as_str(), "bike" | "bicycle" | "cycle" | "cycling")
            }
            TravelMode::Motorcycle => {
                matches!(token.as_str(), "motorcycle" | "motorbike" | "moto")
            }
            TravelMode::Driving => {
                matches!(token.as_str(), "car" | "drive" | "driving" | "auto" | "motor_vehicle")
            }
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TravelMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        TravelMode::ALL
            .into_iter()
            .find(|mode| mode.matches_tag(s) || mode.key() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| Error::UnknownMode(s.to_string()))
    }
}
