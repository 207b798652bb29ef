//! Cost criteria and their weight profiles.
//!
//! A profile is a static weight vector over the six cost terms. The health
//! weight is the only *negative* contribution: a higher health score lowers
//! the edge cost (the floor in the cost model keeps every cost positive).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criteria {
    Optimal,
    Fastest,
    Shortest,
    LeastPollution,
    LeastEmission,
    Healthiest,
}

/// Weight vector over the cost terms. All weights are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostWeights {
    pub time: f64,
    pub distance: f64,
    pub traffic: f64,
    pub pollution: f64,
    pub emission: f64,
    pub health: f64,
    /// Divide the pollution term by the AQI ceiling before weighting.
    /// Blended profiles use this so exposure stays commensurate with the
    /// other terms; the dedicated pollution profile works on raw values.
    pub normalize_pollution: bool,
}

impl CostWeights {
    const ZERO: CostWeights = CostWeights {
        time: 0.0,
        distance: 0.0,
        traffic: 0.0,
        pollution: 0.0,
        emission: 0.0,
        health: 0.0,
        normalize_pollution: false,
    };

    pub fn is_health_aware(&self) -> bool {
        self.health > 0.0
    }
}

impl Criteria {
    pub const ALL: [Criteria; 6] = [
        Criteria::Optimal,
        Criteria::Fastest,
        Criteria::Shortest,
        Criteria::LeastPollution,
        Criteria::LeastEmission,
        Criteria::Healthiest,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Criteria::Optimal => "optimal",
            Criteria::Fastest => "fastest",
            Criteria::Shortest => "shortest",
            Criteria::LeastPollution => "least_pollution",
            Criteria::LeastEmission => "least_emission",
            Criteria::Healthiest => "healthiest",
        }
    }

    pub fn weights(self) -> CostWeights {
        match self {
            Criteria::Optimal => CostWeights {
                time: 0.35,
                distance: 0.15,
                traffic: 0.20,
                pollution: 0.15,
                emission: 0.15,
                normalize_pollution: true,
                ..CostWeights::ZERO
            },
            Criteria::Fastest => CostWeights {
                time: 1.0,
                ..CostWeights::ZERO
            },
            Criteria::Shortest => CostWeights {
                distance: 1.0,
                ..CostWeights::ZERO
            },
            Criteria::LeastPollution => CostWeights {
                pollution: 1.0,
                time: 0.1,
                ..CostWeights::ZERO
            },
            Criteria::LeastEmission => CostWeights {
                emission: 1.0,
                time: 0.1,
                ..CostWeights::ZERO
            },
            Criteria::Healthiest => CostWeights {
                health: 1.0,
                time: 0.2,
                pollution: 0.3,
                normalize_pollution: true,
                ..CostWeights::ZERO
            },
        }
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Criteria {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optimal" | "balanced" => Ok(Criteria::Optimal),
            "fastest" => Ok(Criteria::Fastest),
            "shortest" => Ok(Criteria::Shortest),
            "least_pollution" | "least_polluted" => Ok(Criteria::LeastPollution),
            "least_emission" | "emission" => Ok(Criteria::LeastEmission),
            "healthiest" => Ok(Criteria::Healthiest),
            _ => Err(Error::UnknownCriteria(s.to_string())),
        }
    }
}
