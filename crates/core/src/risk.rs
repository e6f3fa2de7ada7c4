//! Sepsis risk scoring.
//!
//! The scorer is a pure additive heuristic over four vital signs. Every reading starts from a
//! baseline and each vital can add at most one tier of points:
//!
//! | vital | +10 when | +20 when |
//! |---|---|---|
//! | temperature (°C) | `> 38.0` | `> 38.5` |
//! | heart rate (bpm) | `> 90` | `> 100` |
//! | respiratory rate (/min) | `> 20` | `> 22` |
//! | oxygen saturation (%) | `< 95` | `< 92` |
//!
//! The total is capped at 100. Vitals that were not measured contribute nothing.
//!
//! Banding into a [`RiskLevel`] is defined once in [`RiskScore::level`] and used everywhere a
//! level is shown or stored.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Score assigned to a reading with every vital inside normal limits.
pub const BASELINE_SCORE: u8 = 30;

const MAJOR_POINTS: u8 = 20;
const MINOR_POINTS: u8 = 10;

/// Lowest score banded as [`RiskLevel::High`].
pub const HIGH_RISK_THRESHOLD: u8 = 75;

/// Lowest score banded as [`RiskLevel::Medium`].
pub const MEDIUM_RISK_THRESHOLD: u8 = 50;

/// Discrete risk band shown next to a score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, ToSchema,
)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bands in display order, most severe first.
    pub const ALL: [RiskLevel; 3] = [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An integer risk score in `0..=100`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct RiskScore(u8);

impl RiskScore {
    pub const MAX: u8 = 100;

    /// Validates a caller-supplied score.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] when `value` is above 100.
    pub fn new(value: u8) -> CoreResult<Self> {
        if value > Self::MAX {
            return Err(CoreError::InvalidInput(format!(
                "risk score must be between 0 and {}, got {}",
                Self::MAX,
                value
            )));
        }
        Ok(Self(value))
    }

    fn capped(total: u32) -> Self {
        Self(total.min(u32::from(Self::MAX)) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Bands the score: `>= 75` is High, `>= 50` is Medium, anything lower is Low.
    pub fn level(self) -> RiskLevel {
        if self.0 >= HIGH_RISK_THRESHOLD {
            RiskLevel::High
        } else if self.0 >= MEDIUM_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl TryFrom<u8> for RiskScore {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RiskScore> for u8 {
    fn from(score: RiskScore) -> Self {
        score.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The vital signs the scorer looks at.
///
/// Kept separate from the stored reading so the CLI can score ad-hoc values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoringInputs {
    pub temperature: f64,
    pub heart_rate: Option<u32>,
    pub respiratory_rate: Option<u32>,
    pub oxygen_saturation: f64,
}

fn tier_above<T: PartialOrd>(value: T, major: T, minor: T) -> u8 {
    if value > major {
        MAJOR_POINTS
    } else if value > minor {
        MINOR_POINTS
    } else {
        0
    }
}

fn tier_below(value: f64, major: f64, minor: f64) -> u8 {
    if value < major {
        MAJOR_POINTS
    } else if value < minor {
        MINOR_POINTS
    } else {
        0
    }
}

/// Computes the sepsis risk score for one set of vital signs.
pub fn calculate_risk_score(inputs: &ScoringInputs) -> RiskScore {
    let temperature = tier_above(inputs.temperature, 38.5, 38.0);
    let heart_rate = inputs
        .heart_rate
        .map_or(0, |hr| tier_above(hr, 100, 90));
    let respiratory_rate = inputs
        .respiratory_rate
        .map_or(0, |rr| tier_above(rr, 22, 20));
    let oxygen = tier_below(inputs.oxygen_saturation, 92.0, 95.0);

    let total = [BASELINE_SCORE, temperature, heart_rate, respiratory_rate, oxygen]
        .into_iter()
        .map(u32::from)
        .sum();

    RiskScore::capped(total)
}
