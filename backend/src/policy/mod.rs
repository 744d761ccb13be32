//! Delivery Policy Module
//!
//! The delivery policy is the simulation-wide rule that decides which KPI
//! dominates bid scoring, and therefore which routing modes vehicles even
//! consider when they bid:
//!
//! | Policy  | Modes considered | Score                                   |
//! |---------|------------------|-----------------------------------------|
//! | `safe`  | safe             | accumulated risk                        |
//! | `fast`  | fast             | delivery time                           |
//! | `combi` | fast, safe       | weighted risk, emission, time and cost  |
//!
//! Scoring itself lives in [`crate::auction::bid`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Routing variant of a single leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Risk-minimised route
    Safe,
    /// Time-minimised route
    Fast,
}

impl DeliveryMode {
    pub const ALL: [DeliveryMode; 2] = [DeliveryMode::Safe, DeliveryMode::Fast];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Safe => "safe",
            DeliveryMode::Fast => "fast",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simulation-wide delivery policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPolicy {
    #[default]
    Safe,
    Fast,
    Combi,
}

impl DeliveryPolicy {
    /// Modes a vehicle plans for under this policy, in bidding order
    ///
    /// # Example
    /// ```
    /// use fleet_dispatch_core_rs::policy::{DeliveryMode, DeliveryPolicy};
    ///
    /// assert_eq!(DeliveryPolicy::Safe.considered_modes(), &[DeliveryMode::Safe]);
    /// assert_eq!(
    ///     DeliveryPolicy::Combi.considered_modes(),
    ///     &[DeliveryMode::Fast, DeliveryMode::Safe]
    /// );
    /// ```
    pub fn considered_modes(&self) -> &'static [DeliveryMode] {
        match self {
            DeliveryPolicy::Safe => &[DeliveryMode::Safe],
            DeliveryPolicy::Fast => &[DeliveryMode::Fast],
            DeliveryPolicy::Combi => &[DeliveryMode::Fast, DeliveryMode::Safe],
        }
    }
}

/// Weights applied to each KPI under the `combi` policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionWeights {
    /// Weight per injury (risk is scaled by 10^6 before weighting)
    pub risk: f64,
    /// Weight per kg CO2
    pub emission: f64,
    /// Weight per minute of delivery time
    pub delivery_time: f64,
    /// Weight per unit of variable cost
    pub cost: f64,
}

impl Default for DecisionWeights {
    fn default() -> Self {
        Self {
            risk: 1.0,
            emission: 1.0,
            delivery_time: 1.0,
            cost: 0.0,
        }
    }
}
