//! Bids and bid scoring
//!
//! A bid is one vehicle's offer to carry one request: the legs it would fly
//! or drive, the resulting eta and the resource totals over those legs.
//! Lower scores win. Late bids carry a fixed penalty that dominates every
//! realistic KPI value.

use crate::auction::planner::LegPlan;
use crate::costs::LegCost;
use crate::models::request::RequestId;
use crate::models::vehicle::VehicleId;
use crate::policy::{DecisionWeights, DeliveryMode, DeliveryPolicy};
use serde::{Deserialize, Serialize};

/// Added to the score of a bid whose eta misses the deadline
pub const LATE_PENALTY: f64 = 10_000_000.0;

/// Risk (expected injuries) is scaled up before weighting under `combi`
pub const RISK_SCALE: f64 = 1_000_000.0;

/// Score a candidate delivery
///
/// Pure: same inputs, same score.
///
/// # Example
/// ```
/// use fleet_dispatch_core_rs::auction::bid::{score, LATE_PENALTY};
/// use fleet_dispatch_core_rs::costs::LegCost;
/// use fleet_dispatch_core_rs::policy::{DecisionWeights, DeliveryPolicy};
///
/// let totals = LegCost { distance_km: 10.0, cost: 1.0, risk: 2e-6, emission_kg: 0.5 };
/// let weights = DecisionWeights::default();
///
/// assert_eq!(score(40, 60, &totals, 25, &weights, DeliveryPolicy::Fast), 25.0);
/// assert_eq!(score(61, 60, &totals, 46, &weights, DeliveryPolicy::Fast), LATE_PENALTY + 46.0);
/// ```
pub fn score(
    eta: usize,
    deadline: usize,
    totals: &LegCost,
    delivery_time: usize,
    weights: &DecisionWeights,
    policy: DeliveryPolicy,
) -> f64 {
    let mut score = 0.0;

    if eta > deadline {
        score += LATE_PENALTY;
    }

    match policy {
        DeliveryPolicy::Safe => score += totals.risk,
        DeliveryPolicy::Fast => score += delivery_time as f64,
        DeliveryPolicy::Combi => {
            score += totals.risk * RISK_SCALE * weights.risk;
            score += totals.emission_kg * weights.emission;
            score += delivery_time as f64 * weights.delivery_time;
            score += totals.cost * weights.cost;
        }
    }

    score
}

/// One vehicle's offer for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub vehicle: VehicleId,
    pub request: RequestId,
    pub mode: DeliveryMode,
    /// Arrival tick of the delivery leg
    pub eta: usize,
    /// `eta - now` at bidding time
    pub delivery_time: usize,
    /// Summed over every leg of the bid
    pub totals: LegCost,
    /// Positioning leg (if any) followed by the delivery leg
    pub legs: Vec<LegPlan>,
    pub score: f64,
}

impl Bid {
    pub fn is_on_time(&self, deadline: usize) -> bool {
        self.eta <= deadline
    }
}

/// Sort ascending by score, keeping production order among equal scores
pub fn rank_bids(bids: &mut [Bid]) {
    bids.sort_by(|a, b| a.score.total_cmp(&b.score));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(risk: f64, emission_kg: f64, cost: f64) -> LegCost {
        LegCost {
            distance_km: 0.0,
            cost,
            risk,
            emission_kg,
        }
    }

    fn bid(vehicle: usize, score: f64) -> Bid {
        Bid {
            vehicle: VehicleId(vehicle),
            request: RequestId(0),
            mode: DeliveryMode::Safe,
            eta: 0,
            delivery_time: 0,
            totals: LegCost::default(),
            legs: vec![],
            score,
        }
    }

    #[test]
    fn test_safe_policy_scores_risk_only() {
        let w = DecisionWeights::default();
        let s = score(10, 20, &totals(3e-6, 100.0, 50.0), 999, &w, DeliveryPolicy::Safe);
        assert_eq!(s, 3e-6);
    }

    #[test]
    fn test_combi_policy_weights_every_kpi() {
        let w = DecisionWeights {
            risk: 2.0,
            emission: 3.0,
            delivery_time: 0.5,
            cost: 4.0,
        };
        let s = score(10, 20, &totals(1e-6, 2.0, 1.5), 30, &w, DeliveryPolicy::Combi);
        // 1e-6 * 1e6 * 2 + 2 * 3 + 30 * 0.5 + 1.5 * 4
        assert!((s - 29.0).abs() < 1e-9);
    }

    #[test]
    fn test_late_penalty_applies_strictly_after_deadline() {
        let w = DecisionWeights::default();
        let on_time = score(20, 20, &totals(0.0, 0.0, 0.0), 5, &w, DeliveryPolicy::Fast);
        let late = score(21, 20, &totals(0.0, 0.0, 0.0), 5, &w, DeliveryPolicy::Fast);
        assert_eq!(late - on_time, LATE_PENALTY);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let mut bids = vec![bid(0, 5.0), bid(1, 2.0), bid(2, 5.0), bid(3, 2.0)];
        rank_bids(&mut bids);
        let order: Vec<usize> = bids.iter().map(|b| b.vehicle.0).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }
}
