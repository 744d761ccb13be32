//! En-route Delay Model
//!
//! When enabled, every leg reaching its scheduled eta samples an actual
//! travel time uniformly within `±fraction` of its planned duration. The
//! fraction depends on whether the tick falls inside a rush-hour window.
//!
//! A strictly positive delay pushes the in-progress leg's arrival back and is
//! then cascaded through the rest of the itinerary:
//!
//! ```text
//! outstanding = previous.arrival + turnaround - next.departure
//! ```
//!
//! A leg with `outstanding > 0` shifts by that amount (departure and
//! arrival). The first boundary whose slack swallows the incoming delay
//! stops the cascade.
//!
//! # Conservation
//!
//! [`DelayPropagation`] records the slack absorbed at each boundary and the
//! delay still carried by the last shifted leg, so that
//! `sampled == absorbed.sum() + residual` always holds.

use crate::core::time::{in_rush_hour, TickWindow};
use crate::models::schedule::{LegId, ScheduleItem};
use crate::models::vehicle::DelayFractions;
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Delay model configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Minute-of-day windows using the rush-hour fraction
    #[serde(default)]
    pub rush_hours: Vec<TickWindow>,
}

impl DelayConfig {
    /// Delay fraction in effect at `tick`
    pub fn fraction(&self, fractions: &DelayFractions, tick: usize) -> f64 {
        if in_rush_hour(tick, &self.rush_hours) {
            fractions.rush_hour
        } else {
            fractions.normal
        }
    }
}

/// Cascade failures; both indicate a corrupted itinerary
#[derive(Debug, Error, PartialEq)]
pub enum CascadeError {
    #[error("delay cascade ran {iterations} iterations over {legs} legs")]
    Overrun { iterations: usize, legs: usize },

    #[error("{leg} departs before its predecessor's turnaround completes")]
    NegativeSlack { leg: LegId },

    #[error("cannot propagate delay over an empty itinerary")]
    EmptyItinerary,
}

/// Record of one cascaded propagation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayPropagation {
    /// Delay sampled on the in-progress leg
    pub sampled: usize,
    /// `(leg, ticks)` for every leg moved, in itinerary order
    pub shifts: Vec<(LegId, usize)>,
    /// Slack consumed at each leg boundary the delay crossed
    pub absorbed: Vec<usize>,
    /// Delay carried by the last leg of the itinerary
    pub residual: usize,
}

impl DelayPropagation {
    pub fn total_absorbed(&self) -> usize {
        self.absorbed.iter().sum()
    }

    /// `sampled == absorbed + residual`
    pub fn is_conserved(&self) -> bool {
        self.sampled == self.total_absorbed() + self.residual
    }
}

/// Sample the delay of a leg with planned `duration`
///
/// Returns `round(uniform(d - f·d, d + f·d)) - d`, which may be zero or
/// negative. Always consumes exactly one draw.
///
/// # Example
/// ```
/// use fleet_dispatch_core_rs::delay::sample_delay;
/// use fleet_dispatch_core_rs::RngManager;
///
/// let mut rng = RngManager::new(11);
/// for _ in 0..100 {
///     let delay = sample_delay(&mut rng, 40, 0.05);
///     assert!((-2..=2).contains(&delay));
/// }
/// ```
pub fn sample_delay(rng: &mut RngManager, duration: usize, fraction: f64) -> i64 {
    let planned = duration as f64;
    let spread = fraction * planned;
    let actual = rng.uniform(planned - spread, planned + spread).round() as i64;
    actual - duration as i64
}

/// Apply `delay` to the front leg of `itinerary` and cascade it
///
/// The front leg is the one in progress: only its arrival moves. Later legs
/// move as a whole.
pub fn propagate_delay(
    itinerary: &mut VecDeque<ScheduleItem>,
    delay: usize,
    turnaround: usize,
) -> Result<DelayPropagation, CascadeError> {
    let legs = itinerary.len();
    let first = itinerary.front_mut().ok_or(CascadeError::EmptyItinerary)?;
    first.push_arrival(delay);

    let mut propagation = DelayPropagation {
        sampled: delay,
        shifts: vec![(first.id(), delay)],
        absorbed: Vec::new(),
        residual: 0,
    };

    let mut carried = delay;
    let mut index = 1;
    let mut iterations = 0;

    while carried > 0 {
        iterations += 1;
        if iterations > legs {
            return Err(CascadeError::Overrun { iterations, legs });
        }

        if index == legs {
            propagation.residual = carried;
            break;
        }

        let ready = itinerary[index - 1].arrival() + turnaround;
        let next = &mut itinerary[index];
        let outstanding = ready as i64 - next.departure() as i64;

        if outstanding > carried as i64 {
            return Err(CascadeError::NegativeSlack { leg: next.id() });
        }

        let moved = outstanding.max(0) as usize;
        propagation.absorbed.push(carried - moved);
        if moved > 0 {
            next.shift(moved);
            propagation.shifts.push((next.id(), moved));
        }

        carried = moved;
        index += 1;
    }

    debug_assert!(propagation.is_conserved());
    Ok(propagation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costs::LegCost;
    use crate::models::vehicle::VehicleId;
    use crate::policy::DeliveryMode;

    fn itinerary(spans: &[(usize, usize)]) -> VecDeque<ScheduleItem> {
        spans
            .iter()
            .enumerate()
            .map(|(i, &(dep, arr))| {
                ScheduleItem::new(
                    LegId(i as u64),
                    VehicleId(0),
                    0,
                    1,
                    dep,
                    arr,
                    DeliveryMode::Fast,
                    LegCost::default(),
                    vec![],
                )
            })
            .collect()
    }

    #[test]
    fn test_single_leg_keeps_whole_delay_as_residual() {
        let mut legs = itinerary(&[(0, 10)]);
        let prop = propagate_delay(&mut legs, 4, 5).unwrap();

        assert_eq!(legs[0].arrival(), 14);
        assert_eq!(prop.residual, 4);
        assert!(prop.absorbed.is_empty());
        assert!(prop.is_conserved());
    }

    #[test]
    fn test_tight_schedule_cascades_to_the_end() {
        // turnaround 5, no slack anywhere
        let mut legs = itinerary(&[(0, 10), (15, 25), (30, 40)]);
        let prop = propagate_delay(&mut legs, 3, 5).unwrap();

        assert_eq!((legs[1].departure(), legs[1].arrival()), (18, 28));
        assert_eq!((legs[2].departure(), legs[2].arrival()), (33, 43));
        assert_eq!(prop.absorbed, vec![0, 0]);
        assert_eq!(prop.residual, 3);
        assert_eq!(prop.shifts.len(), 3);
    }

    #[test]
    fn test_slack_absorbs_part_of_the_delay() {
        // two ticks of slack before the second leg
        let mut legs = itinerary(&[(0, 10), (17, 27), (32, 40)]);
        let prop = propagate_delay(&mut legs, 5, 5).unwrap();

        assert_eq!(legs[1].departure(), 20);
        assert_eq!(legs[2].departure(), 35);
        assert_eq!(prop.absorbed, vec![2, 0]);
        assert_eq!(prop.residual, 3);
        assert!(prop.is_conserved());
    }

    #[test]
    fn test_cascade_stops_when_schedule_resettles() {
        let mut legs = itinerary(&[(0, 10), (30, 40), (45, 50)]);
        let prop = propagate_delay(&mut legs, 6, 5).unwrap();

        assert_eq!(legs[1].departure(), 30);
        assert_eq!(legs[2].departure(), 45);
        assert_eq!(prop.absorbed, vec![6]);
        assert_eq!(prop.residual, 0);
        assert_eq!(prop.shifts, vec![(LegId(0), 6)]);
    }

    #[test]
    fn test_overlapping_legs_are_rejected() {
        let mut legs = itinerary(&[(0, 10), (11, 20)]);
        assert_eq!(
            propagate_delay(&mut legs, 1, 5),
            Err(CascadeError::NegativeSlack { leg: LegId(1) })
        );
    }

    #[test]
    fn test_rush_hour_fraction_selected_by_window() {
        let config = DelayConfig {
            enabled: true,
            rush_hours: vec![TickWindow::new(420, 540)],
        };
        let fractions = DelayFractions {
            normal: 0.05,
            rush_hour: 0.15,
        };
        assert_eq!(config.fraction(&fractions, 419), 0.05);
        assert_eq!(config.fraction(&fractions, 420), 0.15);
        assert_eq!(config.fraction(&fractions, 1440 + 500), 0.15);
    }

    #[test]
    fn test_zero_fraction_never_delays() {
        let mut rng = RngManager::new(3);
        for _ in 0..50 {
            assert_eq!(sample_delay(&mut rng, 25, 0.0), 0);
        }
    }
}
