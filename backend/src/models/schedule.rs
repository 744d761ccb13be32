//! Schedule legs
//!
//! A leg is one hop of a vehicle itinerary: a positioning move without
//! cargo, or a delivery carrying one or more consolidated requests. Legs are
//! owned by the vehicle whose itinerary holds them; the command center only
//! keeps `(vehicle, leg)` references.
//!
//! # Critical Invariants
//!
//! 1. `duration = arrival - departure` at creation and `duration >= 1`
//! 2. Shifts only ever move a leg later; `total_delay` never decreases
//! 3. `requests.len()` never exceeds the owning vehicle's capacity

use crate::costs::LegCost;
use crate::models::request::RequestId;
use crate::models::vehicle::VehicleId;
use crate::policy::DeliveryMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Leg identifier, allocated sequentially by the command center
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegId(pub u64);

impl fmt::Display for LegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "leg-{}", self.0)
    }
}

/// One committed hop in a vehicle itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    id: LegId,
    vehicle: VehicleId,
    origin: usize,
    destination: usize,
    departure: usize,
    arrival: usize,
    /// Planned travel time, unaffected by later delays
    duration: usize,
    mode: DeliveryMode,
    requests: Vec<RequestId>,
    cost: LegCost,
    /// Delay sampled while this leg was in progress
    delay: usize,
    /// Everything this leg has been pushed back by
    total_delay: usize,
}

impl ScheduleItem {
    /// Create a leg
    ///
    /// # Panics
    /// Panics if `arrival <= departure`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: LegId,
        vehicle: VehicleId,
        origin: usize,
        destination: usize,
        departure: usize,
        arrival: usize,
        mode: DeliveryMode,
        cost: LegCost,
        requests: Vec<RequestId>,
    ) -> Self {
        assert!(arrival > departure, "leg must take at least one tick");

        Self {
            id,
            vehicle,
            origin,
            destination,
            departure,
            arrival,
            duration: arrival - departure,
            mode,
            requests,
            cost,
            delay: 0,
            total_delay: 0,
        }
    }

    pub fn id(&self) -> LegId {
        self.id
    }

    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    pub fn origin(&self) -> usize {
        self.origin
    }

    pub fn destination(&self) -> usize {
        self.destination
    }

    pub fn departure(&self) -> usize {
        self.departure
    }

    pub fn arrival(&self) -> usize {
        self.arrival
    }

    pub fn duration(&self) -> usize {
        self.duration
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    pub fn requests(&self) -> &[RequestId] {
        &self.requests
    }

    pub fn cost(&self) -> &LegCost {
        &self.cost
    }

    pub fn delay(&self) -> usize {
        self.delay
    }

    pub fn total_delay(&self) -> usize {
        self.total_delay
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Whether `origin -> destination` matches this leg exactly
    pub fn serves(&self, origin: usize, destination: usize) -> bool {
        self.origin == origin && self.destination == destination
    }

    /// Attach a consolidated request
    pub(crate) fn attach(&mut self, request: RequestId) {
        self.requests.push(request);
    }

    /// Move the whole leg later (cascade from an earlier leg)
    pub(crate) fn shift(&mut self, ticks: usize) {
        self.departure += ticks;
        self.arrival += ticks;
        self.total_delay += ticks;
    }

    /// Push only the arrival (delay sampled while this leg is in progress)
    pub(crate) fn push_arrival(&mut self, ticks: usize) {
        self.arrival += ticks;
        self.delay += ticks;
        self.total_delay += ticks;
    }

    /// Fraction of the planned duration elapsed at `now`, clamped to `[0, 1]`
    ///
    /// # Example
    /// ```
    /// use fleet_dispatch_core_rs::costs::LegCost;
    /// use fleet_dispatch_core_rs::models::schedule::{LegId, ScheduleItem};
    /// use fleet_dispatch_core_rs::models::vehicle::VehicleId;
    /// use fleet_dispatch_core_rs::policy::DeliveryMode;
    ///
    /// let leg = ScheduleItem::new(
    ///     LegId(0), VehicleId(0), 0, 1, 10, 20, DeliveryMode::Fast, LegCost::default(), vec![],
    /// );
    /// assert_eq!(leg.progress(5), 0.0);
    /// assert_eq!(leg.progress(15), 0.5);
    /// assert_eq!(leg.progress(40), 1.0);
    /// ```
    pub fn progress(&self, now: usize) -> f64 {
        if now <= self.departure {
            return 0.0;
        }
        let elapsed = (now - self.departure) as f64;
        (elapsed / self.duration as f64).min(1.0)
    }

    /// Per-request share of cost, risk and emission
    pub fn completion_share(&self) -> LegCost {
        self.cost.split(self.requests.len())
    }
}
