//! Vehicle model
//!
//! A vehicle owns its itinerary (a time-ordered queue of legs) and runs one
//! state-machine step per tick:
//!
//! ```text
//!            now >= departure              now >= eta, delay <= 0
//!   Idle ───────────────────► InTransit ───────────────────────────► Idle
//!                                 │                                   ▲
//!                                 │ now >= eta, delay > 0             │ now >= shifted eta
//!                                 └──────────────► Delayed ───────────┘
//! ```
//!
//! Class-specific behaviour (which cost table a hop is priced from) lives
//! behind [`VehicleCapability`], implemented by [`Aerial`] and [`Ground`].
//! The step algorithm itself is shared in [`Vehicle::advance`].
//!
//! # Critical Invariants
//!
//! 1. A non-idle vehicle always has a leg at the front of its itinerary
//! 2. Itinerary departures are non-decreasing, each separated from the
//!    previous arrival by at least the turnaround time
//! 3. No leg carries more requests than the vehicle's capacity

use crate::auction::planner::{self, Anchor};
use crate::auction::{AuctionContext, Bid};
use crate::core::time::hour_of_day;
use crate::costs::{CostTables, Quote};
use crate::delay::{propagate_delay, sample_delay, DelayConfig, DelayPropagation};
use crate::models::location::{Location, Point};
use crate::models::request::Request;
use crate::models::schedule::{LegId, ScheduleItem};
use crate::policy::DeliveryMode;
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Vehicle identifier, equal to the vehicle's index in the fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub usize);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "veh-{}", self.0)
    }
}

/// Vehicle class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    Aerial,
    Ground,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 2] = [VehicleClass::Aerial, VehicleClass::Ground];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleClass::Aerial => "aerial",
            VehicleClass::Ground => "ground",
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Idle,
    InTransit,
    Delayed,
}

/// Travel-time variance as a fraction of planned duration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayFractions {
    pub normal: f64,
    pub rush_hour: f64,
}

/// Per-class capability parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub speed_kmh: f64,
    /// Maximum requests per leg
    pub capacity: usize,
    /// Buffer between consecutive legs, in ticks
    pub turnaround_minutes: usize,
    pub delay_fractions: DelayFractions,
    pub cost_per_km: f64,
    /// Yearly fixed cost per vehicle
    pub fixed_cost: f64,
}

impl VehicleProfile {
    pub fn aerial_default() -> Self {
        Self {
            speed_kmh: 60.0,
            capacity: 5,
            turnaround_minutes: 5,
            delay_fractions: DelayFractions {
                normal: 0.05,
                rush_hour: 0.05,
            },
            cost_per_km: 0.1,
            fixed_cost: 50_000.0,
        }
    }

    pub fn ground_default() -> Self {
        Self {
            speed_kmh: 50.0,
            capacity: 10,
            turnaround_minutes: 3,
            delay_fractions: DelayFractions {
                normal: 0.05,
                rush_hour: 0.15,
            },
            cost_per_km: 0.25,
            fixed_cost: 5_000.0,
        }
    }
}

/// Class-specific behaviour of a vehicle
pub trait VehicleCapability: fmt::Debug + Send + Sync {
    fn class(&self) -> VehicleClass;

    fn profile(&self) -> &VehicleProfile;

    /// Price the hop `origin -> destination` departing at `departure`
    ///
    /// Returns `None` when the hop is infeasible in `mode`.
    fn leg_cost(
        &self,
        tables: &CostTables,
        mode: DeliveryMode,
        origin: usize,
        destination: usize,
        departure: usize,
    ) -> Option<Quote>;

    /// Best bid this vehicle can make for `request` starting from `anchor`
    fn propose(
        &self,
        vehicle: VehicleId,
        anchor: Anchor,
        request: &Request,
        ctx: &AuctionContext<'_>,
    ) -> Option<Bid> {
        planner::propose(self, vehicle, anchor, request, ctx)
    }
}

/// Aerial vehicle (drone); one table per mode, time of day irrelevant
#[derive(Debug, Clone)]
pub struct Aerial {
    profile: VehicleProfile,
}

impl Aerial {
    pub fn new(profile: VehicleProfile) -> Self {
        Self { profile }
    }
}

impl VehicleCapability for Aerial {
    fn class(&self) -> VehicleClass {
        VehicleClass::Aerial
    }

    fn profile(&self) -> &VehicleProfile {
        &self.profile
    }

    fn leg_cost(
        &self,
        tables: &CostTables,
        mode: DeliveryMode,
        origin: usize,
        destination: usize,
        _departure: usize,
    ) -> Option<Quote> {
        let route = tables.aerial.get(mode).lookup(origin, destination)?;
        Quote::price(&route, self.profile.cost_per_km)
    }
}

/// Ground vehicle (car); tables vary with the departure hour
#[derive(Debug, Clone)]
pub struct Ground {
    profile: VehicleProfile,
}

impl Ground {
    pub fn new(profile: VehicleProfile) -> Self {
        Self { profile }
    }
}

impl VehicleCapability for Ground {
    fn class(&self) -> VehicleClass {
        VehicleClass::Ground
    }

    fn profile(&self) -> &VehicleProfile {
        &self.profile
    }

    fn leg_cost(
        &self,
        tables: &CostTables,
        mode: DeliveryMode,
        origin: usize,
        destination: usize,
        departure: usize,
    ) -> Option<Quote> {
        let route = tables
            .ground
            .get(mode)
            .for_hour(hour_of_day(departure))?
            .lookup(origin, destination)?;
        Quote::price(&route, self.profile.cost_per_km)
    }
}

/// Build the capability for a class
pub fn capability_for(class: VehicleClass, profile: VehicleProfile) -> Box<dyn VehicleCapability> {
    match class {
        VehicleClass::Aerial => Box::new(Aerial::new(profile)),
        VehicleClass::Ground => Box::new(Ground::new(profile)),
    }
}

/// A vehicle in a state it must never reach
#[derive(Debug, Error, PartialEq)]
#[error("{vehicle} ({status:?}): {detail}")]
pub struct InvariantViolation {
    pub vehicle: VehicleId,
    pub status: VehicleStatus,
    pub detail: String,
}

/// What one state-machine step did
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Idle with nothing due
    Waiting,
    /// Left for the front leg
    Departed { leg: LegId },
    /// Still under way
    Moving,
    /// Reached the scheduled eta late; the itinerary has been shifted
    Delayed {
        leg: LegId,
        propagation: DelayPropagation,
    },
    /// Completed a leg; it has been popped from the itinerary
    Arrived { leg: ScheduleItem },
}

/// A fleet vehicle
pub struct Vehicle {
    id: VehicleId,
    capability: Box<dyn VehicleCapability>,
    status: VehicleStatus,
    location: usize,
    itinerary: VecDeque<ScheduleItem>,
    eta: Option<usize>,
    mode: Option<DeliveryMode>,
    /// No request on board
    empty: bool,
    status_since: usize,
}

impl fmt::Debug for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vehicle")
            .field("id", &self.id)
            .field("class", &self.class())
            .field("status", &self.status)
            .field("location", &self.location)
            .field("legs", &self.itinerary.len())
            .field("eta", &self.eta)
            .finish()
    }
}

impl Vehicle {
    pub fn new(id: VehicleId, capability: Box<dyn VehicleCapability>, location: usize) -> Self {
        Self {
            id,
            capability,
            status: VehicleStatus::Idle,
            location,
            itinerary: VecDeque::new(),
            eta: None,
            mode: None,
            empty: true,
            status_since: 0,
        }
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn class(&self) -> VehicleClass {
        self.capability.class()
    }

    pub fn profile(&self) -> &VehicleProfile {
        self.capability.profile()
    }

    pub fn capacity(&self) -> usize {
        self.profile().capacity
    }

    pub fn turnaround(&self) -> usize {
        self.profile().turnaround_minutes
    }

    pub fn status(&self) -> VehicleStatus {
        self.status
    }

    pub fn is_idle(&self) -> bool {
        self.status == VehicleStatus::Idle
    }

    pub fn location(&self) -> usize {
        self.location
    }

    pub fn itinerary(&self) -> &VecDeque<ScheduleItem> {
        &self.itinerary
    }

    pub fn eta(&self) -> Option<usize> {
        self.eta
    }

    pub fn mode(&self) -> Option<DeliveryMode> {
        self.mode
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn status_since(&self) -> usize {
        self.status_since
    }

    pub fn leg(&self, id: LegId) -> Option<&ScheduleItem> {
        self.itinerary.iter().find(|leg| leg.id() == id)
    }

    pub(crate) fn leg_mut(&mut self, id: LegId) -> Option<&mut ScheduleItem> {
        self.itinerary.iter_mut().find(|leg| leg.id() == id)
    }

    /// Where and when a new bid may start
    ///
    /// After the last committed leg plus turnaround, or here plus turnaround
    /// when the itinerary is empty.
    pub fn anchor(&self, now: usize) -> Anchor {
        match self.itinerary.back() {
            Some(last) => Anchor {
                location: last.destination(),
                tick: last.arrival() + self.turnaround(),
            },
            None => Anchor {
                location: self.location,
                tick: now + self.turnaround(),
            },
        }
    }

    /// Bid for `request`; pure with respect to this vehicle
    pub fn propose(&self, request: &Request, ctx: &AuctionContext<'_>) -> Option<Bid> {
        self.capability
            .propose(self.id, self.anchor(ctx.now), request, ctx)
    }

    /// Append the legs of a winning bid
    pub(crate) fn commit(&mut self, legs: impl IntoIterator<Item = ScheduleItem>) {
        for leg in legs {
            debug_assert!(
                self.itinerary
                    .back()
                    .map_or(true, |last| last.arrival() + self.turnaround() <= leg.departure()),
                "{} committed an overlapping leg",
                self.id
            );
            self.itinerary.push_back(leg);
        }
    }

    /// Run one state-machine step at `now`
    pub fn advance(
        &mut self,
        now: usize,
        delays: &DelayConfig,
        rng: &mut RngManager,
    ) -> Result<StepOutcome, InvariantViolation> {
        let Some(front) = self.itinerary.front() else {
            if self.status != VehicleStatus::Idle {
                return Err(self.violation("empty itinerary while not idle"));
            }
            return Ok(StepOutcome::Waiting);
        };

        match self.status {
            VehicleStatus::Idle => {
                if now >= front.departure() {
                    Ok(self.depart(now))
                } else {
                    Ok(StepOutcome::Waiting)
                }
            }
            VehicleStatus::InTransit => {
                let eta = self.eta.unwrap_or(front.arrival());
                if now < eta {
                    return Ok(StepOutcome::Moving);
                }
                if delays.enabled {
                    let fraction = delays.fraction(&self.profile().delay_fractions, now);
                    let delay = sample_delay(rng, front.duration(), fraction);
                    if delay > 0 {
                        return self.delay(now, delay as usize);
                    }
                }
                Ok(self.arrive(now))
            }
            VehicleStatus::Delayed => {
                let eta = self.eta.unwrap_or(front.arrival());
                if now >= eta {
                    Ok(self.arrive(now))
                } else {
                    Ok(StepOutcome::Moving)
                }
            }
        }
    }

    /// Display position at `now`
    ///
    /// Interpolated along the front leg while under way; the leg's
    /// destination once the planned duration has elapsed.
    pub fn position(&self, now: usize, locations: &[Location]) -> Point {
        let at = |index: usize| {
            locations
                .get(index)
                .map(Location::position)
                .unwrap_or_default()
        };

        match (self.status, self.itinerary.front()) {
            (VehicleStatus::Idle, _) | (_, None) => at(self.location),
            (_, Some(leg)) => at(leg.origin()).lerp(at(leg.destination()), leg.progress(now)),
        }
    }

    fn depart(&mut self, now: usize) -> StepOutcome {
        let Some(leg) = self.itinerary.front() else {
            return StepOutcome::Waiting;
        };
        let id = leg.id();
        self.mode = Some(leg.mode());
        self.eta = Some(leg.arrival());
        self.empty = leg.is_empty();
        self.status = VehicleStatus::InTransit;
        self.status_since = now;
        StepOutcome::Departed { leg: id }
    }

    fn delay(&mut self, now: usize, delay: usize) -> Result<StepOutcome, InvariantViolation> {
        let turnaround = self.turnaround();
        let propagation = propagate_delay(&mut self.itinerary, delay, turnaround)
            .map_err(|err| self.violation(&err.to_string()))?;

        let front = self
            .itinerary
            .front()
            .ok_or_else(|| self.violation("delayed leg vanished"))?;
        let leg = front.id();
        self.eta = Some(front.arrival());
        self.status = VehicleStatus::Delayed;
        self.status_since = now;
        Ok(StepOutcome::Delayed { leg, propagation })
    }

    fn arrive(&mut self, now: usize) -> StepOutcome {
        let Some(leg) = self.itinerary.pop_front() else {
            return StepOutcome::Waiting;
        };
        self.location = leg.destination();
        self.status = VehicleStatus::Idle;
        self.empty = true;
        self.eta = None;
        self.status_since = now;
        StepOutcome::Arrived { leg }
    }

    fn violation(&self, detail: &str) -> InvariantViolation {
        InvariantViolation {
            vehicle: self.id,
            status: self.status,
            detail: detail.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn force_status(&mut self, status: VehicleStatus) {
        self.status = status;
    }
}
