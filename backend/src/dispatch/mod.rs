//! Command Center
//!
//! Allocates every incoming request to a vehicle:
//!
//! 1. **Consolidation**: the first committed leg (in departure order) that
//!    has not left yet, arrives before the request's deadline, runs the exact
//!    same origin and destination and still has spare capacity absorbs the
//!    request. No new leg, no auction.
//! 2. **Auction**: otherwise every vehicle proposes in activation order. Bids
//!    are ranked by score (stable) and the best on-time bid wins; its legs
//!    are appended to the winner's itinerary. With no on-time bid the request
//!    is undeliverable.
//!
//! The command center never owns legs. It keeps `(vehicle, leg)` references
//! into vehicle itineraries, re-sorted by departure at the end of every tick
//! and pruned once a leg has been completed.

use crate::auction::{rank_bids, AuctionContext, Bid};
use crate::models::event::{Event, EventLog};
use crate::models::request::{RequestError, RequestId};
use crate::models::schedule::{LegId, ScheduleItem};
use crate::models::state::SimulationState;
use crate::models::vehicle::{VehicleClass, VehicleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Lead time assumed before any auction has been won on a route
pub const DEFAULT_LEAD_TIME: usize = 120;

/// Reference to a leg inside a vehicle itinerary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LegRef {
    pub vehicle: VehicleId,
    pub leg: LegId,
}

/// Errors raised while dispatching
#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Vehicle not found: {0}")]
    VehicleNotFound(VehicleId),

    #[error("Committed {leg} missing from {vehicle}")]
    LegNotFound { vehicle: VehicleId, leg: LegId },
}

/// How a request was handled
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Attached to an existing leg
    Consolidated(LegRef),
    /// Won by a vehicle; `legs` are the newly committed legs
    Committed {
        vehicle: VehicleId,
        legs: Vec<LegId>,
    },
    /// No on-time bid
    Undeliverable { bids: usize },
}

/// Observed delivery time per class and route
///
/// Every cell starts at [`DEFAULT_LEAD_TIME`] and is overwritten by the
/// delivery time of each winning bid on that route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadTimes {
    size: usize,
    tables: BTreeMap<VehicleClass, Vec<usize>>,
}

impl LeadTimes {
    pub fn new(size: usize) -> Self {
        let tables = VehicleClass::ALL
            .iter()
            .map(|&class| (class, vec![DEFAULT_LEAD_TIME; size * size]))
            .collect();
        Self { size, tables }
    }

    pub fn get(&self, class: VehicleClass, origin: usize, destination: usize) -> Option<usize> {
        if origin >= self.size || destination >= self.size {
            return None;
        }
        self.tables
            .get(&class)
            .and_then(|table| table.get(origin * self.size + destination))
            .copied()
    }

    fn record(&mut self, class: VehicleClass, origin: usize, destination: usize, ticks: usize) {
        if origin >= self.size || destination >= self.size {
            return;
        }
        if let Some(cell) = self
            .tables
            .get_mut(&class)
            .and_then(|table| table.get_mut(origin * self.size + destination))
        {
            *cell = ticks;
        }
    }
}

/// Dispatch counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCounters {
    pub consolidations: usize,
    pub auctions: usize,
    pub legs_committed: usize,
    /// Winner was busy while an idle vehicle also bid
    pub non_idle_winners: usize,
}

/// The command center
#[derive(Debug, Clone)]
pub struct CommandCenter {
    committed: Vec<LegRef>,
    lead_times: LeadTimes,
    counters: DispatchCounters,
    next_leg: u64,
}

impl CommandCenter {
    pub fn new(num_locations: usize) -> Self {
        Self {
            committed: Vec::new(),
            lead_times: LeadTimes::new(num_locations),
            counters: DispatchCounters::default(),
            next_leg: 0,
        }
    }

    /// Committed, not yet completed legs in departure order
    ///
    /// Legs committed during the current tick sit at the end until
    /// [`CommandCenter::end_of_tick`] re-sorts.
    pub fn committed(&self) -> &[LegRef] {
        &self.committed
    }

    pub fn lead_times(&self) -> &LeadTimes {
        &self.lead_times
    }

    pub fn counters(&self) -> &DispatchCounters {
        &self.counters
    }

    /// Allocate an open request: consolidate if possible, else auction
    pub fn submit(
        &mut self,
        state: &mut SimulationState,
        request: RequestId,
        activation: &[VehicleId],
        ctx: &AuctionContext<'_>,
        events: &mut EventLog,
    ) -> Result<Dispatch, DispatchError> {
        if let Some(target) = self.find_consolidation(state, request, ctx.now)? {
            self.consolidate(state, request, target)?;
            events.log(Event::RequestConsolidated {
                tick: ctx.now,
                request,
                vehicle: target.vehicle,
                leg: target.leg,
            });
            debug!(%request, vehicle = %target.vehicle, leg = %target.leg, "consolidated");
            return Ok(Dispatch::Consolidated(target));
        }

        self.auction(state, request, activation, ctx, events)
    }

    /// First committed leg able to absorb `request`
    fn find_consolidation(
        &self,
        state: &SimulationState,
        request: RequestId,
        now: usize,
    ) -> Result<Option<LegRef>, DispatchError> {
        let request = state
            .open_request(request)
            .ok_or(RequestError::Unknown { id: request })?;

        for &target in &self.committed {
            let vehicle = state
                .vehicle(target.vehicle)
                .ok_or(DispatchError::VehicleNotFound(target.vehicle))?;
            let Some(leg) = vehicle.leg(target.leg) else {
                continue;
            };

            if leg.departure() > now
                && leg.arrival() < request.deadline_tick()
                && leg.serves(request.origin(), request.destination())
                && leg.requests().len() < vehicle.capacity()
            {
                return Ok(Some(target));
            }
        }

        Ok(None)
    }

    fn consolidate(
        &mut self,
        state: &mut SimulationState,
        request: RequestId,
        target: LegRef,
    ) -> Result<(), DispatchError> {
        let leg = state
            .vehicle_mut(target.vehicle)
            .ok_or(DispatchError::VehicleNotFound(target.vehicle))?
            .leg_mut(target.leg)
            .ok_or(DispatchError::LegNotFound {
                vehicle: target.vehicle,
                leg: target.leg,
            })?;
        leg.attach(request);

        state
            .open_request_mut(request)
            .ok_or(RequestError::Unknown { id: request })?
            .assign(target.vehicle, target.leg)?;

        self.counters.consolidations += 1;
        Ok(())
    }

    fn auction(
        &mut self,
        state: &mut SimulationState,
        request: RequestId,
        activation: &[VehicleId],
        ctx: &AuctionContext<'_>,
        events: &mut EventLog,
    ) -> Result<Dispatch, DispatchError> {
        self.counters.auctions += 1;

        let open = state
            .open_request(request)
            .ok_or(RequestError::Unknown { id: request })?;
        let deadline = open.deadline_tick();

        let mut bids: Vec<Bid> = Vec::new();
        let mut idle_bidder = false;
        let mut idle_by_vehicle = BTreeMap::new();
        for &id in activation {
            let vehicle = state
                .vehicle(id)
                .ok_or(DispatchError::VehicleNotFound(id))?;
            if let Some(bid) = vehicle.propose(open, ctx) {
                idle_bidder |= vehicle.is_idle();
                idle_by_vehicle.insert(id, vehicle.is_idle());
                bids.push(bid);
            }
        }

        rank_bids(&mut bids);
        let on_time = bids.iter().filter(|b| b.is_on_time(deadline)).count();
        let winner = bids.iter().position(|b| b.is_on_time(deadline));

        events.log(Event::BidsCollected {
            tick: ctx.now,
            request,
            bids: bids.len(),
            on_time,
            winner: winner.map(|i| bids[i].vehicle),
            winning_score: winner.map(|i| bids[i].score),
        });

        let Some(winner) = winner else {
            state.mark_undeliverable(request, ctx.now)?;
            events.log(Event::RequestUndeliverable {
                tick: ctx.now,
                request,
                bids: bids.len(),
            });
            warn!(%request, bids = bids.len(), deadline, "no on-time bid, request undeliverable");
            return Ok(Dispatch::Undeliverable { bids: bids.len() });
        };

        let bid = bids.swap_remove(winner);
        if idle_bidder && !idle_by_vehicle.get(&bid.vehicle).copied().unwrap_or(false) {
            self.counters.non_idle_winners += 1;
        }

        debug!(
            %request,
            vehicle = %bid.vehicle,
            mode = %bid.mode,
            eta = bid.eta,
            score = bid.score,
            "auction won"
        );
        self.commit(state, bid, ctx.now, events)
    }

    /// Turn the winning bid into legs on the winner's itinerary
    fn commit(
        &mut self,
        state: &mut SimulationState,
        bid: Bid,
        now: usize,
        events: &mut EventLog,
    ) -> Result<Dispatch, DispatchError> {
        let vehicle_id = bid.vehicle;
        let mut items = Vec::with_capacity(bid.legs.len());
        let mut delivery_leg = None;

        for plan in &bid.legs {
            let id = LegId(self.next_leg);
            self.next_leg += 1;

            let requests = if plan.carries_request {
                delivery_leg = Some(id);
                vec![bid.request]
            } else {
                Vec::new()
            };

            events.log(Event::LegCommitted {
                tick: now,
                vehicle: vehicle_id,
                leg: id,
                origin: plan.origin,
                destination: plan.destination,
                departure: plan.departure,
                arrival: plan.arrival,
                mode: plan.mode,
                request: plan.carries_request.then_some(bid.request),
            });

            items.push(ScheduleItem::new(
                id,
                vehicle_id,
                plan.origin,
                plan.destination,
                plan.departure,
                plan.arrival,
                plan.mode,
                plan.cost,
                requests,
            ));
            self.committed.push(LegRef {
                vehicle: vehicle_id,
                leg: id,
            });
        }

        let leg_ids: Vec<LegId> = items.iter().map(ScheduleItem::id).collect();
        self.counters.legs_committed += items.len();

        let vehicle = state
            .vehicle_mut(vehicle_id)
            .ok_or(DispatchError::VehicleNotFound(vehicle_id))?;
        let class = vehicle.class();
        vehicle.commit(items);

        if let Some(leg) = delivery_leg {
            let request = state
                .open_request_mut(bid.request)
                .ok_or(RequestError::Unknown { id: bid.request })?;
            let (origin, destination) = (request.origin(), request.destination());
            request.assign(vehicle_id, leg)?;
            self.lead_times
                .record(class, origin, destination, bid.delivery_time);
        }

        Ok(Dispatch::Committed {
            vehicle: vehicle_id,
            legs: leg_ids,
        })
    }

    /// Drop references to completed legs and re-sort by departure
    pub fn end_of_tick(&mut self, state: &SimulationState) {
        let departure = |target: &LegRef| {
            state
                .vehicle(target.vehicle)
                .and_then(|v| v.leg(target.leg))
                .map(ScheduleItem::departure)
        };

        self.committed.retain(|target| departure(target).is_some());
        self.committed
            .sort_by_key(|target| departure(target).unwrap_or(usize::MAX));
    }
}
