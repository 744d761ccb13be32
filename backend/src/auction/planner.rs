//! Bid planning
//!
//! Planning is split in two pure steps:
//!
//! 1. [`plan_legs`] lays out the legs for one delivery mode: an optional
//!    positioning leg from the vehicle's anchor to the pickup site, then the
//!    delivery leg itself. Any infeasible hop drops the mode.
//! 2. [`propose`] prices every mode the delivery policy considers and keeps
//!    the lowest-scoring plan.
//!
//! Nothing here touches vehicle state. Legs only become real when the
//! command center commits the winning bid.

use crate::auction::bid::{score, Bid};
use crate::auction::AuctionContext;
use crate::costs::{CostTables, LegCost};
use crate::models::request::Request;
use crate::models::vehicle::{VehicleCapability, VehicleId};
use crate::policy::DeliveryMode;
use serde::{Deserialize, Serialize};

/// Location and earliest tick from which a vehicle can start new work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub location: usize,
    pub tick: usize,
}

/// Specification of a leg not yet committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegPlan {
    pub origin: usize,
    pub destination: usize,
    pub departure: usize,
    pub arrival: usize,
    pub mode: DeliveryMode,
    pub cost: LegCost,
    /// Delivery leg (true) or positioning leg (false)
    pub carries_request: bool,
}

/// Lay out the legs needed to carry `origin -> destination` in `mode`
///
/// Returns `None` when any hop is infeasible.
pub fn plan_legs<C: VehicleCapability + ?Sized>(
    capability: &C,
    tables: &CostTables,
    anchor: Anchor,
    origin: usize,
    destination: usize,
    mode: DeliveryMode,
) -> Option<Vec<LegPlan>> {
    let turnaround = capability.profile().turnaround_minutes;
    let mut departure = anchor.tick;
    let mut legs = Vec::with_capacity(2);

    if anchor.location != origin {
        let quote = capability.leg_cost(tables, mode, anchor.location, origin, departure)?;
        legs.push(LegPlan {
            origin: anchor.location,
            destination: origin,
            departure,
            arrival: departure + quote.travel_ticks,
            mode,
            cost: quote.cost,
            carries_request: false,
        });
        departure += quote.travel_ticks + turnaround;
    }

    let quote = capability.leg_cost(tables, mode, origin, destination, departure)?;
    legs.push(LegPlan {
        origin,
        destination,
        departure,
        arrival: departure + quote.travel_ticks,
        mode,
        cost: quote.cost,
        carries_request: true,
    });

    Some(legs)
}

/// Best bid over the modes the delivery policy considers
///
/// Modes are tried in policy order; a later mode replaces the current best
/// only with a strictly lower score.
pub fn propose<C: VehicleCapability + ?Sized>(
    capability: &C,
    vehicle: VehicleId,
    anchor: Anchor,
    request: &Request,
    ctx: &AuctionContext<'_>,
) -> Option<Bid> {
    let mut best: Option<Bid> = None;

    for &mode in ctx.policy.considered_modes() {
        let Some(legs) = plan_legs(
            capability,
            ctx.tables,
            anchor,
            request.origin(),
            request.destination(),
            mode,
        ) else {
            continue;
        };

        let mut totals = LegCost::default();
        for leg in &legs {
            totals += leg.cost;
        }
        let eta = legs.last().map_or(anchor.tick, |leg| leg.arrival);
        let delivery_time = eta.saturating_sub(ctx.now);
        let bid_score = score(
            eta,
            request.deadline_tick(),
            &totals,
            delivery_time,
            &ctx.weights,
            ctx.policy,
        );

        let bid = Bid {
            vehicle,
            request: request.id(),
            mode,
            eta,
            delivery_time,
            totals,
            legs,
            score: bid_score,
        };

        if best.as_ref().map_or(true, |b| bid.score < b.score) {
            best = Some(bid);
        }
    }

    best
}
