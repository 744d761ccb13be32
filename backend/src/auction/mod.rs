//! Auction Module
//!
//! Per-vehicle bid construction and scoring. The command center
//! ([`crate::dispatch`]) runs the auction itself: it asks every vehicle to
//! propose, ranks the bids and commits the winner.

pub mod bid;
pub mod planner;

pub use bid::{rank_bids, score, Bid, LATE_PENALTY, RISK_SCALE};
pub use planner::{plan_legs, propose, Anchor, LegPlan};

use crate::costs::CostTables;
use crate::policy::{DecisionWeights, DeliveryPolicy};

/// Everything a vehicle needs to price a request, besides itself
#[derive(Debug, Clone, Copy)]
pub struct AuctionContext<'a> {
    pub tables: &'a CostTables,
    pub policy: DeliveryPolicy,
    pub weights: DecisionWeights,
    pub now: usize,
}
