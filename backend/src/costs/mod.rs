//! Cost Tables
//!
//! This module provides the injected travel-cost lookups (`tables`) and the
//! per-leg resource accounting type (`LegCost`) that bids and legs carry.

pub mod tables;

// Re-exports
pub use tables::{
    CostTableError, CostTables, HourlyRouteMatrices, LegCost, ModeTables, Quote, RouteCost,
    RouteMatrix, INFEASIBLE,
};
