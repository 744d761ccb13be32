//! Fleet Dispatch Simulator Core - Rust Engine
//!
//! Tick-driven simulation of a mixed aerial and ground delivery fleet
//! serving time-stamped shipment requests, with deterministic execution.
//!
//! # Architecture
//!
//! - **core**: Simulation clock and time-of-day helpers
//! - **rng**: Deterministic random number generation
//! - **costs**: Injected route cost tables
//! - **models**: Domain types (Location, Request, Vehicle, ScheduleItem, State)
//! - **policy**: Delivery policy, modes and decision weights
//! - **auction**: Per-vehicle bid construction and scoring
//! - **delay**: En-route delay sampling and cascade
//! - **dispatch**: Command center (consolidation and auctions)
//! - **arrivals**: Injected demand schedule
//! - **orchestrator**: Main simulation loop, KPI report, snapshots
//!
//! # Critical Invariants
//!
//! 1. All randomness is deterministic (one seeded RNG per run)
//! 2. Every created request ends in exactly one of open, completed or
//!    undeliverable
//! 3. No leg carries more requests than its vehicle's capacity
//! 4. FFI boundary is minimal and safe

// Module declarations
pub mod arrivals;
pub mod auction;
pub mod core;
pub mod costs;
pub mod delay;
pub mod dispatch;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod rng;

// Re-exports for convenience
pub use arrivals::{DemandEntry, DemandSchedule};
pub use core::time::TimeManager;
pub use costs::{CostTables, RouteCost, RouteMatrix};
pub use dispatch::{CommandCenter, Dispatch, DispatchError};
pub use models::{
    event::{Event, EventLog},
    request::{Request, RequestError, RequestId, RequestStatus, Urgency},
    schedule::{LegId, ScheduleItem},
    state::SimulationState,
    vehicle::{Vehicle, VehicleClass, VehicleId, VehicleProfile, VehicleStatus},
};
pub use orchestrator::{
    KpiReport, Orchestrator, OrchestratorConfig, Scenario, ScheduleSnapshot, SimulationError,
    TickResult,
};
pub use policy::{DecisionWeights, DeliveryMode, DeliveryPolicy};
pub use rng::RngManager;

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn fleet_dispatch_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::orchestrator::PyOrchestrator>()?;
    Ok(())
}
