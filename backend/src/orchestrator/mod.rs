//! Orchestrator - main simulation loop
//!
//! Implements the tick loop integrating demand, dispatch and vehicle
//! movement. See `engine.rs` for the loop itself, `report.rs` for the
//! end-of-run KPI mapping and `checkpoint.rs` for schedule snapshots.

pub mod checkpoint;
pub mod engine;
pub mod report;

// Re-export main types for convenience
pub use engine::{
    ClientDemand, FleetConfig, InfrastructureCosts, LocationConfig, Orchestrator,
    OrchestratorConfig, Scenario, SimulationError, TickResult, VehicleView,
};
pub use report::KpiReport;

// Re-export checkpoint types
pub use checkpoint::{
    compute_config_hash, CompletedRequestSnapshot, LegSnapshot, ScheduleSnapshot,
    VehicleSnapshot,
};
