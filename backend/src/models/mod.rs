// Domain models
pub mod event;
pub mod location;
pub mod metrics;
pub mod request;
pub mod schedule;
pub mod state;
pub mod vehicle;

pub use event::{Event, EventLog};
pub use location::{Location, Point};
pub use metrics::{ClassMetrics, ConsolidationHistogram, CountMatrix, FleetMetrics};
pub use request::{Completion, Request, RequestError, RequestId, RequestStatus, Urgency};
pub use schedule::{LegId, ScheduleItem};
pub use state::SimulationState;
pub use vehicle::{
    Aerial, DelayFractions, Ground, InvariantViolation, StepOutcome, Vehicle, VehicleCapability,
    VehicleClass, VehicleId, VehicleProfile, VehicleStatus,
};
