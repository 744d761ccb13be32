//! Orchestrator Engine
//!
//! Main simulation loop integrating all components:
//! - Demand emission (injected schedule, per client)
//! - Dispatch (consolidation onto committed legs, else auction)
//! - Vehicle state machines (departure, delay cascade, arrival)
//! - Request close-out and KPI accumulation
//! - Event logging (complete simulation history)
//!
//! # Architecture
//!
//! ```text
//! For each tick t:
//! 1. Clients emit due requests (seeded client activation order, t < max_ticks)
//! 2. Each request: completed on the spot, consolidated, or auctioned
//! 3. Vehicles step their state machines (seeded vehicle activation order)
//! 4. Completed legs close out their requests
//! 5. Command center prunes and re-sorts committed legs
//! 6. Advance time
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use fleet_dispatch_core_rs::orchestrator::{Orchestrator, OrchestratorConfig};
//!
//! let config: OrchestratorConfig = serde_json::from_str(&scenario)?;
//! let mut orchestrator = Orchestrator::new(config, cost_tables)?;
//!
//! for _ in 0..60 {
//!     let result = orchestrator.tick()?;
//!     println!("Tick {}: {} created, {} arrivals", result.tick, result.requests_created, result.arrivals);
//! }
//! ```

use crate::arrivals::{DemandEntry, DemandSchedule};
use crate::auction::AuctionContext;
use crate::core::time::{TimeManager, MINUTES_PER_DAY};
use crate::costs::{CostTableError, CostTables};
use crate::delay::DelayConfig;
use crate::dispatch::{CommandCenter, Dispatch, DispatchError};
use crate::models::event::{Event, EventLog};
use crate::models::location::{Location, Point};
use crate::models::metrics::FleetMetrics;
use crate::models::request::RequestError;
use crate::models::schedule::ScheduleItem;
use crate::models::state::SimulationState;
use crate::models::vehicle::{
    capability_for, InvariantViolation, StepOutcome, Vehicle, VehicleClass, VehicleId,
    VehicleProfile, VehicleStatus,
};
use crate::orchestrator::checkpoint::{compute_config_hash, ScheduleSnapshot};
use crate::orchestrator::report::KpiReport;
use crate::policy::{DecisionWeights, DeliveryMode, DeliveryPolicy};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, error, info};

// ============================================================================
// Configuration Types
// ============================================================================

fn default_max_ticks() -> usize {
    MINUTES_PER_DAY
}

fn default_drain_ticks() -> usize {
    MINUTES_PER_DAY
}

/// Complete orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// RNG seed for determinism
    pub rng_seed: u64,

    /// Ticks during which clients emit demand
    #[serde(default = "default_max_ticks")]
    pub max_ticks: usize,

    /// Extra ticks allowed for open requests to drain after emission stops
    #[serde(default = "default_drain_ticks")]
    pub drain_ticks: usize,

    #[serde(default)]
    pub delivery_policy: DeliveryPolicy,

    #[serde(default)]
    pub decision_weights: DecisionWeights,

    #[serde(default)]
    pub delays: DelayConfig,

    /// Record origin × destination movement and delivery counts
    #[serde(default)]
    pub track_heatmap: bool,

    /// Client sites; index in this list is the cost-matrix index
    pub locations: Vec<LocationConfig>,

    pub fleets: Vec<FleetConfig>,

    #[serde(default)]
    pub infrastructure: Option<InfrastructureCosts>,

    /// Injected demand schedule
    #[serde(default)]
    pub demand: Vec<DemandEntry>,
}

/// Per-location configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub name: String,

    #[serde(default)]
    pub position: Point,
}

/// One homogeneous group of vehicles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    pub class: VehicleClass,
    pub count: usize,
    pub profile: VehicleProfile,

    /// Explicit spawn locations, cycled over the fleet; sampled from the
    /// seeded RNG when absent
    #[serde(default)]
    pub spawn: Option<Vec<usize>>,
}

/// Yearly costs of operating an aerial fleet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureCosts {
    /// Mission control centre, paid once when any aerial vehicle exists
    pub mission_control: f64,
    /// Landing platform, paid per client when any aerial vehicle exists
    pub landing_platform: f64,
    pub min_pilot_fte: f64,
    /// Salary of one full-time pilot
    pub pilot_fte_cost: f64,
    /// Aerial vehicles the minimum pilot staffing can operate
    pub drones_per_pilot_fte: usize,
}

/// Scenario document: configuration plus the injected cost tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub config: OrchestratorConfig,
    pub cost_tables: CostTables,
}

impl Scenario {
    pub fn into_orchestrator(self) -> Result<Orchestrator, SimulationError> {
        Orchestrator::new(self.config, self.cost_tables)
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Main orchestrator for the dispatch simulation
///
/// Owns the clock, the single RNG, the simulation state and the command
/// center; drives them one tick at a time.
#[derive(Debug)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    cost_tables: CostTables,
    state: SimulationState,
    command_center: CommandCenter,
    demand: DemandSchedule,
    time_manager: TimeManager,
    rng: RngManager,

    /// Seeded client activation order, fixed at setup
    client_order: Vec<usize>,

    /// Seeded vehicle activation order, fixed at setup
    vehicle_order: Vec<VehicleId>,

    event_log: EventLog,
    config_hash: String,

    /// Set by the first fatal error; every later tick is refused
    halted: bool,

    /// Computed once, when the run finishes
    report: Option<KpiReport>,
}

/// Result of a single tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickResult {
    pub tick: usize,
    pub requests_created: usize,
    pub directly_performed: usize,
    pub consolidated: usize,
    pub auctions_won: usize,
    pub undeliverable: usize,
    pub departures: usize,
    pub delays: usize,
    pub arrivals: usize,
    pub requests_completed: usize,
}

/// Simulation error types
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Vehicle not found: {0}")]
    VehicleNotFound(VehicleId),

    #[error("Invariant violation on {vehicle}: {detail}")]
    InvariantViolation { vehicle: VehicleId, detail: String },

    #[error("open requests remain at tick {tick}, past the drain limit")]
    DrainLimitExceeded { tick: usize },

    #[error("simulation halted after a fatal error")]
    Halted,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("State validation error: {0}")]
    StateValidationError(String),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    CostTable(#[from] CostTableError),
}

impl From<InvariantViolation> for SimulationError {
    fn from(violation: InvariantViolation) -> Self {
        SimulationError::InvariantViolation {
            vehicle: violation.vehicle,
            detail: format!("{:?}: {}", violation.status, violation.detail),
        }
    }
}

impl From<DispatchError> for SimulationError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Request(err) => SimulationError::Request(err),
            DispatchError::VehicleNotFound(id) => SimulationError::VehicleNotFound(id),
            DispatchError::LegNotFound { vehicle, leg } => SimulationError::InvariantViolation {
                vehicle,
                detail: format!("committed {leg} missing from itinerary"),
            },
        }
    }
}

/// Display view of one vehicle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleView {
    pub id: VehicleId,
    pub class: VehicleClass,
    pub status: VehicleStatus,
    pub position: Point,
    pub mode: Option<DeliveryMode>,
    pub eta: Option<usize>,
    pub location: usize,
    pub legs: usize,
}

/// Open-demand count of one client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientDemand {
    pub index: usize,
    pub name: String,
    pub open_demand: usize,
}

impl Orchestrator {
    /// Create a new orchestrator from configuration and cost tables
    ///
    /// Validates the configuration, places the fleet, fixes the activation
    /// orders and books fixed and labour costs. All RNG draws of the setup
    /// phase happen here, in that order.
    ///
    /// # Errors
    ///
    /// * `InvalidConfig` - a check of [`Orchestrator::validate_config`] failed
    /// * `CostTable` - a cost table does not match the location count
    pub fn new(
        config: OrchestratorConfig,
        cost_tables: CostTables,
    ) -> Result<Self, SimulationError> {
        Self::validate_config(&config)?;
        cost_tables.validate(config.locations.len())?;
        let config_hash = compute_config_hash(&config)?;

        let mut rng = RngManager::new(config.rng_seed);
        let num_locations = config.locations.len();

        let locations: Vec<Location> = config
            .locations
            .iter()
            .enumerate()
            .map(|(index, loc)| Location::new(index, loc.name.clone(), loc.position))
            .collect();

        let mut vehicles = Vec::new();
        for fleet in &config.fleets {
            let spawns = match &fleet.spawn {
                Some(spawn) => (0..fleet.count).map(|i| spawn[i % spawn.len()]).collect(),
                None => match fleet.class {
                    VehicleClass::Aerial => rng.sample_indices(num_locations, fleet.count),
                    VehicleClass::Ground => (0..fleet.count)
                        .map(|_| rng.range(0, num_locations as i64) as usize)
                        .collect(),
                },
            };
            for location in spawns {
                let id = VehicleId(vehicles.len());
                let capability = capability_for(fleet.class, fleet.profile.clone());
                vehicles.push(Vehicle::new(id, capability, location));
            }
        }

        let client_order = rng.permutation(num_locations);
        let vehicle_order = rng
            .permutation(vehicles.len())
            .into_iter()
            .map(VehicleId)
            .collect();

        let mut state = SimulationState::new(locations, vehicles, config.track_heatmap);
        Self::book_costs(&config, state.metrics_mut())?;

        let demand = DemandSchedule::new(num_locations, &config.demand);
        info!(
            locations = num_locations,
            vehicles = state.num_vehicles(),
            requests = demand.total(),
            seed = config.rng_seed,
            "orchestrator initialised"
        );

        Ok(Self {
            command_center: CommandCenter::new(num_locations),
            time_manager: TimeManager::new(MINUTES_PER_DAY),
            config,
            cost_tables,
            state,
            demand,
            rng,
            client_order,
            vehicle_order,
            event_log: EventLog::new(),
            config_hash,
            halted: false,
            report: None,
        })
    }

    /// Check the configuration before any state is built
    pub fn validate_config(config: &OrchestratorConfig) -> Result<(), SimulationError> {
        let invalid = |msg: String| Err(SimulationError::InvalidConfig(msg));
        let num_locations = config.locations.len();

        if num_locations == 0 {
            return invalid("at least one location is required".to_string());
        }
        if config.fleets.iter().map(|f| f.count).sum::<usize>() == 0 {
            return invalid("at least one vehicle is required".to_string());
        }

        for fleet in &config.fleets {
            let profile = &fleet.profile;
            if profile.capacity == 0 {
                return invalid(format!("{} fleet: capacity must be at least 1", fleet.class));
            }
            if profile.turnaround_minutes == 0 {
                return invalid(format!(
                    "{} fleet: turnaround must be at least 1 minute",
                    fleet.class
                ));
            }
            for fraction in [profile.delay_fractions.normal, profile.delay_fractions.rush_hour] {
                if !(0.0..1.0).contains(&fraction) {
                    return invalid(format!(
                        "{} fleet: delay fraction {fraction} outside [0, 1)",
                        fleet.class
                    ));
                }
            }
            if let Some(spawn) = &fleet.spawn {
                if spawn.is_empty() && fleet.count > 0 {
                    return invalid(format!("{} fleet: spawn list is empty", fleet.class));
                }
                if let Some(bad) = spawn.iter().find(|&&loc| loc >= num_locations) {
                    return invalid(format!(
                        "{} fleet: spawn location {bad} out of range",
                        fleet.class
                    ));
                }
            }
        }

        let mut ids = BTreeSet::new();
        for entry in &config.demand {
            if entry.origin >= num_locations || entry.destination >= num_locations {
                return invalid(format!(
                    "request {}: location index out of range ({} -> {})",
                    entry.id, entry.origin, entry.destination
                ));
            }
            if entry.deadline < entry.tick {
                return invalid(format!(
                    "request {}: deadline {} before emission tick {}",
                    entry.id, entry.deadline, entry.tick
                ));
            }
            if !ids.insert(entry.id) {
                return invalid(format!("duplicate request id {}", entry.id));
            }
        }

        Ok(())
    }

    /// Fixed costs (infrastructure and vehicles) and pilot labour
    fn book_costs(
        config: &OrchestratorConfig,
        metrics: &mut FleetMetrics,
    ) -> Result<(), SimulationError> {
        let drones: usize = config
            .fleets
            .iter()
            .filter(|f| f.class == VehicleClass::Aerial)
            .map(|f| f.count)
            .sum();

        if drones > 0 {
            if let Some(infra) = &config.infrastructure {
                if infra.drones_per_pilot_fte < drones {
                    return Err(SimulationError::InvalidConfig(format!(
                        "not enough pilots: {} per minimum staffing, {} aerial vehicles",
                        infra.drones_per_pilot_fte, drones
                    )));
                }
                metrics.fixed_costs += infra.mission_control;
                metrics.fixed_costs += infra.landing_platform * config.locations.len() as f64;
                metrics.labour_costs += infra.min_pilot_fte * infra.pilot_fte_cost;
            }
        }

        for fleet in &config.fleets {
            let fixed = fleet.profile.fixed_cost * fleet.count as f64;
            let class = metrics.class_mut(fleet.class);
            class.vehicles += fleet.count;
            class.fixed_cost += fixed;
            metrics.fixed_costs += fixed;
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_tick(&self) -> usize {
        self.time_manager.current_tick()
    }

    pub fn current_day(&self) -> usize {
        self.time_manager.current_day()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn cost_tables(&self) -> &CostTables {
        &self.cost_tables
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn command_center(&self) -> &CommandCenter {
        &self.command_center
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn event_count(&self) -> usize {
        self.event_log.len()
    }

    pub fn rng_state(&self) -> u64 {
        self.rng.get_state()
    }

    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    pub fn client_order(&self) -> &[usize] {
        &self.client_order
    }

    pub fn vehicle_order(&self) -> &[VehicleId] {
        &self.vehicle_order
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn metrics(&self) -> &FleetMetrics {
        self.state.metrics()
    }

    pub fn open_request_count(&self) -> usize {
        self.state.open_request_count()
    }

    /// Open requests already past their deadline
    pub fn late_open_request_count(&self) -> usize {
        self.state.late_open_request_count(self.current_tick())
    }

    pub fn average_delivery_time(&self) -> Option<f64> {
        self.state.metrics().average_delivery_time()
    }

    /// Status, interpolated position, mode and eta of every vehicle
    pub fn vehicle_views(&self) -> Vec<VehicleView> {
        let now = self.current_tick();
        let locations = self.state.locations();
        self.state
            .vehicles()
            .iter()
            .map(|vehicle| VehicleView {
                id: vehicle.id(),
                class: vehicle.class(),
                status: vehicle.status(),
                position: vehicle.position(now, locations),
                mode: vehicle.mode(),
                eta: vehicle.eta(),
                location: vehicle.location(),
                legs: vehicle.itinerary().len(),
            })
            .collect()
    }

    pub fn client_open_demand(&self) -> Vec<ClientDemand> {
        self.state
            .locations()
            .iter()
            .map(|loc| ClientDemand {
                index: loc.index(),
                name: loc.name().to_string(),
                open_demand: loc.open_demand(),
            })
            .collect()
    }

    /// Committed legs not yet completed, in departure order
    pub fn committed_legs(&self) -> Vec<&ScheduleItem> {
        self.command_center
            .committed()
            .iter()
            .filter_map(|target| {
                self.state
                    .vehicle(target.vehicle)
                    .and_then(|v| v.leg(target.leg))
            })
            .collect()
    }

    /// Final KPI report, once the run has finished
    pub fn report(&self) -> Option<&KpiReport> {
        self.report.as_ref()
    }

    /// KPI report of the run so far
    pub fn current_report(&self) -> KpiReport {
        KpiReport::compute(&self.state, &self.command_center, self.current_tick())
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot::capture(self)
    }

    /// No request open and the emission window has passed
    pub fn is_finished(&self) -> bool {
        self.state.open_request_count() == 0 && self.current_tick() > self.config.max_ticks
    }

    // ========================================================================
    // Tick Loop Implementation
    // ========================================================================

    /// Execute one simulation tick
    ///
    /// # Tick Loop Steps
    ///
    /// 1. Clients emit due requests in activation order (only while
    ///    `now < max_ticks`); each is completed on the spot when origin and
    ///    destination coincide, otherwise submitted to the command center
    /// 2. Vehicles step their state machines in activation order; completed
    ///    legs close out their requests
    /// 3. The command center prunes and re-sorts its committed legs
    /// 4. The clock advances; the KPI report is computed on finish
    ///
    /// # Errors
    ///
    /// Any error is fatal: the orchestrator halts and every later call
    /// returns [`SimulationError::Halted`].
    pub fn tick(&mut self) -> Result<TickResult, SimulationError> {
        if self.halted {
            return Err(SimulationError::Halted);
        }

        let now = self.current_tick();
        match self.step(now) {
            Ok(result) => {
                self.time_manager.advance_tick();
                if self.report.is_none() && self.is_finished() {
                    let report = self.current_report();
                    info!(
                        tick = self.current_tick(),
                        fulfilled = self.metrics().fulfilled,
                        undeliverable = self.metrics().undeliverable,
                        "simulation finished"
                    );
                    self.report = Some(report);
                }
                Ok(result)
            }
            Err(err) => {
                self.halted = true;
                error!(tick = now, error = %err, "simulation halted");
                Err(err)
            }
        }
    }

    /// Tick until finished
    ///
    /// # Errors
    ///
    /// * `DrainLimitExceeded` - requests still open after
    ///   `max_ticks + drain_ticks`
    /// * any error from [`Orchestrator::tick`]
    pub fn run(&mut self) -> Result<KpiReport, SimulationError> {
        let limit = self.config.max_ticks + self.config.drain_ticks;
        while !self.is_finished() {
            let tick = self.current_tick();
            if tick > limit {
                return Err(SimulationError::DrainLimitExceeded { tick });
            }
            self.tick()?;
        }
        Ok(self
            .report
            .clone()
            .unwrap_or_else(|| self.current_report()))
    }

    fn step(&mut self, now: usize) -> Result<TickResult, SimulationError> {
        let mut result = TickResult {
            tick: now,
            ..TickResult::default()
        };

        if now < self.config.max_ticks {
            self.emit_demand(now, &mut result)?;
        }
        self.move_vehicles(now, &mut result)?;
        self.command_center.end_of_tick(&self.state);

        Ok(result)
    }

    fn emit_demand(&mut self, now: usize, result: &mut TickResult) -> Result<(), SimulationError> {
        let ctx = AuctionContext {
            tables: &self.cost_tables,
            policy: self.config.delivery_policy,
            weights: self.config.decision_weights,
            now,
        };

        for &client in &self.client_order {
            for request in self.demand.emit(client, now)? {
                let id = request.id();
                self.event_log.log(Event::RequestCreated {
                    tick: now,
                    request: id,
                    origin: request.origin(),
                    destination: request.destination(),
                    deadline: request.deadline_tick(),
                    urgency: request.urgency(),
                });
                result.requests_created += 1;

                if request.needs_no_delivery() {
                    let location = request.origin();
                    self.state.add_request(request);
                    self.state.complete_directly(id, now)?;
                    self.event_log.log(Event::DirectlyPerformed {
                        tick: now,
                        request: id,
                        location,
                    });
                    result.directly_performed += 1;
                    continue;
                }

                self.state.add_request(request);
                let outcome = self.command_center.submit(
                    &mut self.state,
                    id,
                    &self.vehicle_order,
                    &ctx,
                    &mut self.event_log,
                )?;
                match outcome {
                    Dispatch::Consolidated(_) => result.consolidated += 1,
                    Dispatch::Committed { .. } => result.auctions_won += 1,
                    Dispatch::Undeliverable { .. } => result.undeliverable += 1,
                }
            }
        }
        Ok(())
    }

    fn move_vehicles(&mut self, now: usize, result: &mut TickResult) -> Result<(), SimulationError> {
        for &id in &self.vehicle_order {
            let vehicle = self
                .state
                .vehicle_mut(id)
                .ok_or(SimulationError::VehicleNotFound(id))?;
            let class = vehicle.class();
            let outcome = vehicle.advance(now, &self.config.delays, &mut self.rng)?;
            let (status, empty, mode) = (vehicle.status(), vehicle.is_empty(), vehicle.mode());
            let location = vehicle.location();

            match outcome {
                StepOutcome::Waiting | StepOutcome::Moving => {}
                StepOutcome::Departed { leg } => {
                    self.event_log.log(Event::VehicleDeparted {
                        tick: now,
                        vehicle: id,
                        leg,
                        loaded: !empty,
                    });
                    result.departures += 1;
                }
                StepOutcome::Delayed { leg, propagation } => {
                    let new_eta = self
                        .state
                        .vehicle(id)
                        .and_then(Vehicle::eta)
                        .unwrap_or(now);
                    self.state
                        .metrics_mut()
                        .record_delay(class, propagation.sampled);
                    self.event_log.log(Event::VehicleDelayed {
                        tick: now,
                        vehicle: id,
                        leg,
                        delay: propagation.sampled,
                        legs_shifted: propagation.shifts.len(),
                        new_eta,
                    });
                    debug!(vehicle = %id, %leg, delay = propagation.sampled, "delay cascaded");
                    result.delays += 1;
                }
                StepOutcome::Arrived { leg } => {
                    self.event_log.log(Event::VehicleArrived {
                        tick: now,
                        vehicle: id,
                        leg: leg.id(),
                        location,
                    });
                    result.arrivals += 1;
                    result.requests_completed += leg.requests().len();
                    self.state
                        .complete_leg(id, class, leg, now, &mut self.event_log)?;
                }
            }

            self.state
                .metrics_mut()
                .record_activity(class, status, empty, mode);
        }
        Ok(())
    }
}
