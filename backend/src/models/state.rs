//! Simulation State
//!
//! The explicit simulation context: every location, vehicle, request and KPI
//! counter of a run, passed by reference to the components that need it.
//!
//! # Critical Invariants
//!
//! 1. **Request conservation**: every created request is in exactly one of
//!    the open set, the completed list or the undeliverable list
//! 2. **Open demand**: a location's open-demand counter equals the number of
//!    open requests originating there
//! 3. **Location indices**: `locations[i].index() == i`
//! 4. **Vehicle indices**: `vehicles[i].id() == VehicleId(i)`

use crate::models::event::{Event, EventLog};
use crate::models::location::Location;
use crate::models::metrics::FleetMetrics;
use crate::models::request::{Completion, Request, RequestError, RequestId};
use crate::models::schedule::ScheduleItem;
use crate::models::vehicle::{Vehicle, VehicleClass, VehicleId};
use std::collections::BTreeMap;

/// Complete simulation state
///
/// # Example
///
/// ```rust
/// use fleet_dispatch_core_rs::models::location::{Location, Point};
/// use fleet_dispatch_core_rs::SimulationState;
///
/// let locations = vec![
///     Location::new(0, "Hospital A", Point::new(0.0, 0.0)),
///     Location::new(1, "Lab B", Point::new(3.0, 4.0)),
/// ];
/// let state = SimulationState::new(locations, vec![], false);
/// assert_eq!(state.num_locations(), 2);
/// assert_eq!(state.open_request_count(), 0);
/// ```
#[derive(Debug)]
pub struct SimulationState {
    locations: Vec<Location>,
    vehicles: Vec<Vehicle>,

    /// Requests not yet completed or abandoned, keyed by id
    open_requests: BTreeMap<RequestId, Request>,

    /// Closed-out requests in completion order
    completed: Vec<Request>,

    /// Requests no vehicle could deliver in time
    undeliverable: Vec<Request>,

    /// Every leg that has been driven or flown, in completion order
    completed_legs: Vec<ScheduleItem>,

    metrics: FleetMetrics,
}

impl SimulationState {
    pub fn new(locations: Vec<Location>, vehicles: Vec<Vehicle>, track_heatmap: bool) -> Self {
        let metrics = FleetMetrics::new(locations.len(), track_heatmap);
        Self {
            locations,
            vehicles,
            open_requests: BTreeMap::new(),
            completed: Vec::new(),
            undeliverable: Vec::new(),
            completed_legs: Vec::new(),
            metrics,
        }
    }

    // Locations

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn location(&self, index: usize) -> Option<&Location> {
        self.locations.get(index)
    }

    pub fn num_locations(&self) -> usize {
        self.locations.len()
    }

    // Vehicles

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id.0)
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(id.0)
    }

    pub fn num_vehicles(&self) -> usize {
        self.vehicles.len()
    }

    // Requests

    pub fn open_requests(&self) -> impl Iterator<Item = &Request> {
        self.open_requests.values()
    }

    pub fn open_request(&self, id: RequestId) -> Option<&Request> {
        self.open_requests.get(&id)
    }

    pub(crate) fn open_request_mut(&mut self, id: RequestId) -> Option<&mut Request> {
        self.open_requests.get_mut(&id)
    }

    pub fn open_request_count(&self) -> usize {
        self.open_requests.len()
    }

    /// Open requests whose deadline has already passed at `now`
    pub fn late_open_request_count(&self, now: usize) -> usize {
        self.open_requests
            .values()
            .filter(|r| r.is_overdue_at(now))
            .count()
    }

    pub fn completed_requests(&self) -> &[Request] {
        &self.completed
    }

    pub fn undeliverable_requests(&self) -> &[Request] {
        &self.undeliverable
    }

    pub fn completed_legs(&self) -> &[ScheduleItem] {
        &self.completed_legs
    }

    pub fn metrics(&self) -> &FleetMetrics {
        &self.metrics
    }

    pub(crate) fn metrics_mut(&mut self) -> &mut FleetMetrics {
        &mut self.metrics
    }

    /// Register a newly emitted request
    pub(crate) fn add_request(&mut self, request: Request) {
        if let Some(origin) = self.locations.get_mut(request.origin()) {
            origin.open_request();
        }
        self.metrics.requests_created += 1;
        debug_assert!(
            !self.open_requests.contains_key(&request.id()),
            "duplicate request id {}",
            request.id()
        );
        self.open_requests.insert(request.id(), request);
    }

    /// Close a request that needed no transport
    pub(crate) fn complete_directly(
        &mut self,
        id: RequestId,
        now: usize,
    ) -> Result<(), RequestError> {
        let completion = Completion {
            arrival_tick: now,
            delivery_time: 0,
            share: Default::default(),
            mode: None,
            delay: 0,
            served_by: None,
            overdue: false,
        };
        self.close(id, completion, now)?;
        self.metrics.directly_performed += 1;
        Ok(())
    }

    /// Abandon an open request
    pub(crate) fn mark_undeliverable(
        &mut self,
        id: RequestId,
        now: usize,
    ) -> Result<(), RequestError> {
        let mut request = self
            .open_requests
            .remove(&id)
            .ok_or(RequestError::Unknown { id })?;
        request.mark_undeliverable(now)?;
        if let Some(origin) = self.locations.get_mut(request.origin()) {
            origin.close_request(None);
        }
        self.metrics.undeliverable += 1;
        self.undeliverable.push(request);
        Ok(())
    }

    /// Close out a leg a vehicle just completed
    ///
    /// Adds the leg's totals to its class, then splits cost, risk and
    /// emission evenly over the attached requests and completes each one.
    pub(crate) fn complete_leg(
        &mut self,
        vehicle: VehicleId,
        class: VehicleClass,
        leg: ScheduleItem,
        now: usize,
        events: &mut EventLog,
    ) -> Result<(), RequestError> {
        self.metrics.record_leg(class, &leg);

        let share = leg.completion_share();
        for &id in leg.requests() {
            let request = self
                .open_requests
                .get(&id)
                .ok_or(RequestError::Unknown { id })?;
            let created = request.created_tick();
            let overdue = request.is_overdue_at(now);
            let delivery_time = now.saturating_sub(created);

            self.close(
                id,
                Completion {
                    arrival_tick: now,
                    delivery_time,
                    share,
                    mode: Some(leg.mode()),
                    delay: leg.total_delay() as i64,
                    served_by: Some(class),
                    overdue,
                },
                now,
            )?;
            self.metrics
                .record_delivery(class, leg.mode(), delivery_time, overdue);

            events.log(Event::RequestCompleted {
                tick: now,
                request: id,
                vehicle,
                delivery_time,
                overdue,
            });
        }

        self.completed_legs.push(leg);
        Ok(())
    }

    fn close(
        &mut self,
        id: RequestId,
        completion: Completion,
        now: usize,
    ) -> Result<(), RequestError> {
        let mut request = self
            .open_requests
            .remove(&id)
            .ok_or(RequestError::Unknown { id })?;
        let margin = request.deadline_tick() as i64 - now as i64;
        request.complete(completion)?;
        if let Some(origin) = self.locations.get_mut(request.origin()) {
            origin.close_request(Some(margin));
        }
        self.completed.push(request);
        Ok(())
    }
}
