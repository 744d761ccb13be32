//! Event logging for simulation replay and auditing.
//!
//! This module defines the Event enum which captures every dispatch decision
//! and vehicle state change during a run. Events enable:
//! - Debugging (understand which vehicle took which request and when)
//! - Auditing (check no request was silently dropped)
//! - Determinism checks (two runs with the same seed log identical events)
//!
//! # Event Types
//!
//! Events are categorized by simulation phase:
//! - **Demand**: request created, or completed on the spot
//! - **Dispatch**: consolidation, auction outcome, leg commitment
//! - **Movement**: departure, delay, arrival
//! - **Completion**: request delivered
//!
//! # Example
//!
//! ```rust
//! use fleet_dispatch_core_rs::models::event::Event;
//! use fleet_dispatch_core_rs::models::request::{RequestId, Urgency};
//!
//! let event = Event::RequestCreated {
//!     tick: 10,
//!     request: RequestId(42),
//!     origin: 0,
//!     destination: 3,
//!     deadline: 130,
//!     urgency: Urgency::SemiUrgent,
//! };
//!
//! println!("Event at tick {}: {:?}", event.tick(), event);
//! ```

use crate::models::request::{RequestId, Urgency};
use crate::models::schedule::LegId;
use crate::models::vehicle::VehicleId;
use crate::policy::DeliveryMode;
use serde::Serialize;

/// Simulation event capturing a state change.
///
/// All events include a tick number for temporal ordering.
/// Events are logged in the order they occur within a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A client emitted a request
    RequestCreated {
        tick: usize,
        request: RequestId,
        origin: usize,
        destination: usize,
        deadline: usize,
        urgency: Urgency,
    },

    /// Request needed no transport (origin equals destination)
    DirectlyPerformed {
        tick: usize,
        request: RequestId,
        location: usize,
    },

    /// Request attached to an already committed leg
    RequestConsolidated {
        tick: usize,
        request: RequestId,
        vehicle: VehicleId,
        leg: LegId,
    },

    /// Auction finished collecting bids
    BidsCollected {
        tick: usize,
        request: RequestId,
        bids: usize,
        on_time: usize,
        winner: Option<VehicleId>,
        winning_score: Option<f64>,
    },

    /// Leg appended to a vehicle itinerary
    LegCommitted {
        tick: usize,
        vehicle: VehicleId,
        leg: LegId,
        origin: usize,
        destination: usize,
        departure: usize,
        arrival: usize,
        mode: DeliveryMode,
        request: Option<RequestId>,
    },

    /// No vehicle could deliver in time; request abandoned
    RequestUndeliverable {
        tick: usize,
        request: RequestId,
        bids: usize,
    },

    VehicleDeparted {
        tick: usize,
        vehicle: VehicleId,
        leg: LegId,
        loaded: bool,
    },

    /// Delay sampled at the scheduled eta and cascaded
    VehicleDelayed {
        tick: usize,
        vehicle: VehicleId,
        leg: LegId,
        delay: usize,
        legs_shifted: usize,
        new_eta: usize,
    },

    VehicleArrived {
        tick: usize,
        vehicle: VehicleId,
        leg: LegId,
        location: usize,
    },

    /// Request delivered by a completed leg
    RequestCompleted {
        tick: usize,
        request: RequestId,
        vehicle: VehicleId,
        delivery_time: usize,
        overdue: bool,
    },
}

impl Event {
    /// Get the tick number when this event occurred
    pub fn tick(&self) -> usize {
        match self {
            Event::RequestCreated { tick, .. } => *tick,
            Event::DirectlyPerformed { tick, .. } => *tick,
            Event::RequestConsolidated { tick, .. } => *tick,
            Event::BidsCollected { tick, .. } => *tick,
            Event::LegCommitted { tick, .. } => *tick,
            Event::RequestUndeliverable { tick, .. } => *tick,
            Event::VehicleDeparted { tick, .. } => *tick,
            Event::VehicleDelayed { tick, .. } => *tick,
            Event::VehicleArrived { tick, .. } => *tick,
            Event::RequestCompleted { tick, .. } => *tick,
        }
    }

    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::RequestCreated { .. } => "RequestCreated",
            Event::DirectlyPerformed { .. } => "DirectlyPerformed",
            Event::RequestConsolidated { .. } => "RequestConsolidated",
            Event::BidsCollected { .. } => "BidsCollected",
            Event::LegCommitted { .. } => "LegCommitted",
            Event::RequestUndeliverable { .. } => "RequestUndeliverable",
            Event::VehicleDeparted { .. } => "VehicleDeparted",
            Event::VehicleDelayed { .. } => "VehicleDelayed",
            Event::VehicleArrived { .. } => "VehicleArrived",
            Event::RequestCompleted { .. } => "RequestCompleted",
        }
    }

    /// Request the event relates to, if any
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Event::RequestCreated { request, .. }
            | Event::DirectlyPerformed { request, .. }
            | Event::RequestConsolidated { request, .. }
            | Event::BidsCollected { request, .. }
            | Event::RequestUndeliverable { request, .. }
            | Event::RequestCompleted { request, .. } => Some(*request),
            Event::LegCommitted { request, .. } => *request,
            _ => None,
        }
    }

    /// Vehicle the event relates to, if any
    pub fn vehicle_id(&self) -> Option<VehicleId> {
        match self {
            Event::RequestConsolidated { vehicle, .. }
            | Event::LegCommitted { vehicle, .. }
            | Event::VehicleDeparted { vehicle, .. }
            | Event::VehicleDelayed { vehicle, .. }
            | Event::VehicleArrived { vehicle, .. }
            | Event::RequestCompleted { vehicle, .. } => Some(*vehicle),
            Event::BidsCollected { winner, .. } => *winner,
            _ => None,
        }
    }
}

/// Event log for storing and querying simulation events.
///
/// This is a simple wrapper around Vec<Event> with convenience methods.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Get the number of events logged
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get all events
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get events for a specific tick
    pub fn events_at_tick(&self, tick: usize) -> Vec<&Event> {
        self.events.iter().filter(|e| e.tick() == tick).collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events for a specific request
    pub fn events_for_request(&self, request: RequestId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.request_id() == Some(request))
            .collect()
    }

    /// Get events for a specific vehicle
    pub fn events_for_vehicle(&self, vehicle: VehicleId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.vehicle_id() == Some(vehicle))
            .collect()
    }
}
