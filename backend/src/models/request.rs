//! Request model
//!
//! Represents one shipment need between two client sites.
//! Each request has:
//! - Origin and destination location indices
//! - Creation and deadline ticks
//! - Urgency class, mass and volume
//! - Status (Open, Assigned, Completed, Undeliverable)
//!
//! A request is created when its origin's demand schedule fires, is attached
//! to exactly one leg once dispatched, and is closed out when that leg
//! arrives. Requests that no vehicle can bid on become undeliverable.

use crate::costs::LegCost;
use crate::models::schedule::LegId;
use crate::models::vehicle::{VehicleClass, VehicleId};
use crate::policy::DeliveryMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Request identifier, taken from the demand schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Deadline class assigned by the demand generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    Urgent,
    SemiUrgent,
    SameDay,
}

/// Request lifecycle status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Waiting for dispatch
    Open,

    /// Attached to a committed leg
    Assigned { vehicle: VehicleId, leg: LegId },

    /// Delivered (or needed no delivery)
    Completed { tick: usize },

    /// No vehicle could bid; permanently abandoned
    Undeliverable { tick: usize },
}

/// How a request was closed out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub arrival_tick: usize,
    /// `arrival_tick - created_tick`
    pub delivery_time: usize,
    /// Even share of the carrying leg's cost, risk and emission
    pub share: LegCost,
    /// `None` when no delivery was needed
    pub mode: Option<DeliveryMode>,
    /// Delay accrued by the carrying leg
    pub delay: i64,
    pub served_by: Option<VehicleClass>,
    pub overdue: bool,
}

/// Errors that can occur during request lifecycle transitions
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("Request {id} is not open (status {status})")]
    NotOpen { id: RequestId, status: String },

    #[error("Request {id} already closed")]
    AlreadyClosed { id: RequestId },

    #[error("Request {id} is not in the open set")]
    Unknown { id: RequestId },

    #[error("Request {id} deadline {deadline} precedes creation tick {created}")]
    DeadlineBeforeCreation {
        id: RequestId,
        deadline: usize,
        created: usize,
    },
}

/// A shipment request
///
/// # Example
/// ```
/// use fleet_dispatch_core_rs::models::request::{Request, RequestId, Urgency};
///
/// let request = Request::new(RequestId(7), 0, 2, 30, 90, Urgency::Urgent, 20.0, 10.0).unwrap();
/// assert!(request.is_open());
/// assert!(!request.is_overdue_at(90));
/// assert!(request.is_overdue_at(91));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    id: RequestId,
    origin: usize,
    destination: usize,
    created_tick: usize,
    deadline_tick: usize,
    urgency: Urgency,
    mass: f64,
    volume: f64,
    status: RequestStatus,
    completion: Option<Completion>,
}

impl Request {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: RequestId,
        origin: usize,
        destination: usize,
        created_tick: usize,
        deadline_tick: usize,
        urgency: Urgency,
        mass: f64,
        volume: f64,
    ) -> Result<Self, RequestError> {
        if deadline_tick < created_tick {
            return Err(RequestError::DeadlineBeforeCreation {
                id,
                deadline: deadline_tick,
                created: created_tick,
            });
        }

        Ok(Self {
            id,
            origin,
            destination,
            created_tick,
            deadline_tick,
            urgency,
            mass,
            volume,
            status: RequestStatus::Open,
            completion: None,
        })
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn origin(&self) -> usize {
        self.origin
    }

    pub fn destination(&self) -> usize {
        self.destination
    }

    pub fn created_tick(&self) -> usize {
        self.created_tick
    }

    pub fn deadline_tick(&self) -> usize {
        self.deadline_tick
    }

    pub fn urgency(&self) -> Urgency {
        self.urgency
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn status(&self) -> &RequestStatus {
        &self.status
    }

    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, RequestStatus::Open)
    }

    /// Whether completion at `tick` would miss the deadline
    pub fn is_overdue_at(&self, tick: usize) -> bool {
        tick > self.deadline_tick
    }

    /// Origin and destination coincide, so nothing has to move
    pub fn needs_no_delivery(&self) -> bool {
        self.origin == self.destination
    }

    /// Attach to a committed leg
    pub fn assign(&mut self, vehicle: VehicleId, leg: LegId) -> Result<(), RequestError> {
        if !self.is_open() {
            return Err(RequestError::NotOpen {
                id: self.id,
                status: format!("{:?}", self.status),
            });
        }
        self.status = RequestStatus::Assigned { vehicle, leg };
        Ok(())
    }

    /// Close out with a delivery record
    pub fn complete(&mut self, completion: Completion) -> Result<(), RequestError> {
        if self.is_closed() {
            return Err(RequestError::AlreadyClosed { id: self.id });
        }
        self.status = RequestStatus::Completed {
            tick: completion.arrival_tick,
        };
        self.completion = Some(completion);
        Ok(())
    }

    /// Abandon after a failed auction
    pub fn mark_undeliverable(&mut self, tick: usize) -> Result<(), RequestError> {
        if !self.is_open() {
            return Err(RequestError::NotOpen {
                id: self.id,
                status: format!("{:?}", self.status),
            });
        }
        self.status = RequestStatus::Undeliverable { tick };
        Ok(())
    }

    fn is_closed(&self) -> bool {
        matches!(
            self.status,
            RequestStatus::Completed { .. } | RequestStatus::Undeliverable { .. }
        )
    }
}
