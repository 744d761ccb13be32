//! Checkpoint - Deterministic Schedule Snapshot
//!
//! Captures every committed and completed leg, every closed request and the
//! dispatch counters of a run in a serializable form, and fingerprints it
//! with SHA-256. Two runs from the same seed, config and demand produce the
//! same fingerprint at every tick.
//!
//! # Critical Invariants
//!
//! - **Determinism**: Same seed + config produces identical fingerprints
//! - **Request Conservation**: created = open + completed + undeliverable
//! - **Single Assignment**: no request rides on two legs
//! - **Capacity**: no leg carries more requests than its vehicle's capacity
//! - **Config Matching**: a snapshot names the config hash it came from

use crate::costs::LegCost;
use crate::dispatch::DispatchCounters;
use crate::models::request::{Request, RequestId};
use crate::models::schedule::{LegId, ScheduleItem};
use crate::models::vehicle::{Vehicle, VehicleClass, VehicleId, VehicleStatus};
use crate::orchestrator::{Orchestrator, SimulationError};
use crate::policy::DeliveryMode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Complete schedule snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    /// Current tick position
    pub current_tick: usize,

    /// RNG state at time of snapshot
    pub rng_state: u64,

    pub vehicles: Vec<VehicleSnapshot>,

    /// Legs already driven or flown, in completion order
    pub completed_legs: Vec<LegSnapshot>,

    /// Closed-out requests in completion order
    pub completed: Vec<CompletedRequestSnapshot>,

    pub undeliverable: Vec<RequestId>,

    pub open: Vec<RequestId>,

    pub requests_created: usize,

    pub counters: DispatchCounters,

    /// SHA256 hash of original config (for validation)
    pub config_hash: String,
}

/// Vehicle state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub class: VehicleClass,
    pub status: VehicleStatus,
    pub location: usize,
    pub eta: Option<usize>,
    pub capacity: usize,
    pub itinerary: Vec<LegSnapshot>,
}

impl From<&Vehicle> for VehicleSnapshot {
    fn from(vehicle: &Vehicle) -> Self {
        VehicleSnapshot {
            id: vehicle.id(),
            class: vehicle.class(),
            status: vehicle.status(),
            location: vehicle.location(),
            eta: vehicle.eta(),
            capacity: vehicle.capacity(),
            itinerary: vehicle.itinerary().iter().map(LegSnapshot::from).collect(),
        }
    }
}

/// Leg snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegSnapshot {
    pub id: LegId,
    pub vehicle: VehicleId,
    pub origin: usize,
    pub destination: usize,
    pub departure: usize,
    pub arrival: usize,
    pub mode: DeliveryMode,
    pub requests: Vec<RequestId>,
    pub cost: LegCost,
    pub total_delay: usize,
}

impl From<&ScheduleItem> for LegSnapshot {
    fn from(leg: &ScheduleItem) -> Self {
        LegSnapshot {
            id: leg.id(),
            vehicle: leg.vehicle(),
            origin: leg.origin(),
            destination: leg.destination(),
            departure: leg.departure(),
            arrival: leg.arrival(),
            mode: leg.mode(),
            requests: leg.requests().to_vec(),
            cost: *leg.cost(),
            total_delay: leg.total_delay(),
        }
    }
}

/// Completed request snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRequestSnapshot {
    pub id: RequestId,
    pub arrival_tick: usize,
    pub delivery_time: usize,
    pub mode: Option<DeliveryMode>,
    pub served_by: Option<VehicleClass>,
    pub overdue: bool,
}

impl CompletedRequestSnapshot {
    fn from_request(request: &Request) -> Option<Self> {
        let completion = request.completion()?;
        Some(CompletedRequestSnapshot {
            id: request.id(),
            arrival_tick: completion.arrival_tick,
            delivery_time: completion.delivery_time,
            mode: completion.mode,
            served_by: completion.served_by,
            overdue: completion.overdue,
        })
    }
}

impl ScheduleSnapshot {
    pub fn capture(orchestrator: &Orchestrator) -> Self {
        let state = orchestrator.state();
        ScheduleSnapshot {
            current_tick: orchestrator.current_tick(),
            rng_state: orchestrator.rng_state(),
            vehicles: state.vehicles().iter().map(VehicleSnapshot::from).collect(),
            completed_legs: state.completed_legs().iter().map(LegSnapshot::from).collect(),
            completed: state
                .completed_requests()
                .iter()
                .filter_map(CompletedRequestSnapshot::from_request)
                .collect(),
            undeliverable: state.undeliverable_requests().iter().map(Request::id).collect(),
            open: state.open_requests().map(Request::id).collect(),
            requests_created: state.metrics().requests_created,
            counters: orchestrator.command_center().counters().clone(),
            config_hash: orchestrator.config_hash().to_string(),
        }
    }

    /// SHA-256 over the canonical JSON form of the snapshot
    pub fn fingerprint(&self) -> Result<String, SimulationError> {
        compute_config_hash(self)
    }

    /// Check conservation, single assignment and capacity
    pub fn validate(&self) -> Result<(), SimulationError> {
        // 1. Request conservation
        let accounted = self.open.len() + self.completed.len() + self.undeliverable.len();
        if accounted != self.requests_created {
            return Err(SimulationError::StateValidationError(format!(
                "request conservation violated: {} created, {} accounted for",
                self.requests_created, accounted
            )));
        }

        // 2. Single assignment and capacity
        let mut carried: BTreeMap<RequestId, LegId> = BTreeMap::new();
        let legs = self
            .vehicles
            .iter()
            .flat_map(|v| v.itinerary.iter().map(move |leg| (v.capacity, leg)));
        for (capacity, leg) in legs {
            if leg.requests.len() > capacity {
                return Err(SimulationError::StateValidationError(format!(
                    "{} carries {} requests, capacity {}",
                    leg.id,
                    leg.requests.len(),
                    capacity
                )));
            }
            for &request in &leg.requests {
                if let Some(previous) = carried.insert(request, leg.id) {
                    return Err(SimulationError::StateValidationError(format!(
                        "{request} attached to both {previous} and {}",
                        leg.id
                    )));
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of any serializable value
///
/// Uses canonical JSON serialization with sorted keys.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;

    let value = serde_json::to_value(config).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    // Recursively sort all object keys for canonical representation
    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_config_hash_deterministic() {
        #[derive(Serialize)]
        struct TestConfig {
            value: i32,
            name: String,
        }

        let hash1 = compute_config_hash(&TestConfig {
            value: 42,
            name: "test".to_string(),
        })
        .unwrap();
        let hash2 = compute_config_hash(&TestConfig {
            value: 42,
            name: "test".to_string(),
        })
        .unwrap();

        assert_eq!(hash1, hash2, "Same config should produce same hash");
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_compute_config_hash_different_for_different_configs() {
        #[derive(Serialize)]
        struct TestConfig {
            value: i32,
        }

        assert_ne!(
            compute_config_hash(&TestConfig { value: 42 }).unwrap(),
            compute_config_hash(&TestConfig { value: 43 }).unwrap()
        );
    }

    fn leg(id: u64, requests: Vec<u64>) -> LegSnapshot {
        LegSnapshot {
            id: LegId(id),
            vehicle: VehicleId(0),
            origin: 0,
            destination: 1,
            departure: 5,
            arrival: 10,
            mode: DeliveryMode::Safe,
            requests: requests.into_iter().map(RequestId).collect(),
            cost: LegCost::default(),
            total_delay: 0,
        }
    }

    fn snapshot(itinerary: Vec<LegSnapshot>, open: Vec<u64>, created: usize) -> ScheduleSnapshot {
        ScheduleSnapshot {
            current_tick: 3,
            rng_state: 1,
            vehicles: vec![VehicleSnapshot {
                id: VehicleId(0),
                class: VehicleClass::Ground,
                status: VehicleStatus::Idle,
                location: 0,
                eta: None,
                capacity: 2,
                itinerary,
            }],
            completed_legs: vec![],
            completed: vec![],
            undeliverable: vec![],
            open: open.into_iter().map(RequestId).collect(),
            requests_created: created,
            counters: DispatchCounters::default(),
            config_hash: "abc".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_consistent_snapshot() {
        assert!(snapshot(vec![leg(0, vec![1, 2])], vec![1, 2], 2).validate().is_ok());
    }

    #[test]
    fn test_validate_detects_lost_request() {
        assert!(matches!(
            snapshot(vec![], vec![1], 2).validate(),
            Err(SimulationError::StateValidationError(_))
        ));
    }

    #[test]
    fn test_validate_detects_double_assignment_and_overload() {
        let doubled = snapshot(vec![leg(0, vec![1]), leg(1, vec![1])], vec![1], 1);
        assert!(doubled.validate().is_err());

        let overloaded = snapshot(vec![leg(0, vec![1, 2, 3])], vec![1, 2, 3], 3);
        assert!(overloaded.validate().is_err());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = snapshot(vec![leg(0, vec![1])], vec![1], 1);
        let mut b = a.clone();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        b.vehicles[0].itinerary[0].arrival += 1;
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }
}
