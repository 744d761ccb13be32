//! Demand emission module for deterministic request creation.
//!
//! Demand is injected, not generated: an external step produces a schedule
//! of pending requests, each keyed by the client (origin location) and the
//! tick at which that client emits it. This module indexes the schedule per
//! client and turns due entries into [`Request`]s.
//!
//! # Key Principles
//!
//! 1. **Determinism**: no randomness; emission order is client activation
//!    order, then schedule order within a client and tick
//! 2. **Per-Client Index**: each client only sees its own entries
//! 3. **Bounded Emission**: clients stop emitting once the emission window is
//!    spent (enforced by the orchestrator)
//!
//! # Example
//!
//! ```
//! use fleet_dispatch_core_rs::arrivals::{DemandEntry, DemandSchedule};
//! use fleet_dispatch_core_rs::models::request::Urgency;
//!
//! let entries = vec![DemandEntry {
//!     id: 1,
//!     tick: 5,
//!     origin: 0,
//!     destination: 1,
//!     deadline: 65,
//!     urgency: Urgency::Urgent,
//!     mass: 2.0,
//!     volume: 1.0,
//! }];
//! let schedule = DemandSchedule::new(2, &entries);
//! assert_eq!(schedule.due(0, 5).len(), 1);
//! assert!(schedule.due(1, 5).is_empty());
//! ```

use crate::models::request::{Request, RequestError, RequestId, Urgency};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One pending request in the injected demand schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandEntry {
    /// Unique request identifier
    pub id: u64,

    /// Emission tick
    pub tick: usize,

    /// Emitting client (location index)
    pub origin: usize,

    /// Target location index
    pub destination: usize,

    /// Absolute deadline tick
    pub deadline: usize,

    pub urgency: Urgency,

    #[serde(default)]
    pub mass: f64,

    #[serde(default)]
    pub volume: f64,
}

impl DemandEntry {
    /// Materialise as an open request created at `tick`
    pub fn to_request(&self, tick: usize) -> Result<Request, RequestError> {
        Request::new(
            RequestId(self.id),
            self.origin,
            self.destination,
            tick,
            self.deadline,
            self.urgency,
            self.mass,
            self.volume,
        )
    }
}

/// Demand schedule indexed by client, then emission tick
#[derive(Debug, Clone, Default)]
pub struct DemandSchedule {
    by_client: Vec<BTreeMap<usize, Vec<DemandEntry>>>,
    total: usize,
}

impl DemandSchedule {
    /// Index `entries` for `num_clients` clients
    ///
    /// Entries whose origin is out of range are ignored; configuration
    /// validation rejects them before this point.
    pub fn new(num_clients: usize, entries: &[DemandEntry]) -> Self {
        let mut by_client = vec![BTreeMap::<usize, Vec<DemandEntry>>::new(); num_clients];
        let mut total = 0;

        for entry in entries {
            if let Some(client) = by_client.get_mut(entry.origin) {
                client.entry(entry.tick).or_default().push(entry.clone());
                total += 1;
            }
        }

        Self { by_client, total }
    }

    /// Entries `client` emits at `tick`, in schedule order
    pub fn due(&self, client: usize, tick: usize) -> &[DemandEntry] {
        self.by_client
            .get(client)
            .and_then(|ticks| ticks.get(&tick))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Requests `client` emits at `tick`
    pub fn emit(&self, client: usize, tick: usize) -> Result<Vec<Request>, RequestError> {
        self.due(client, tick)
            .iter()
            .map(|entry| entry.to_request(tick))
            .collect()
    }

    /// Number of scheduled entries
    pub fn total(&self) -> usize {
        self.total
    }

    /// Entries scheduled at or after `tick`
    pub fn pending_from(&self, tick: usize) -> usize {
        self.by_client
            .iter()
            .flat_map(|ticks| ticks.range(tick..))
            .map(|(_, entries)| entries.len())
            .sum()
    }

    pub fn num_clients(&self) -> usize {
        self.by_client.len()
    }
}
