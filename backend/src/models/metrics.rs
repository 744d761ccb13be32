//! Fleet KPI accumulators
//!
//! Every counter the run reports lives here, owned by the simulation state.
//! Each field has a single writer:
//! - vehicle activity counters: the orchestrator, once per vehicle per tick
//! - leg and delivery counters: leg close-out in the simulation state
//! - request outcome counters: the simulation state
//! - fixed and labour costs: orchestrator setup

use crate::costs::LegCost;
use crate::models::schedule::ScheduleItem;
use crate::models::vehicle::{VehicleClass, VehicleStatus};
use crate::policy::DeliveryMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dense origin × destination counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountMatrix {
    size: usize,
    counts: Vec<u64>,
}

impl CountMatrix {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            counts: vec![0; size * size],
        }
    }

    pub fn add(&mut self, origin: usize, destination: usize, n: u64) {
        if origin < self.size && destination < self.size {
            self.counts[origin * self.size + destination] += n;
        }
    }

    pub fn get(&self, origin: usize, destination: usize) -> u64 {
        if origin >= self.size || destination >= self.size {
            return 0;
        }
        self.counts[origin * self.size + destination]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Row-major nested vectors
    pub fn rows(&self) -> Vec<Vec<u64>> {
        if self.size == 0 {
            return Vec::new();
        }
        self.counts.chunks(self.size).map(<[u64]>::to_vec).collect()
    }
}

/// How many requests completed legs carried: 1, 2, 3 or more
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationHistogram {
    pub single: usize,
    pub double: usize,
    pub triple: usize,
    pub more: usize,
}

impl ConsolidationHistogram {
    pub fn record(&mut self, requests: usize) {
        match requests {
            0 => {}
            1 => self.single += 1,
            2 => self.double += 1,
            3 => self.triple += 1,
            _ => self.more += 1,
        }
    }
}

/// Per-class counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub vehicles: usize,
    pub idle_ticks: usize,
    pub delayed_ticks: usize,
    /// Ticks under way with nothing on board, per mode
    pub empty_ticks: BTreeMap<DeliveryMode, usize>,
    /// Ticks under way carrying requests, per mode
    pub loaded_ticks: BTreeMap<DeliveryMode, usize>,
    /// Variable cost, risk, emission and distance over completed legs
    pub totals: LegCost,
    pub legs_completed: usize,
    pub deliveries: usize,
    pub overdue: usize,
    /// `arrival - created` for every delivered request, per mode
    pub delivery_times: BTreeMap<DeliveryMode, Vec<usize>>,
    pub consolidation: ConsolidationHistogram,
    /// Sum of vehicle fixed costs
    pub fixed_cost: f64,
    pub delays_sampled: usize,
    pub delay_ticks: usize,
}

impl ClassMetrics {
    pub fn average_delivery_time(&self, mode: DeliveryMode) -> Option<f64> {
        mean(self.delivery_times.get(&mode)?)
    }

    /// Mean delivery time over both modes
    pub fn overall_average_delivery_time(&self) -> Option<f64> {
        let samples: Vec<usize> = self.delivery_times.values().flatten().copied().collect();
        mean(&samples)
    }
}

/// Fleet-wide KPI accumulators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetMetrics {
    aerial: ClassMetrics,
    ground: ClassMetrics,
    pub requests_created: usize,
    pub fulfilled: usize,
    pub undeliverable: usize,
    pub directly_performed: usize,
    /// Infrastructure (mission control, landing platforms) and vehicle fixed costs
    pub fixed_costs: f64,
    pub labour_costs: f64,
    movement: Option<CountMatrix>,
    deliveries: Option<CountMatrix>,
}

impl FleetMetrics {
    pub fn new(locations: usize, track_heatmap: bool) -> Self {
        Self {
            aerial: ClassMetrics::default(),
            ground: ClassMetrics::default(),
            requests_created: 0,
            fulfilled: 0,
            undeliverable: 0,
            directly_performed: 0,
            fixed_costs: 0.0,
            labour_costs: 0.0,
            movement: track_heatmap.then(|| CountMatrix::new(locations)),
            deliveries: track_heatmap.then(|| CountMatrix::new(locations)),
        }
    }

    pub fn class(&self, class: VehicleClass) -> &ClassMetrics {
        match class {
            VehicleClass::Aerial => &self.aerial,
            VehicleClass::Ground => &self.ground,
        }
    }

    pub(crate) fn class_mut(&mut self, class: VehicleClass) -> &mut ClassMetrics {
        match class {
            VehicleClass::Aerial => &mut self.aerial,
            VehicleClass::Ground => &mut self.ground,
        }
    }

    pub fn classes(&self) -> impl Iterator<Item = (VehicleClass, &ClassMetrics)> {
        VehicleClass::ALL
            .into_iter()
            .map(move |class| (class, self.class(class)))
    }

    pub fn movement_matrix(&self) -> Option<&CountMatrix> {
        self.movement.as_ref()
    }

    pub fn delivery_matrix(&self) -> Option<&CountMatrix> {
        self.deliveries.as_ref()
    }

    /// One vehicle-tick of activity
    pub(crate) fn record_activity(
        &mut self,
        class: VehicleClass,
        status: VehicleStatus,
        empty: bool,
        mode: Option<DeliveryMode>,
    ) {
        let metrics = self.class_mut(class);
        match (status, mode) {
            (VehicleStatus::Idle, _) => metrics.idle_ticks += 1,
            (VehicleStatus::Delayed, _) => metrics.delayed_ticks += 1,
            (VehicleStatus::InTransit, Some(mode)) => {
                let counter = if empty {
                    &mut metrics.empty_ticks
                } else {
                    &mut metrics.loaded_ticks
                };
                *counter.entry(mode).or_default() += 1;
            }
            (VehicleStatus::InTransit, None) => {}
        }
    }

    /// Totals, histogram and heatmaps for a completed leg
    pub(crate) fn record_leg(&mut self, class: VehicleClass, leg: &ScheduleItem) {
        let carried = leg.requests().len();
        let metrics = self.class_mut(class);
        metrics.totals += *leg.cost();
        metrics.legs_completed += 1;
        metrics.consolidation.record(carried);

        if let Some(movement) = self.movement.as_mut() {
            movement.add(leg.origin(), leg.destination(), 1);
        }
        if carried > 0 {
            if let Some(deliveries) = self.deliveries.as_mut() {
                deliveries.add(leg.origin(), leg.destination(), carried as u64);
            }
        }
    }

    pub(crate) fn record_delivery(
        &mut self,
        class: VehicleClass,
        mode: DeliveryMode,
        delivery_time: usize,
        overdue: bool,
    ) {
        self.fulfilled += 1;
        let metrics = self.class_mut(class);
        metrics.deliveries += 1;
        if overdue {
            metrics.overdue += 1;
        }
        metrics
            .delivery_times
            .entry(mode)
            .or_default()
            .push(delivery_time);
    }

    pub(crate) fn record_delay(&mut self, class: VehicleClass, delay: usize) {
        let metrics = self.class_mut(class);
        metrics.delays_sampled += 1;
        metrics.delay_ticks += delay;
    }

    pub fn overdue(&self) -> usize {
        self.classes().map(|(_, m)| m.overdue).sum()
    }

    /// Share of fulfilled requests delivered after their deadline
    pub fn overdue_ratio(&self) -> Option<f64> {
        (self.fulfilled > 0).then(|| self.overdue() as f64 / self.fulfilled as f64)
    }

    pub fn variable_costs(&self) -> f64 {
        self.classes().map(|(_, m)| m.totals.cost).sum()
    }

    pub fn total_costs(&self) -> f64 {
        self.fixed_costs + self.labour_costs + self.variable_costs()
    }

    /// Mean delivery time over every delivered request
    pub fn average_delivery_time(&self) -> Option<f64> {
        let samples: Vec<usize> = self
            .classes()
            .flat_map(|(_, m)| m.delivery_times.values().flatten().copied())
            .collect();
        mean(&samples)
    }

    /// Mean delivery time per mode, over every class
    pub fn average_delivery_time_for_mode(&self, mode: DeliveryMode) -> Option<f64> {
        let samples: Vec<usize> = self
            .classes()
            .filter_map(|(_, m)| m.delivery_times.get(&mode))
            .flatten()
            .copied()
            .collect();
        mean(&samples)
    }
}

fn mean(samples: &[usize]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<usize>() as f64 / samples.len() as f64)
}
