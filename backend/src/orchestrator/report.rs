//! End-of-run KPI report
//!
//! A flat, ordered `name -> value` mapping over the fleet metrics and the
//! command center counters, plus the heatmap matrices when tracked. Keys are
//! dotted: `requests.*`, `costs.*`, `dispatch.*`, and one `<class>.*` group
//! per vehicle class. Averages with no samples are left out.

use crate::dispatch::CommandCenter;
use crate::models::state::SimulationState;
use crate::policy::DeliveryMode;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiReport {
    pub final_tick: usize,
    pub metrics: BTreeMap<String, f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement: Option<Vec<Vec<u64>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliveries: Option<Vec<Vec<u64>>>,
}

impl KpiReport {
    pub fn compute(state: &SimulationState, command_center: &CommandCenter, now: usize) -> Self {
        let fleet = state.metrics();
        let counters = command_center.counters();
        let mut metrics = BTreeMap::new();
        let mut put = |key: String, value: f64| {
            metrics.insert(key, value);
        };

        put("requests.created".into(), fleet.requests_created as f64);
        put("requests.fulfilled".into(), fleet.fulfilled as f64);
        put("requests.undeliverable".into(), fleet.undeliverable as f64);
        put("requests.directly_performed".into(), fleet.directly_performed as f64);
        put("requests.overdue".into(), fleet.overdue() as f64);
        put("requests.open".into(), state.open_request_count() as f64);
        put(
            "requests.late_open".into(),
            state.late_open_request_count(now) as f64,
        );
        if let Some(ratio) = fleet.overdue_ratio() {
            put("requests.overdue_ratio".into(), ratio);
        }
        if let Some(avg) = fleet.average_delivery_time() {
            put("requests.average_delivery_time".into(), avg);
        }
        for mode in DeliveryMode::ALL {
            if let Some(avg) = fleet.average_delivery_time_for_mode(mode) {
                put(format!("requests.average_delivery_time.{mode}"), avg);
            }
        }

        put("costs.fixed".into(), fleet.fixed_costs);
        put("costs.labour".into(), fleet.labour_costs);
        put("costs.variable".into(), fleet.variable_costs());
        put("costs.total".into(), fleet.total_costs());

        put("dispatch.auctions".into(), counters.auctions as f64);
        put("dispatch.consolidations".into(), counters.consolidations as f64);
        put("dispatch.legs_committed".into(), counters.legs_committed as f64);
        put("dispatch.non_idle_winners".into(), counters.non_idle_winners as f64);

        let mut total_risk = 0.0;
        let mut total_emission = 0.0;
        for (class, m) in fleet.classes() {
            total_risk += m.totals.risk;
            total_emission += m.totals.emission_kg;

            put(format!("{class}.vehicles"), m.vehicles as f64);
            put(format!("{class}.fixed_cost"), m.fixed_cost);
            put(format!("{class}.variable_cost"), m.totals.cost);
            put(format!("{class}.risk"), m.totals.risk);
            put(format!("{class}.emission_kg"), m.totals.emission_kg);
            put(format!("{class}.distance_km"), m.totals.distance_km);
            put(format!("{class}.legs_completed"), m.legs_completed as f64);
            put(format!("{class}.deliveries"), m.deliveries as f64);
            put(format!("{class}.overdue"), m.overdue as f64);
            put(format!("{class}.idle_ticks"), m.idle_ticks as f64);
            put(format!("{class}.delayed_ticks"), m.delayed_ticks as f64);
            put(format!("{class}.delays_sampled"), m.delays_sampled as f64);
            put(format!("{class}.delay_ticks"), m.delay_ticks as f64);
            put(format!("{class}.consolidation.1"), m.consolidation.single as f64);
            put(format!("{class}.consolidation.2"), m.consolidation.double as f64);
            put(format!("{class}.consolidation.3"), m.consolidation.triple as f64);
            put(format!("{class}.consolidation.more"), m.consolidation.more as f64);
            if let Some(avg) = m.overall_average_delivery_time() {
                put(format!("{class}.average_delivery_time"), avg);
            }

            for mode in DeliveryMode::ALL {
                let count = |ticks: &BTreeMap<DeliveryMode, usize>| {
                    ticks.get(&mode).copied().unwrap_or(0) as f64
                };
                put(format!("{class}.empty_ticks.{mode}"), count(&m.empty_ticks));
                put(format!("{class}.loaded_ticks.{mode}"), count(&m.loaded_ticks));
                put(
                    format!("{class}.deliveries.{mode}"),
                    m.delivery_times.get(&mode).map_or(0, Vec::len) as f64,
                );
                if let Some(avg) = m.average_delivery_time(mode) {
                    put(format!("{class}.average_delivery_time.{mode}"), avg);
                }
            }
        }
        put("risk.total".into(), total_risk);
        put("emission_kg.total".into(), total_emission);

        Self {
            final_tick: now,
            metrics,
            movement: fleet.movement_matrix().map(|m| m.rows()),
            deliveries: fleet.delivery_matrix().map(|m| m.rows()),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    /// `key: value` lines in key order
    pub fn summary(&self) -> String {
        let mut out = format!("final_tick: {}\n", self.final_tick);
        for (key, value) in &self.metrics {
            out.push_str(&format!("{key}: {value}\n"));
        }
        out
    }
}
