//! PyO3 wrapper for Orchestrator
//!
//! This module provides the Python interface to the Rust orchestrator.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::types::{json_error_to_py, parse_scenario, simulation_error_to_py, tick_result_to_py};
use crate::orchestrator::Orchestrator as RustOrchestrator;

/// Python wrapper for Rust Orchestrator
///
/// # Example (from Python)
///
/// ```python
/// from fleet_dispatch_core_rs import Orchestrator
///
/// orch = Orchestrator.new(open("scenario.json").read())
/// while True:
///     result = orch.tick()
///     views = json.loads(orch.vehicle_views_json())
///     if orch.is_finished():
///         break
/// print(orch.kpi_report_json())
/// ```
#[pyclass(name = "Orchestrator")]
pub struct PyOrchestrator {
    inner: RustOrchestrator,
}

#[pymethods]
impl PyOrchestrator {
    /// Create a new orchestrator from a scenario JSON document
    ///
    /// The document holds `config` and `cost_tables`.
    ///
    /// # Errors
    ///
    /// Raises ValueError on a malformed document or invalid configuration.
    #[staticmethod]
    fn new(scenario_json: &str) -> PyResult<Self> {
        let scenario = parse_scenario(scenario_json)?;
        let inner = scenario
            .into_orchestrator()
            .map_err(simulation_error_to_py)?;
        Ok(PyOrchestrator { inner })
    }

    /// Execute one simulation tick and return its counters
    fn tick(&mut self, py: Python<'_>) -> PyResult<Py<PyDict>> {
        let result = self.inner.tick().map_err(simulation_error_to_py)?;
        tick_result_to_py(py, &result)
    }

    /// Tick until finished; returns the KPI report as JSON
    fn run(&mut self) -> PyResult<String> {
        let report = self.inner.run().map_err(simulation_error_to_py)?;
        serde_json::to_string(&report).map_err(json_error_to_py)
    }

    fn current_tick(&self) -> usize {
        self.inner.current_tick()
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Status, position, mode and eta of every vehicle, as a JSON array
    fn vehicle_views_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.vehicle_views()).map_err(json_error_to_py)
    }

    /// `(name, open_demand)` per client, in location order
    fn client_open_demand(&self) -> Vec<(String, usize)> {
        self.inner
            .client_open_demand()
            .into_iter()
            .map(|client| (client.name, client.open_demand))
            .collect()
    }

    fn open_request_count(&self) -> usize {
        self.inner.open_request_count()
    }

    fn late_open_request_count(&self) -> usize {
        self.inner.late_open_request_count()
    }

    fn average_delivery_time(&self) -> Option<f64> {
        self.inner.average_delivery_time()
    }

    /// Final report once finished, otherwise the report so far
    fn kpi_report_json(&self) -> PyResult<String> {
        let report = self
            .inner
            .report()
            .cloned()
            .unwrap_or_else(|| self.inner.current_report());
        serde_json::to_string(&report).map_err(json_error_to_py)
    }

    /// Complete event log as a JSON array
    fn event_log_json(&self) -> PyResult<String> {
        serde_json::to_string(self.inner.event_log()).map_err(json_error_to_py)
    }
}
