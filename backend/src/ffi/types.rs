//! Type conversion utilities for FFI boundary
//!
//! Converts between Rust types and PyO3-compatible types (PyDict, PyErr).

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::orchestrator::{Scenario, SimulationError, TickResult};

/// Parse a scenario JSON document
///
/// # Errors
/// Returns PyValueError with the serde message if the document is malformed.
pub fn parse_scenario(json: &str) -> PyResult<Scenario> {
    serde_json::from_str(json)
        .map_err(|e| PyValueError::new_err(format!("Invalid scenario: {}", e)))
}

/// Configuration problems surface as ValueError, everything else as RuntimeError
pub fn simulation_error_to_py(err: SimulationError) -> PyErr {
    match err {
        SimulationError::InvalidConfig(_) | SimulationError::CostTable(_) => {
            PyValueError::new_err(err.to_string())
        }
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

pub fn json_error_to_py(err: serde_json::Error) -> PyErr {
    PyRuntimeError::new_err(format!("Serialization failed: {}", err))
}

/// Convert TickResult to a Python dict
pub fn tick_result_to_py(py: Python<'_>, result: &TickResult) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("tick", result.tick)?;
    dict.set_item("requests_created", result.requests_created)?;
    dict.set_item("directly_performed", result.directly_performed)?;
    dict.set_item("consolidated", result.consolidated)?;
    dict.set_item("auctions_won", result.auctions_won)?;
    dict.set_item("undeliverable", result.undeliverable)?;
    dict.set_item("departures", result.departures)?;
    dict.set_item("delays", result.delays)?;
    dict.set_item("arrivals", result.arrivals)?;
    dict.set_item("requests_completed", result.requests_completed)?;
    Ok(dict.unbind())
}
