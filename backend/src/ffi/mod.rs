//! Python binding for presentation collaborators
//!
//! Compiled only with the `pyo3` feature. Scenarios cross the boundary as
//! JSON strings; live queries come back as dicts or JSON.

pub mod orchestrator;
pub mod types;
