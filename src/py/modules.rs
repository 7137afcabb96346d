// src/py/modules.rs
//! Module registration.
//!
//! Every service becomes one Python module whose functions are closures over
//! the shared bridge. `install` builds them all, plus the `snakei` diagnostics
//! module, and makes them importable through `sys.modules`.
#![allow(non_local_definitions)]

use std::sync::Arc;

use pyo3::prelude::*;
use pyo3::types::{PyCFunction, PyDict, PyList, PyTuple};
use pyo3::wrap_pyfunction;

use super::args;
use super::convert::{exceptions, json_to_py, result_to_py};
use crate::bridge::Bridge;
use crate::cache::{Exposure, OperationSpec, ServiceSpec};
use crate::host::HostRuntime;

#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

fn operation_fn<'py, H: HostRuntime>(
    py: Python<'py>,
    bridge: &Arc<Bridge<H>>,
    service: &'static str,
    op: &'static OperationSpec,
) -> PyResult<&'py PyCFunction> {
    let bridge = Arc::clone(bridge);
    PyCFunction::new_closure(
        py,
        Some(op.name),
        None,
        move |args: &PyTuple, kwargs: Option<&PyDict>| -> PyResult<PyObject> {
            let py = args.py();
            let host_args = args::bind(service, op, args, kwargs)?;
            let result = if bridge.config().release_gil {
                py.allow_threads(|| bridge.call(service, op.name, host_args))
            } else {
                bridge.call(service, op.name, host_args)
            };
            result_to_py(py, result?)
        },
    )
}

/// Build the module for one service. Operations disabled at init are still
/// registered; calling them raises with the lookup reason.
pub fn service_module<'py, H: HostRuntime>(
    py: Python<'py>,
    bridge: &Arc<Bridge<H>>,
    spec: &'static ServiceSpec,
) -> PyResult<&'py PyModule> {
    let m = PyModule::new(py, spec.name)?;
    for op in spec.operations.iter().filter(|op| op.exposure == Exposure::Script) {
        m.add_function(operation_fn(py, bridge, spec.name, op)?)?;
    }
    Ok(m)
}

fn populate_module<H: HostRuntime>(m: &PyModule, bridge: &Arc<Bridge<H>>) -> PyResult<()> {
    let py = m.py();
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add("HostError", py.get_type::<exceptions::HostError>())?;
    m.add("BridgeError", py.get_type::<exceptions::BridgeError>())?;

    let b = Arc::clone(bridge);
    let services = PyCFunction::new_closure(
        py,
        Some("services"),
        Some("Names of the services with a resolved host class."),
        move |args: &PyTuple, _kwargs: Option<&PyDict>| -> PyResult<PyObject> {
            let names: Vec<String> = b.report().available.into_iter().map(|s| s.service).collect();
            Ok(PyList::new(args.py(), names).into())
        },
    )?;
    m.add_function(services)?;

    let b = Arc::clone(bridge);
    let unavailable = PyCFunction::new_closure(
        py,
        Some("unavailable"),
        Some("Services and operations disabled at init, with the reason."),
        move |args: &PyTuple, _kwargs: Option<&PyDict>| -> PyResult<PyObject> {
            let py = args.py();
            let value = serde_json::to_value(b.report().unavailable)
                .map_err(crate::error::BridgeError::from)?;
            json_to_py(py, &value)
        },
    )?;
    m.add_function(unavailable)?;
    Ok(())
}

/// Build the `snakei` diagnostics module for `bridge`.
pub fn make_module<H: HostRuntime>(py: Python<'_>, bridge: &Arc<Bridge<H>>) -> PyResult<Py<PyModule>> {
    let m = PyModule::new(py, "snakei")?;
    populate_module(m, bridge)?;
    Ok(m.into())
}

/// Register every service module and `snakei` in `sys.modules`.
pub fn install<H: HostRuntime>(py: Python<'_>, bridge: Arc<Bridge<H>>) -> PyResult<()> {
    let modules: &PyDict = py.import("sys")?.getattr("modules")?.downcast()?;
    modules.set_item("snakei", make_module(py, &bridge)?)?;
    for spec in bridge.specs() {
        modules.set_item(spec.name, service_module(py, &bridge, spec)?)?;
    }
    tracing::info!(modules = bridge.specs().len() + 1, "python modules installed");
    Ok(())
}
