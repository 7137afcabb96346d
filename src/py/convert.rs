// src/py/convert.rs
//! Conversions between bridge values and Python objects.
#![allow(non_local_definitions)]

use pyo3::exceptions::{PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use serde_json::Value;

use crate::error::BridgeError;
use crate::value::CallResult;

/// Exception types exported by the `snakei` module.
pub mod exceptions {
    use pyo3::create_exception;
    use pyo3::exceptions::{PyException, PyRuntimeError};

    create_exception!(snakei, HostError, PyException, "Raised by the host service that was called.");
    create_exception!(snakei, BridgeError, PyRuntimeError, "The bridge could not complete the call.");
}

impl From<BridgeError> for PyErr {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::HostException { description } => exceptions::HostError::new_err(description),
            BridgeError::Usage(msg) => PyTypeError::new_err(msg),
            BridgeError::Decode(msg) => PyValueError::new_err(format!("malformed structured result: {msg}")),
            other => exceptions::BridgeError::new_err(other.to_string()),
        }
    }
}

/// Decode a JSON value into native Python objects.
pub fn json_to_py(py: Python<'_>, value: &Value) -> PyResult<PyObject> {
    Ok(match value {
        Value::Null => py.None(),
        Value::Bool(b) => (*b).into_py(py),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into_py(py)
            } else if let Some(u) = n.as_u64() {
                u.into_py(py)
            } else {
                n.as_f64().unwrap_or(f64::NAN).into_py(py)
            }
        }
        Value::String(s) => s.as_str().into_py(py),
        Value::Array(items) => {
            let list = PyList::empty(py);
            for item in items {
                list.append(json_to_py(py, item)?)?;
            }
            list.into_py(py)
        }
        Value::Object(map) => {
            let dict = PyDict::new(py);
            for (k, v) in map {
                dict.set_item(k, json_to_py(py, v)?)?;
            }
            dict.into_py(py)
        }
    })
}

pub fn result_to_py(py: Python<'_>, result: CallResult) -> PyResult<PyObject> {
    Ok(match result {
        CallResult::None => py.None(),
        CallResult::Bool(b) => b.into_py(py),
        CallResult::Int(i) => i.into_py(py),
        CallResult::Str(s) => s.into_py(py),
        CallResult::Structured(v) => json_to_py(py, &v)?,
    })
}
