// src/py/script.rs
//! Running scripts in `__main__`.
//!
//! Uncaught exceptions are formatted with `traceback` and logged through
//! `tracing`; on a device there is no stderr to print them to.

use std::path::Path;

use pyo3::exceptions::PySystemExit;
use pyo3::prelude::*;

/// Run `source` as `__main__`. Returns true if it finished without an
/// uncaught exception (a `SystemExit` with status 0 or `None` counts as clean).
pub fn run_source(py: Python<'_>, source: &str, filename: &str) -> bool {
    match exec_main(py, source, filename) {
        Ok(()) => true,
        Err(err) => report(py, filename, err),
    }
}

/// Read and run the script at `path`.
pub fn run_file(py: Python<'_>, path: &Path) -> bool {
    let filename = path.display().to_string();
    match std::fs::read_to_string(path) {
        Ok(source) => run_source(py, &source, &filename),
        Err(e) => {
            tracing::error!(script = %filename, error = %e, "cannot read script");
            false
        }
    }
}

fn exec_main(py: Python<'_>, source: &str, filename: &str) -> PyResult<()> {
    let globals = py.import("__main__")?.dict();
    globals.set_item("__file__", filename)?;
    let builtins = py.import("builtins")?;
    let code = builtins.getattr("compile")?.call1((source, filename, "exec"))?;
    builtins.getattr("exec")?.call1((code, globals))?;
    Ok(())
}

fn report(py: Python<'_>, filename: &str, err: PyErr) -> bool {
    if err.is_instance_of::<PySystemExit>(py) {
        let code = err.value(py).getattr("code").ok();
        let clean = match code {
            None => true,
            Some(c) if c.is_none() => true,
            Some(c) => c.extract::<i64>().map(|c| c == 0).unwrap_or(false),
        };
        if clean {
            return true;
        }
    }
    let text = format_exception(py, &err).unwrap_or_else(|_| err.to_string());
    tracing::error!(script = filename, "uncaught exception\n{}", text.trim_end());
    false
}

fn format_exception(py: Python<'_>, err: &PyErr) -> PyResult<String> {
    let traceback = py.import("traceback")?;
    let lines: Vec<String> = traceback
        .getattr("format_exception")?
        .call1((err.get_type(py), err.value(py), err.traceback(py)))?
        .extract()?;
    Ok(lines.concat())
}
