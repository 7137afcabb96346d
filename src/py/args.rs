// src/py/args.rs
//! Positional and keyword argument binding for service functions.

use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyString, PyTuple};

use crate::cache::OperationSpec;
use crate::error::BridgeError;
use crate::value::{HostArg, Param, ParamKind};

fn usage(service: &str, op: &OperationSpec, msg: impl std::fmt::Display) -> PyErr {
    BridgeError::Usage(format!("{service}.{}(): {msg}", op.name)).into()
}

/// Bind `args`/`kwargs` to the operation's script-supplied parameters.
pub fn bind(
    service: &str,
    op: &OperationSpec,
    args: &PyTuple,
    kwargs: Option<&PyDict>,
) -> PyResult<Vec<HostArg>> {
    let params: Vec<&Param> = op.script_params().collect();
    if args.len() > params.len() {
        return Err(usage(
            service,
            op,
            format!("takes {} positional argument(s) but {} were given", params.len(), args.len()),
        ));
    }

    let mut slots: Vec<Option<&PyAny>> = vec![None; params.len()];
    for (slot, value) in slots.iter_mut().zip(args.iter()) {
        *slot = Some(value);
    }
    if let Some(kwargs) = kwargs {
        for (key, value) in kwargs.iter() {
            let key: &str = key.extract()?;
            let pos = params
                .iter()
                .position(|p| p.name == key)
                .ok_or_else(|| usage(service, op, format!("unexpected keyword argument `{key}`")))?;
            if slots[pos].is_some() {
                return Err(usage(service, op, format!("got multiple values for argument `{key}`")));
            }
            slots[pos] = Some(value);
        }
    }

    params
        .iter()
        .zip(slots)
        .map(|(param, slot)| match slot {
            Some(value) => extract(service, op, param, value),
            None => Err(usage(service, op, format!("missing required argument `{}`", param.name))),
        })
        .collect()
}

fn extract(service: &str, op: &OperationSpec, param: &Param, value: &PyAny) -> PyResult<HostArg> {
    let wrong = || {
        let ty = value
            .get_type()
            .name()
            .map(str::to_string)
            .unwrap_or_else(|_| "?".into());
        usage(service, op, format!("argument `{}` must be {}, not {ty}", param.name, expected(param.kind)))
    };
    let is_bool = value.downcast::<PyBool>().is_ok();
    Ok(match param.kind {
        ParamKind::Int if !is_bool => HostArg::Int(value.extract().map_err(|_| wrong())?),
        ParamKind::Double if !is_bool => HostArg::Double(value.extract().map_err(|_| wrong())?),
        ParamKind::Str => HostArg::Str(value.extract().map_err(|_| wrong())?),
        ParamKind::StrList if value.downcast::<PyString>().is_err() => {
            HostArg::StrList(value.extract().map_err(|_| wrong())?)
        }
        _ => return Err(wrong()),
    })
}

fn expected(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::Int => "int",
        ParamKind::Double => "float",
        ParamKind::Str => "str",
        ParamKind::StrList => "a list of str",
        ParamKind::Context => "context",
    }
}
