// src/convert.rs
//! Type converters, one per return shape.
//!
//! Every converter runs the same protocol around a single host call: invoke,
//! drain any pending exception (which wins over whatever the call returned),
//! then interpret the raw return for its shape. Object returns are released
//! before the converter yields.

use crate::error::{BridgeError, BridgeResult};
use crate::host::{HostReturn, HostRuntime};
use crate::local::LocalRef;
use crate::translate;
use crate::value::{CallResult, ReturnShape};

/// Interpretation of a raw host return for one shape.
pub type Converter<H> = fn(&H, HostReturn<<H as HostRuntime>::Local>) -> BridgeResult<CallResult>;

/// Select the converter for `shape`.
pub fn for_shape<H: HostRuntime>(shape: ReturnShape) -> Converter<H> {
    match shape {
        ReturnShape::Void => convert_void::<H>,
        ReturnShape::Boolean => convert_boolean::<H>,
        ReturnShape::Int => convert_int::<H>,
        ReturnShape::String => convert_string::<H>,
        ReturnShape::Json => convert_json::<H>,
    }
}

/// Run `call` and convert its result with the converter for `shape`.
pub fn invoke_and_convert<H, F>(host: &H, shape: ReturnShape, call: F) -> BridgeResult<CallResult>
where
    H: HostRuntime,
    F: FnOnce(&H) -> BridgeResult<HostReturn<H::Local>>,
{
    let raw = call(host);
    if let Some(err) = translate::take_pending(host) {
        if let Ok(HostReturn::Object(local)) = raw {
            host.delete_local(local);
        }
        return Err(err);
    }
    for_shape::<H>(shape)(host, raw?)
}

fn mismatch<L>(expected: ReturnShape, raw: &HostReturn<L>) -> BridgeError {
    let got = match raw {
        HostReturn::Void => "void",
        HostReturn::Boolean(_) => "boolean",
        HostReturn::Int(_) => "int",
        HostReturn::Object(_) => "object",
    };
    BridgeError::Interop(format!("expected a {} return, host produced {got}", expected.name()))
}

fn release<H: HostRuntime>(host: &H, raw: HostReturn<H::Local>) {
    if let HostReturn::Object(local) = raw {
        host.delete_local(local);
    }
}

pub fn convert_void<H: HostRuntime>(host: &H, raw: HostReturn<H::Local>) -> BridgeResult<CallResult> {
    match raw {
        HostReturn::Void => Ok(CallResult::None),
        other => {
            let err = mismatch(ReturnShape::Void, &other);
            release(host, other);
            Err(err)
        }
    }
}

pub fn convert_boolean<H: HostRuntime>(host: &H, raw: HostReturn<H::Local>) -> BridgeResult<CallResult> {
    match raw {
        HostReturn::Boolean(b) => Ok(CallResult::Bool(b)),
        other => {
            let err = mismatch(ReturnShape::Boolean, &other);
            release(host, other);
            Err(err)
        }
    }
}

pub fn convert_int<H: HostRuntime>(host: &H, raw: HostReturn<H::Local>) -> BridgeResult<CallResult> {
    match raw {
        HostReturn::Int(i) => Ok(CallResult::Int(i)),
        other => {
            let err = mismatch(ReturnShape::Int, &other);
            release(host, other);
            Err(err)
        }
    }
}

/// Read a string return; `None` for a null reference.
fn read_text<H: HostRuntime>(
    host: &H,
    shape: ReturnShape,
    raw: HostReturn<H::Local>,
) -> BridgeResult<Option<String>> {
    let local = match raw {
        HostReturn::Object(local) => LocalRef::new(host, local),
        other => return Err(mismatch(shape, &other)),
    };
    if local.is_null() {
        return Ok(None);
    }
    host.read_string(local.as_local()).map(Some)
}

pub fn convert_string<H: HostRuntime>(host: &H, raw: HostReturn<H::Local>) -> BridgeResult<CallResult> {
    Ok(match read_text(host, ReturnShape::String, raw)? {
        Some(s) => CallResult::Str(s),
        None => CallResult::None,
    })
}

pub fn convert_json<H: HostRuntime>(host: &H, raw: HostReturn<H::Local>) -> BridgeResult<CallResult> {
    match read_text(host, ReturnShape::Json, raw)? {
        Some(text) => Ok(CallResult::Structured(serde_json::from_str(&text)?)),
        None => Ok(CallResult::None),
    }
}
