// src/dispatch.rs
//! Call dispatcher.
//!
//! One call is: marshal the arguments into a frame of transient references,
//! fetch the live singleton through its getter, invoke and convert, then let
//! the guards release the instance and the frame. Cached class and method
//! handles are never released here.

use crate::convert;
use crate::error::{BridgeError, BridgeResult};
use crate::host::{HostRuntime, HostValue};
use crate::local::LocalRef;
use crate::translate;
use crate::value::{CallResult, HostArg, ReturnShape};

enum Slot {
    Int(i32),
    Double(f64),
    Local(usize),
    Context,
}

/// Host-side arguments for one call. Transient references built here are
/// released when the frame drops, whether the call succeeded or not.
pub struct ArgFrame<'h, H: HostRuntime> {
    locals: Vec<LocalRef<'h, H>>,
    slots: Vec<Slot>,
    context: Option<&'h H::Global>,
}

impl<'h, H: HostRuntime> ArgFrame<'h, H> {
    pub fn marshal(host: &'h H, args: &[HostArg], context: Option<&'h H::Global>) -> BridgeResult<Self> {
        let mut frame = Self {
            locals: Vec::new(),
            slots: Vec::with_capacity(args.len()),
            context,
        };
        for arg in args {
            let slot = match arg {
                HostArg::Int(i) => Slot::Int(*i),
                HostArg::Double(d) => Slot::Double(*d),
                HostArg::Str(s) => frame.push_local(host, host.new_string(s))?,
                HostArg::StrList(v) => frame.push_local(host, host.new_string_array(v))?,
                HostArg::Context if context.is_none() => return Err(BridgeError::MissingContext),
                HostArg::Context => Slot::Context,
            };
            frame.slots.push(slot);
        }
        Ok(frame)
    }

    fn push_local(&mut self, host: &'h H, made: BridgeResult<H::Local>) -> BridgeResult<Slot> {
        let local = match made {
            Ok(local) => local,
            Err(e) => return Err(translate::take_pending(host).unwrap_or(e)),
        };
        self.locals.push(LocalRef::new(host, local));
        Ok(Slot::Local(self.locals.len() - 1))
    }

    pub fn values(&self) -> BridgeResult<Vec<HostValue<'_, H>>> {
        self.slots
            .iter()
            .map(|slot| {
                Ok(match slot {
                    Slot::Int(i) => HostValue::Int(*i),
                    Slot::Double(d) => HostValue::Double(*d),
                    Slot::Local(i) => HostValue::Object(self.locals[*i].as_local()),
                    Slot::Context => HostValue::Global(self.context.ok_or(BridgeError::MissingContext)?),
                })
            })
            .collect()
    }

    /// Number of transient references the frame owns.
    pub fn transient_count(&self) -> usize {
        self.locals.len()
    }
}

/// Fetch the singleton through its getter.
pub fn with_instance<'h, H: HostRuntime>(
    host: &'h H,
    service: &str,
    class: &H::Global,
    getter: H::StaticMethod,
) -> BridgeResult<LocalRef<'h, H>> {
    let raw = host.call_getter(class, getter);
    if let Some(err) = translate::take_pending(host) {
        if let Ok(local) = raw {
            host.delete_local(local);
        }
        return Err(err);
    }
    let instance = LocalRef::new(host, raw?);
    if instance.is_null() {
        tracing::warn!(service, "singleton getter returned null");
        return Err(BridgeError::NullInstance {
            service: service.to_string(),
        });
    }
    Ok(instance)
}

/// Dispatch an instance operation.
#[allow(clippy::too_many_arguments)]
pub fn dispatch<H: HostRuntime>(
    host: &H,
    service: &str,
    class: &H::Global,
    getter: H::StaticMethod,
    method: H::Method,
    shape: ReturnShape,
    args: &[HostArg],
    context: Option<&H::Global>,
) -> BridgeResult<CallResult> {
    let frame = ArgFrame::marshal(host, args, context)?;
    let values = frame.values()?;
    let instance = with_instance(host, service, class, getter)?;
    convert::invoke_and_convert(host, shape, |h| {
        h.call_method(instance.as_local(), method, shape, &values)
    })
}

/// Dispatch a static operation.
pub fn dispatch_static<H: HostRuntime>(
    host: &H,
    class: &H::Global,
    method: H::StaticMethod,
    shape: ReturnShape,
    args: &[HostArg],
    context: Option<&H::Global>,
) -> BridgeResult<CallResult> {
    let frame = ArgFrame::marshal(host, args, context)?;
    let values = frame.values()?;
    convert::invoke_and_convert(host, shape, |h| h.call_static(class, method, shape, &values))
}
