// src/translate.rs
//! Error translator: drains the host's pending exception into a `BridgeError`.

use crate::error::BridgeError;
use crate::host::HostRuntime;
use crate::local::LocalRef;

const UNDESCRIBED: &str = "host exception (no description available)";

/// Take and clear the pending exception of the calling thread, if any.
///
/// The throwable is described through its `toString()` and released before
/// returning, so the thread is clean for the next interop call. The resulting
/// description is never empty.
pub fn take_pending<H: HostRuntime>(host: &H) -> Option<BridgeError> {
    let throwable = LocalRef::new(host, host.take_exception()?);
    let description = match host.describe(throwable.as_local()) {
        Ok(d) if !d.trim().is_empty() => d,
        Ok(_) => UNDESCRIBED.to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "could not describe host exception");
            UNDESCRIBED.to_string()
        }
    };
    Some(BridgeError::HostException { description })
}
