// src/error.rs
//! Error taxonomy shared by every layer of the bridge.

use thiserror::Error;

/// Failures surfaced by the bridge.
///
/// Host-side exceptions are carried as their `toString()` description so the
/// calling script sees the same text the host produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// A host class could not be resolved while populating the handle cache.
    #[error("class `{class}` could not be resolved: {reason}")]
    ClassLookup { class: String, reason: String },

    /// A host method could not be resolved, or its descriptor disagrees with
    /// the declared operation.
    #[error("method `{class}.{method}{signature}` could not be resolved: {reason}")]
    MethodLookup {
        class: String,
        method: String,
        signature: String,
        reason: String,
    },

    /// The service was disabled at init time.
    #[error("service `{service}` is unavailable: {reason}")]
    ServiceUnavailable { service: String, reason: String },

    /// A single operation was disabled at init time.
    #[error("operation `{service}.{operation}` is unavailable: {reason}")]
    OperationUnavailable {
        service: String,
        operation: String,
        reason: String,
    },

    /// The service or operation name is not part of any registered table.
    #[error("unknown operation `{service}.{operation}`")]
    UnknownOperation { service: String, operation: String },

    /// The singleton accessor returned a null reference.
    #[error("singleton accessor of `{service}` returned null")]
    NullInstance { service: String },

    /// The invoked host method raised.
    #[error("{description}")]
    HostException { description: String },

    /// Wrong argument count, keyword or type from the embedding side.
    #[error("{0}")]
    Usage(String),

    /// The calling thread could not be attached to the host runtime.
    #[error("failed to attach thread to host runtime: {0}")]
    Attach(String),

    /// An operation needs the application context and none was set.
    #[error("no application context has been set")]
    MissingContext,

    /// A structured result was not valid JSON.
    #[error("malformed structured result: {0}")]
    Decode(String),

    /// Any other failure of the interop layer itself.
    #[error("interop failure: {0}")]
    Interop(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    /// True for failures recorded while resolving handles.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            BridgeError::ClassLookup { .. } | BridgeError::MethodLookup { .. }
        )
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Decode(e.to_string())
    }
}
