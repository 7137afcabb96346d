// src/lib.rs
//! snakei: embedded-Python bridge to Android platform services.
//!
//! Python scripts running inside an Android app call into Java services
//! (sensors, location, media, device info, UI output, process spawn) through
//! modules registered by this crate. The core is independent of both runtimes:
//! a [`host::HostRuntime`] seam, a handle cache populated from static service
//! tables, one generic dispatcher and a converter per return shape. The Python
//! layer (`py`, feature `pyo3`) and the JNI backend (`android`, Android only)
//! sit on top of it.

pub mod attach;
pub mod bridge;
pub mod cache;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod local;
pub mod services;
pub mod signature;
pub mod translate;
pub mod value;

#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "pyo3")]
pub mod py;

#[cfg(target_os = "android")]
pub mod android;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use value::{CallResult, HostArg};
