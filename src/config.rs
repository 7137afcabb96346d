// src/config.rs
//! Bridge configuration.
//!
//! Read from the process environment at load time, or from a JSON blob handed
//! over by the host application. Missing fields take their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

pub const ENV_STRICT_INIT: &str = "SNAKEI_STRICT_INIT";
pub const ENV_RELEASE_GIL: &str = "SNAKEI_RELEASE_GIL";
pub const ENV_LOG: &str = "SNAKEI_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Fail bridge construction on any class or method lookup failure
    /// instead of disabling the affected service or operation.
    pub strict_init: bool,
    /// Release the GIL while a host call runs.
    pub release_gil: bool,
    /// `tracing` filter directive used by `logging::init_logging`.
    pub log_filter: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            strict_init: false,
            release_gil: true,
            log_filter: "info".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_json(text: &str) -> BridgeResult<Self> {
        serde_json::from_str(text).map_err(|e| BridgeError::Usage(format!("invalid bridge config: {e}")))
    }

    /// Build from an arbitrary key lookup; unparsable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = lookup(ENV_STRICT_INIT).and_then(|v| parse_flag(&v)) {
            config.strict_init = v;
        }
        if let Some(v) = lookup(ENV_RELEASE_GIL).and_then(|v| parse_flag(&v)) {
            config.release_gil = v;
        }
        if let Some(v) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            config.log_filter = v;
        }
        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
