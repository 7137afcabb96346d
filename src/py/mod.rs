// src/py/mod.rs
//! Python surface of the bridge: one module per service plus `snakei`.
#![allow(non_local_definitions)]

pub mod args;
pub mod convert;
pub mod modules;
pub mod script;

// re-export the entry points used by the embedding side and tests
pub use convert::exceptions;
pub use modules::{install, make_module, service_module};
