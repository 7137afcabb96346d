// src/android/mod.rs
//! Android entry points.
//!
//! `JNI_OnLoad` runs on the Java thread calling `System.loadLibrary`, whose
//! class loader can see the app's service classes, so the whole handle cache
//! is populated there. The resulting bridge is process-wide.

use std::os::raw::c_void;
use std::sync::Arc;

use jni::objects::{JClass, JObject};
use jni::sys::{jboolean, jint, JNI_ERR, JNI_FALSE, JNI_TRUE, JNI_VERSION_1_6};
use jni::{JNIEnv, JavaVM};
use once_cell::sync::OnceCell;

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::host::jni::JniHost;
use crate::services::STANDARD_SERVICES;

static BRIDGE: OnceCell<Arc<Bridge<JniHost>>> = OnceCell::new();

fn load(vm: *mut jni::sys::JavaVM) -> BridgeResult<()> {
    let config = BridgeConfig::from_env();
    #[cfg(feature = "logging")]
    crate::logging::init_logging(&config);

    // SAFETY: the pointer comes straight from the VM calling JNI_OnLoad.
    let vm = unsafe { JavaVM::from_raw(vm) }.map_err(|e| BridgeError::Interop(format!("JavaVM: {e}")))?;
    let bridge = Bridge::new(Arc::new(JniHost::new(vm)), config, &STANDARD_SERVICES)?;
    BRIDGE
        .set(Arc::new(bridge))
        .map_err(|_| BridgeError::Interop("bridge already loaded".into()))
}

#[no_mangle]
pub extern "system" fn JNI_OnLoad(vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
    match load(vm) {
        Ok(()) => JNI_VERSION_1_6,
        Err(e) => {
            tracing::error!(error = %e, "snakei failed to load");
            JNI_ERR
        }
    }
}

/// The process-wide bridge installed by `JNI_OnLoad`.
pub fn bridge() -> BridgeResult<&'static Arc<Bridge<JniHost>>> {
    BRIDGE
        .get()
        .ok_or_else(|| BridgeError::Interop("bridge not loaded".into()))
}

/// Promote `context` to a global reference and store it as the application
/// context.
pub fn set_context(env: &mut JNIEnv<'_>, context: &JObject<'_>) -> BridgeResult<()> {
    let global = env
        .new_global_ref(context)
        .map_err(|e| BridgeError::Interop(format!("new_global_ref: {e}")))?;
    bridge()?.set_context(global)
}

/// Register the Python modules of the process-wide bridge.
#[cfg(feature = "pyo3")]
pub fn install_modules(py: pyo3::Python<'_>) -> pyo3::PyResult<()> {
    crate::py::install(py, Arc::clone(bridge()?))
}

fn report(what: &str, result: BridgeResult<()>) -> jboolean {
    match result {
        Ok(()) => JNI_TRUE,
        Err(e) => {
            tracing::warn!(error = %e, "{what} failed");
            JNI_FALSE
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_com_snakei_SnakeiBridge_setContext(
    mut env: JNIEnv<'_>,
    _class: JClass<'_>,
    context: JObject<'_>,
) -> jboolean {
    report("setContext", set_context(&mut env, &context))
}

#[no_mangle]
pub extern "system" fn Java_com_snakei_SnakeiBridge_startServices(_env: JNIEnv<'_>, _class: JClass<'_>) -> jboolean {
    report("startServices", bridge().and_then(|b| b.start_services()))
}

#[no_mangle]
pub extern "system" fn Java_com_snakei_SnakeiBridge_stopServices(_env: JNIEnv<'_>, _class: JClass<'_>) -> jboolean {
    report("stopServices", bridge().and_then(|b| b.stop_services()))
}
