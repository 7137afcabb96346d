// src/host/mod.rs
//! The seam between the bridge and the managed runtime it calls into.
//!
//! `HostRuntime` exposes the handful of primitives every service call is built
//! from: resolve classes and methods, invoke them, build and read strings, and
//! observe the pending exception. Everything above this trait (converters,
//! dispatcher, handle cache) is written once against it.

pub mod memory;

#[cfg(target_os = "android")]
pub mod jni;

use crate::error::BridgeResult;
use crate::value::ReturnShape;

/// Result of asking the host to attach the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// The thread was attached by this call and must be detached later.
    New,
    /// The thread was already attached.
    Existing,
}

/// Raw value returned by a host call, before conversion.
#[derive(Debug)]
pub enum HostReturn<L> {
    Void,
    Boolean(bool),
    Int(i32),
    /// Object return; may be a null reference.
    Object(L),
}

/// One marshaled argument, borrowing any references from the caller's frame.
pub enum HostValue<'a, H: HostRuntime + ?Sized> {
    Int(i32),
    Double(f64),
    Object(&'a H::Local),
    Global(&'a H::Global),
}

impl<H: HostRuntime + ?Sized> Clone for HostValue<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H: HostRuntime + ?Sized> Copy for HostValue<'_, H> {}

pub trait HostRuntime: Send + Sync + 'static {
    /// Long-lived reference valid on every thread (classes, app context).
    type Global: Send + Sync;
    /// Reference valid only on the creating thread until deleted.
    type Local;
    type Method: Copy + Send + Sync;
    type StaticMethod: Copy + Send + Sync;

    fn attach_current_thread(&self) -> BridgeResult<Attach>;

    fn detach_current_thread(&self);

    fn find_class(&self, name: &str) -> BridgeResult<Self::Global>;

    fn find_method(
        &self,
        class: &Self::Global,
        name: &str,
        signature: &str,
    ) -> BridgeResult<Self::Method>;

    fn find_static_method(
        &self,
        class: &Self::Global,
        name: &str,
        signature: &str,
    ) -> BridgeResult<Self::StaticMethod>;

    /// Invoke an instance method. A host exception leaves the exception
    /// pending; callers must drain it with [`HostRuntime::take_exception`].
    fn call_method(
        &self,
        instance: &Self::Local,
        method: Self::Method,
        shape: ReturnShape,
        args: &[HostValue<'_, Self>],
    ) -> BridgeResult<HostReturn<Self::Local>>;

    fn call_static(
        &self,
        class: &Self::Global,
        method: Self::StaticMethod,
        shape: ReturnShape,
        args: &[HostValue<'_, Self>],
    ) -> BridgeResult<HostReturn<Self::Local>>;

    /// Invoke a no-argument static accessor returning an object, such as a
    /// singleton getter. The returned reference may be null.
    fn call_getter(
        &self,
        class: &Self::Global,
        getter: Self::StaticMethod,
    ) -> BridgeResult<Self::Local>;

    fn new_string(&self, value: &str) -> BridgeResult<Self::Local>;

    fn new_string_array(&self, values: &[String]) -> BridgeResult<Self::Local>;

    /// Read a non-null host string.
    fn read_string(&self, value: &Self::Local) -> BridgeResult<String>;

    fn is_null(&self, value: &Self::Local) -> bool;

    /// Release a transient reference.
    fn delete_local(&self, value: Self::Local);

    /// Return and clear the pending exception of the calling thread.
    fn take_exception(&self) -> Option<Self::Local>;

    /// Human-readable description (`toString()`) of a throwable.
    fn describe(&self, throwable: &Self::Local) -> BridgeResult<String>;
}
