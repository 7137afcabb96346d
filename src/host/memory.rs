// src/host/memory.rs
//! In-process host runtime.
//!
//! Classes and methods are defined with Rust closures, so the whole bridge can
//! run off-device. The host also keeps the books a real VM would not show:
//! attach/detach counts, live and released transient references, double
//! releases, and calls made while an exception was still pending.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

use super::{Attach, HostReturn, HostRuntime, HostValue};
use crate::error::{BridgeError, BridgeResult};
use crate::signature::MethodSignature;
use crate::value::ReturnShape;

/// Argument as seen by a method behavior.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryArg {
    Int(i32),
    Double(f64),
    Str(String),
    StrList(Vec<String>),
    Context,
    /// Instance of the named class.
    Object(String),
    Null,
}

impl MemoryArg {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MemoryArg::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// What a method behavior does when invoked.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Void,
    Bool(bool),
    Int(i32),
    Str(String),
    /// A null object return.
    Null,
    /// A fresh instance of the method's own class (singleton getters).
    Instance,
    /// Raise; the string is the throwable's `toString()`.
    Throw(String),
}

impl Outcome {
    pub fn json(value: &Value) -> Self {
        Outcome::Str(value.to_string())
    }

    pub fn throw(description: impl Into<String>) -> Self {
        Outcome::Throw(description.into())
    }
}

pub type Behavior = Arc<dyn Fn(&[MemoryArg]) -> Outcome + Send + Sync>;

/// Long-lived reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryRef(u64);

/// Transient reference; id 0 is null.
#[derive(Debug, PartialEq, Eq)]
pub struct MemoryLocal(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMethod(u64);

#[derive(Debug, Clone)]
enum Object {
    Class(String),
    Instance(String),
    Str(String),
    StrArray(Vec<String>),
    Throwable(String),
    Context,
}

struct Slot {
    object: Object,
    local: bool,
}

struct MethodEntry {
    class: String,
    name: String,
    signature: MethodSignature,
    is_static: bool,
    behavior: Behavior,
}

/// A call observed by the host, for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub class: String,
    pub method: String,
    pub args: Vec<MemoryArg>,
}

/// Bookkeeping counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub attaches: usize,
    pub detaches: usize,
    pub locals_created: usize,
    pub locals_deleted: usize,
    pub double_deletes: usize,
    pub calls_with_pending_exception: usize,
}

pub struct MemoryHost {
    next_id: AtomicU64,
    heap: DashMap<u64, Slot>,
    classes: DashMap<String, ()>,
    index: DashMap<(String, String, String, bool), u64>,
    methods: DashMap<u64, Arc<MethodEntry>>,
    attached: DashMap<ThreadId, ()>,
    pending: DashMap<ThreadId, u64>,
    refuse_attach: AtomicBool,
    stats: Mutex<MemoryStats>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            heap: DashMap::new(),
            classes: DashMap::new(),
            index: DashMap::new(),
            methods: DashMap::new(),
            attached: DashMap::new(),
            pending: DashMap::new(),
            refuse_attach: AtomicBool::new(false),
            stats: Mutex::new(MemoryStats::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Define a plain class (static methods only, no singleton getter).
    pub fn define_class(&self, class: &str) -> ClassBuilder<'_> {
        self.classes.insert(class.to_string(), ());
        ClassBuilder {
            host: self,
            class: class.to_string(),
        }
    }

    /// Define a service class with a `getInstance()` singleton getter.
    pub fn define_service(&self, class: &str) -> ClassBuilder<'_> {
        let getter = format!("()L{class};");
        self.define_class(class)
            .static_method("getInstance", &getter, |_| Outcome::Instance)
    }

    /// Create an application context and return a long-lived reference to it.
    pub fn new_context(&self) -> MemoryRef {
        MemoryRef(self.alloc(Object::Context, false))
    }

    /// Make subsequent attach attempts fail.
    pub fn refuse_attach(&self, refuse: bool) {
        self.refuse_attach.store(refuse, Ordering::SeqCst);
    }

    pub fn stats(&self) -> MemoryStats {
        self.stats.lock().clone()
    }

    /// Transient references created and not yet released.
    pub fn live_locals(&self) -> usize {
        self.heap.iter().filter(|s| s.local).count()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    /// Whether an exception is pending on the calling thread.
    pub fn has_pending_exception(&self) -> bool {
        self.pending.contains_key(&thread::current().id())
    }

    fn register(&self, class: &str, name: &str, signature: &str, is_static: bool, behavior: Behavior) {
        let parsed = match signature.parse::<MethodSignature>() {
            Ok(sig) => sig,
            Err(e) => {
                // left undefined; lookups report it as missing
                tracing::warn!(class, name, error = %e, "memory host: skipping method");
                return;
            }
        };
        let key = (class.to_string(), name.to_string(), signature.to_string(), is_static);
        // redefinition keeps the id so resolved handles see the new behavior
        let id = *self
            .index
            .entry(key)
            .or_insert_with(|| self.next_id.fetch_add(1, Ordering::SeqCst));
        self.methods.insert(
            id,
            Arc::new(MethodEntry {
                class: class.to_string(),
                name: name.to_string(),
                signature: parsed,
                is_static,
                behavior,
            }),
        );
    }

    fn alloc(&self, object: Object, local: bool) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.heap.insert(id, Slot { object, local });
        if local {
            self.stats.lock().locals_created += 1;
        }
        id
    }

    fn require_attached(&self) -> BridgeResult<ThreadId> {
        let tid = thread::current().id();
        if self.attached.contains_key(&tid) {
            Ok(tid)
        } else {
            Err(BridgeError::Interop(format!("thread {tid:?} is not attached")))
        }
    }

    fn object(&self, id: u64) -> Option<Object> {
        self.heap.get(&id).map(|s| s.object.clone())
    }

    fn class_name(&self, class: &MemoryRef) -> BridgeResult<String> {
        match self.object(class.0) {
            Some(Object::Class(name)) => Ok(name),
            _ => Err(BridgeError::Interop(format!("{class:?} is not a class reference"))),
        }
    }

    fn resolve_arg(&self, id: u64) -> BridgeResult<MemoryArg> {
        if id == 0 {
            return Ok(MemoryArg::Null);
        }
        Ok(match self.object(id) {
            Some(Object::Str(s)) => MemoryArg::Str(s),
            Some(Object::StrArray(v)) => MemoryArg::StrList(v),
            Some(Object::Context) => MemoryArg::Context,
            Some(Object::Instance(c)) | Some(Object::Class(c)) => MemoryArg::Object(c),
            Some(Object::Throwable(d)) => MemoryArg::Object(d),
            None => return Err(BridgeError::Interop(format!("stale reference #{id}"))),
        })
    }

    fn lookup(&self, class: &MemoryRef, name: &str, signature: &str, is_static: bool) -> BridgeResult<u64> {
        self.require_attached()?;
        let class_name = self.class_name(class)?;
        let key = (class_name.clone(), name.to_string(), signature.to_string(), is_static);
        self.index.get(&key).map(|id| *id).ok_or_else(|| BridgeError::MethodLookup {
            class: class_name,
            method: name.to_string(),
            signature: signature.to_string(),
            reason: format!("java.lang.NoSuchMethodError: {name}{signature}"),
        })
    }

    fn invoke(
        &self,
        method: u64,
        is_static: bool,
        instance: Option<&MemoryLocal>,
        shape: ReturnShape,
        args: &[HostValue<'_, Self>],
    ) -> BridgeResult<HostReturn<MemoryLocal>> {
        let tid = self.require_attached()?;
        if self.pending.contains_key(&tid) {
            self.stats.lock().calls_with_pending_exception += 1;
        }
        let entry = self
            .methods
            .get(&method)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| BridgeError::Interop(format!("unknown method id {method}")))?;
        if entry.is_static != is_static {
            return Err(BridgeError::Interop(format!(
                "{}.{} called with the wrong dispatch kind",
                entry.class, entry.name
            )));
        }
        if !entry.signature.ret.fits(shape) {
            return Err(BridgeError::Interop(format!(
                "{}.{} returns `{}`, called as {}",
                entry.class,
                entry.name,
                entry.signature.ret,
                shape.name()
            )));
        }
        if entry.signature.params.len() != args.len() {
            return Err(BridgeError::Interop(format!(
                "{}.{} takes {} argument(s), got {}",
                entry.class,
                entry.name,
                entry.signature.params.len(),
                args.len()
            )));
        }
        if let Some(instance) = instance {
            match self.object(instance.0) {
                Some(Object::Instance(c)) if c == entry.class => {}
                _ => {
                    return Err(BridgeError::Interop(format!(
                        "{}.{} invoked on an invalid instance",
                        entry.class, entry.name
                    )))
                }
            }
        }

        let mut resolved = Vec::with_capacity(args.len());
        for arg in args {
            resolved.push(match arg {
                HostValue::Int(i) => MemoryArg::Int(*i),
                HostValue::Double(d) => MemoryArg::Double(*d),
                HostValue::Object(local) => self.resolve_arg(local.0)?,
                HostValue::Global(global) => self.resolve_arg(global.0)?,
            });
        }
        self.calls.lock().push(RecordedCall {
            class: entry.class.clone(),
            method: entry.name.clone(),
            args: resolved.clone(),
        });

        let outcome = (entry.behavior)(&resolved);
        let ret = match (outcome, shape) {
            (Outcome::Throw(description), _) => {
                let id = self.alloc(Object::Throwable(description), true);
                self.pending.insert(tid, id);
                // like JNI, the nominal return is meaningless once thrown
                match shape {
                    ReturnShape::Void => HostReturn::Void,
                    ReturnShape::Boolean => HostReturn::Boolean(false),
                    ReturnShape::Int => HostReturn::Int(0),
                    ReturnShape::String | ReturnShape::Json => HostReturn::Object(MemoryLocal(0)),
                }
            }
            (Outcome::Void, ReturnShape::Void) => HostReturn::Void,
            (Outcome::Bool(b), ReturnShape::Boolean) => HostReturn::Boolean(b),
            (Outcome::Int(i), ReturnShape::Int) => HostReturn::Int(i),
            (Outcome::Str(s), ReturnShape::String | ReturnShape::Json) => {
                HostReturn::Object(MemoryLocal(self.alloc(Object::Str(s), true)))
            }
            (Outcome::Null, ReturnShape::String | ReturnShape::Json) => HostReturn::Object(MemoryLocal(0)),
            (outcome, shape) => {
                return Err(BridgeError::Interop(format!(
                    "{}.{} produced {outcome:?} for a {} call",
                    entry.class,
                    entry.name,
                    shape.name()
                )))
            }
        };
        Ok(ret)
    }

    fn invoke_getter(&self, method: u64) -> BridgeResult<MemoryLocal> {
        let tid = self.require_attached()?;
        if self.pending.contains_key(&tid) {
            self.stats.lock().calls_with_pending_exception += 1;
        }
        let entry = self
            .methods
            .get(&method)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| BridgeError::Interop(format!("unknown method id {method}")))?;
        if !entry.is_static || !entry.signature.params.is_empty() {
            return Err(BridgeError::Interop(format!(
                "{}.{} is not a static accessor",
                entry.class, entry.name
            )));
        }
        self.calls.lock().push(RecordedCall {
            class: entry.class.clone(),
            method: entry.name.clone(),
            args: Vec::new(),
        });
        Ok(match (entry.behavior)(&[]) {
            Outcome::Instance => MemoryLocal(self.alloc(Object::Instance(entry.class.clone()), true)),
            Outcome::Null => MemoryLocal(0),
            Outcome::Throw(description) => {
                let id = self.alloc(Object::Throwable(description), true);
                self.pending.insert(tid, id);
                MemoryLocal(0)
            }
            other => {
                return Err(BridgeError::Interop(format!(
                    "{}.{} produced {other:?} for an object call",
                    entry.class, entry.name
                )))
            }
        })
    }
}

/// Fluent definition of a host class.
pub struct ClassBuilder<'a> {
    host: &'a MemoryHost,
    class: String,
}

impl<'a> ClassBuilder<'a> {
    pub fn method<F>(self, name: &str, signature: &str, behavior: F) -> Self
    where
        F: Fn(&[MemoryArg]) -> Outcome + Send + Sync + 'static,
    {
        self.host
            .register(&self.class, name, signature, false, Arc::new(behavior));
        self
    }

    pub fn static_method<F>(self, name: &str, signature: &str, behavior: F) -> Self
    where
        F: Fn(&[MemoryArg]) -> Outcome + Send + Sync + 'static,
    {
        self.host
            .register(&self.class, name, signature, true, Arc::new(behavior));
        self
    }

    /// Make the singleton getter return `outcome` instead of an instance.
    pub fn getter(self, outcome: Outcome) -> Self {
        let signature = format!("()L{};", self.class);
        self.static_method("getInstance", &signature, move |_| outcome.clone())
    }
}

impl HostRuntime for MemoryHost {
    type Global = MemoryRef;
    type Local = MemoryLocal;
    type Method = MemoryMethod;
    type StaticMethod = MemoryMethod;

    fn attach_current_thread(&self) -> BridgeResult<Attach> {
        if self.refuse_attach.load(Ordering::SeqCst) {
            return Err(BridgeError::Attach("JNI_ERR".into()));
        }
        let tid = thread::current().id();
        if self.attached.insert(tid, ()).is_some() {
            return Ok(Attach::Existing);
        }
        self.stats.lock().attaches += 1;
        Ok(Attach::New)
    }

    fn detach_current_thread(&self) {
        if self.attached.remove(&thread::current().id()).is_some() {
            self.stats.lock().detaches += 1;
        }
    }

    fn find_class(&self, name: &str) -> BridgeResult<MemoryRef> {
        self.require_attached()?;
        if !self.classes.contains_key(name) {
            return Err(BridgeError::ClassLookup {
                class: name.to_string(),
                reason: format!("java.lang.NoClassDefFoundError: {name}"),
            });
        }
        Ok(MemoryRef(self.alloc(Object::Class(name.to_string()), false)))
    }

    fn find_method(&self, class: &MemoryRef, name: &str, signature: &str) -> BridgeResult<MemoryMethod> {
        self.lookup(class, name, signature, false).map(MemoryMethod)
    }

    fn find_static_method(
        &self,
        class: &MemoryRef,
        name: &str,
        signature: &str,
    ) -> BridgeResult<MemoryMethod> {
        self.lookup(class, name, signature, true).map(MemoryMethod)
    }

    fn call_method(
        &self,
        instance: &MemoryLocal,
        method: MemoryMethod,
        shape: ReturnShape,
        args: &[HostValue<'_, Self>],
    ) -> BridgeResult<HostReturn<MemoryLocal>> {
        self.invoke(method.0, false, Some(instance), shape, args)
    }

    fn call_static(
        &self,
        class: &MemoryRef,
        method: MemoryMethod,
        shape: ReturnShape,
        args: &[HostValue<'_, Self>],
    ) -> BridgeResult<HostReturn<MemoryLocal>> {
        self.class_name(class)?;
        self.invoke(method.0, true, None, shape, args)
    }

    fn call_getter(&self, class: &MemoryRef, getter: MemoryMethod) -> BridgeResult<MemoryLocal> {
        self.class_name(class)?;
        self.invoke_getter(getter.0)
    }

    fn new_string(&self, value: &str) -> BridgeResult<MemoryLocal> {
        self.require_attached()?;
        Ok(MemoryLocal(self.alloc(Object::Str(value.to_string()), true)))
    }

    fn new_string_array(&self, values: &[String]) -> BridgeResult<MemoryLocal> {
        self.require_attached()?;
        Ok(MemoryLocal(self.alloc(Object::StrArray(values.to_vec()), true)))
    }

    fn read_string(&self, value: &MemoryLocal) -> BridgeResult<String> {
        match self.object(value.0) {
            Some(Object::Str(s)) => Ok(s),
            _ => Err(BridgeError::Interop(format!("{value:?} is not a string"))),
        }
    }

    fn is_null(&self, value: &MemoryLocal) -> bool {
        value.0 == 0
    }

    fn delete_local(&self, value: MemoryLocal) {
        if value.0 == 0 {
            return;
        }
        let mut stats = self.stats.lock();
        match self.heap.remove(&value.0) {
            Some((_, slot)) if slot.local => stats.locals_deleted += 1,
            Some((id, slot)) => {
                // deleting a global through the local path is a bug; put it back
                self.heap.insert(id, slot);
                stats.double_deletes += 1;
            }
            None => stats.double_deletes += 1,
        }
    }

    fn take_exception(&self) -> Option<MemoryLocal> {
        self.pending
            .remove(&thread::current().id())
            .map(|(_, id)| MemoryLocal(id))
    }

    fn describe(&self, throwable: &MemoryLocal) -> BridgeResult<String> {
        match self.object(throwable.0) {
            Some(Object::Throwable(d)) => Ok(d),
            _ => Err(BridgeError::Interop(format!("{throwable:?} is not a throwable"))),
        }
    }
}
