// src/cache.rs
//! Handle cache.
//!
//! Services are declared as static [`ServiceSpec`] tables. Populating the cache
//! resolves each table once: the class, the singleton getter and one method
//! per operation, after checking every descriptor against the operation's
//! declared parameters and return shape. Failures are kept next to the handle
//! they disabled so calls report the original lookup reason.

use std::collections::HashMap;

use serde::Serialize;

use crate::attach::AttachScope;
use crate::error::{BridgeError, BridgeResult};
use crate::host::HostRuntime;
use crate::signature::{JavaType, MethodSignature};
use crate::value::{Param, ReturnShape};

/// Name of the static singleton accessor on every instance-dispatched service.
pub const GETTER_NAME: &str = "getInstance";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Invoked on the singleton returned by the getter.
    Instance,
    /// Invoked on the class.
    Static,
    /// Handled by the bridge itself; no host call.
    Native,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    /// Callable from scripts.
    Script,
    /// Issued by the embedding application (init/start/stop).
    Lifecycle,
}

/// One operation of a service.
#[derive(Debug, Clone, Copy)]
pub struct OperationSpec {
    pub name: &'static str,
    pub method: &'static str,
    pub signature: &'static str,
    pub shape: ReturnShape,
    pub params: &'static [Param],
    pub dispatch: Dispatch,
    pub exposure: Exposure,
}

impl OperationSpec {
    pub const fn instance(
        name: &'static str,
        method: &'static str,
        signature: &'static str,
        shape: ReturnShape,
        params: &'static [Param],
    ) -> Self {
        Self {
            name,
            method,
            signature,
            shape,
            params,
            dispatch: Dispatch::Instance,
            exposure: Exposure::Script,
        }
    }

    pub const fn static_call(
        name: &'static str,
        method: &'static str,
        signature: &'static str,
        shape: ReturnShape,
        params: &'static [Param],
    ) -> Self {
        Self {
            dispatch: Dispatch::Static,
            ..Self::instance(name, method, signature, shape, params)
        }
    }

    pub const fn native(name: &'static str, shape: ReturnShape, params: &'static [Param]) -> Self {
        Self {
            dispatch: Dispatch::Native,
            ..Self::instance(name, "", "", shape, params)
        }
    }

    pub const fn lifecycle(self) -> Self {
        Self {
            exposure: Exposure::Lifecycle,
            ..self
        }
    }

    /// Parameters supplied by the caller, in order.
    pub fn script_params(&self) -> impl Iterator<Item = &'static Param> {
        self.params.iter().filter(|p| p.is_script_supplied())
    }
}

/// One host service and the operations it exposes.
#[derive(Debug, Clone, Copy)]
pub struct ServiceSpec {
    /// Module name seen by scripts.
    pub name: &'static str,
    pub class: &'static str,
    /// Descriptor of the singleton getter; `None` for static-only services.
    pub getter: Option<&'static str>,
    pub operations: &'static [OperationSpec],
}

impl ServiceSpec {
    pub fn operation(&self, name: &str) -> Option<&'static OperationSpec> {
        self.operations.iter().find(|op| op.name == name)
    }
}

pub enum MethodHandle<H: HostRuntime> {
    Instance(H::Method),
    Static(H::StaticMethod),
    Native,
}

pub struct OperationHandle<H: HostRuntime> {
    pub spec: &'static OperationSpec,
    pub method: Result<MethodHandle<H>, BridgeError>,
}

pub struct ServiceHandle<H: HostRuntime> {
    pub spec: &'static ServiceSpec,
    pub class: H::Global,
    pub getter: Option<H::StaticMethod>,
    operations: HashMap<&'static str, OperationHandle<H>>,
}

/// A resolved operation ready to dispatch.
pub struct Resolved<'c, H: HostRuntime> {
    pub service: &'c ServiceHandle<H>,
    pub spec: &'static OperationSpec,
    pub method: &'c MethodHandle<H>,
}

pub struct HandleCache<H: HostRuntime> {
    order: Vec<&'static str>,
    services: HashMap<&'static str, Result<ServiceHandle<H>, BridgeError>>,
}

impl<H: HostRuntime> HandleCache<H> {
    /// Resolve every service in `specs`. With `strict`, the first lookup
    /// failure aborts population.
    pub fn populate(
        scope: &AttachScope<'_, H>,
        specs: &'static [ServiceSpec],
        strict: bool,
    ) -> BridgeResult<Self> {
        let host = scope.host();
        let mut cache = Self {
            order: Vec::with_capacity(specs.len()),
            services: HashMap::with_capacity(specs.len()),
        };
        for spec in specs {
            let resolved = resolve_service(host, spec, strict);
            match &resolved {
                Ok(handle) => {
                    let disabled = handle.operations.values().filter(|o| o.method.is_err()).count();
                    tracing::debug!(
                        service = spec.name,
                        operations = handle.operations.len(),
                        disabled,
                        "service resolved"
                    );
                }
                Err(e) if strict => return Err(e.clone()),
                Err(e) => tracing::warn!(service = spec.name, error = %e, "service disabled"),
            }
            cache.order.push(spec.name);
            cache.services.insert(spec.name, resolved);
        }
        Ok(cache)
    }

    pub fn resolve(&self, service: &str, operation: &str) -> BridgeResult<Resolved<'_, H>> {
        let unknown = || BridgeError::UnknownOperation {
            service: service.to_string(),
            operation: operation.to_string(),
        };
        let handle = match self.services.get(service) {
            None => return Err(unknown()),
            Some(Err(e)) => {
                return Err(BridgeError::ServiceUnavailable {
                    service: service.to_string(),
                    reason: e.to_string(),
                })
            }
            Some(Ok(handle)) => handle,
        };
        let op = handle.operations.get(operation).ok_or_else(unknown)?;
        match &op.method {
            Ok(method) => Ok(Resolved {
                service: handle,
                spec: op.spec,
                method,
            }),
            Err(e) => Err(BridgeError::OperationUnavailable {
                service: service.to_string(),
                operation: operation.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn report(&self) -> CacheReport {
        let mut report = CacheReport::default();
        for name in &self.order {
            match self.services.get(name) {
                Some(Ok(handle)) => {
                    let mut operations = Vec::new();
                    for op in handle.spec.operations {
                        match handle.operations.get(op.name).map(|o| &o.method) {
                            Some(Ok(_)) => operations.push(op.name.to_string()),
                            Some(Err(e)) => report.unavailable.push(Unavailable {
                                service: name.to_string(),
                                operation: Some(op.name.to_string()),
                                reason: e.to_string(),
                            }),
                            None => {}
                        }
                    }
                    report.available.push(AvailableService {
                        service: name.to_string(),
                        operations,
                    });
                }
                Some(Err(e)) => report.unavailable.push(Unavailable {
                    service: name.to_string(),
                    operation: None,
                    reason: e.to_string(),
                }),
                None => {}
            }
        }
        report
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheReport {
    pub available: Vec<AvailableService>,
    pub unavailable: Vec<Unavailable>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableService {
    pub service: String,
    pub operations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unavailable {
    pub service: String,
    pub operation: Option<String>,
    pub reason: String,
}

fn method_error(spec: &ServiceSpec, method: &str, signature: &str, reason: String) -> BridgeError {
    BridgeError::MethodLookup {
        class: spec.class.to_string(),
        method: method.to_string(),
        signature: signature.to_string(),
        reason,
    }
}

fn resolve_service<H: HostRuntime>(
    host: &H,
    spec: &'static ServiceSpec,
    strict: bool,
) -> BridgeResult<ServiceHandle<H>> {
    let class = host.find_class(spec.class)?;

    let getter = match spec.getter {
        Some(descriptor) => {
            let sig: MethodSignature = descriptor
                .parse()
                .map_err(|e: BridgeError| method_error(spec, GETTER_NAME, descriptor, e.to_string()))?;
            if !sig.params.is_empty() || sig.ret != JavaType::Object(spec.class.to_string()) {
                return Err(method_error(
                    spec,
                    GETTER_NAME,
                    descriptor,
                    format!("singleton getter must be `()L{};`", spec.class),
                ));
            }
            let getter = host
                .find_static_method(&class, GETTER_NAME, descriptor)
                .map_err(|e| match e {
                    BridgeError::MethodLookup { reason, .. } => {
                        method_error(spec, GETTER_NAME, descriptor, reason)
                    }
                    other => other,
                })?;
            Some(getter)
        }
        None => None,
    };

    let mut operations = HashMap::with_capacity(spec.operations.len());
    for op in spec.operations {
        let method = resolve_operation(host, spec, op, &class, getter.is_some());
        if let Err(e) = &method {
            tracing::warn!(service = spec.name, operation = op.name, error = %e, "operation disabled");
            if strict {
                return Err(e.clone());
            }
        }
        operations.insert(op.name, OperationHandle { spec: op, method });
    }

    Ok(ServiceHandle {
        spec,
        class,
        getter,
        operations,
    })
}

fn resolve_operation<H: HostRuntime>(
    host: &H,
    spec: &ServiceSpec,
    op: &OperationSpec,
    class: &H::Global,
    has_getter: bool,
) -> BridgeResult<MethodHandle<H>> {
    if op.dispatch == Dispatch::Native {
        return Ok(MethodHandle::Native);
    }
    let sig: MethodSignature = op
        .signature
        .parse()
        .map_err(|e: BridgeError| method_error(spec, op.method, op.signature, e.to_string()))?;
    let kinds: Vec<_> = op.params.iter().map(|p| p.kind).collect();
    sig.check(&kinds, op.shape)
        .map_err(|reason| method_error(spec, op.method, op.signature, reason))?;

    let found = match op.dispatch {
        Dispatch::Instance if !has_getter => Err(method_error(
            spec,
            op.method,
            op.signature,
            "instance operation on a service without a singleton getter".into(),
        )),
        Dispatch::Instance => host
            .find_method(class, op.method, op.signature)
            .map(MethodHandle::Instance),
        Dispatch::Static => host
            .find_static_method(class, op.method, op.signature)
            .map(MethodHandle::Static),
        Dispatch::Native => Ok(MethodHandle::Native),
    };
    // hosts may not know the class name; report it from the table
    found.map_err(|e| match e {
        BridgeError::MethodLookup { reason, .. } => method_error(spec, op.method, op.signature, reason),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::host::memory::{MemoryHost, Outcome};

    const GOOD: OperationSpec =
        OperationSpec::instance("is_on", "isOn", "()Z", ReturnShape::Boolean, &[]);
    const WRONG_SHAPE: OperationSpec =
        OperationSpec::instance("count", "getCount", "()I", ReturnShape::Json, &[]);
    const MISSING: OperationSpec =
        OperationSpec::instance("gone", "getGone", "()V", ReturnShape::Void, &[]);

    static SPECS: [ServiceSpec; 2] = [
        ServiceSpec {
            name: "svc",
            class: "com/example/Svc",
            getter: Some("()Lcom/example/Svc;"),
            operations: &[GOOD, WRONG_SHAPE, MISSING],
        },
        ServiceSpec {
            name: "ghost",
            class: "com/example/Ghost",
            getter: Some("()Lcom/example/Ghost;"),
            operations: &[GOOD],
        },
    ];

    fn host() -> Arc<MemoryHost> {
        let host = Arc::new(MemoryHost::new());
        host.define_service("com/example/Svc")
            .method("isOn", "()Z", |_| Outcome::Bool(true))
            .method("getCount", "()I", |_| Outcome::Int(3));
        host
    }

    #[test]
    fn lenient_population_disables_parts() {
        let host = host();
        let scope = AttachScope::enter(&host).unwrap();
        let cache = HandleCache::populate(&scope, &SPECS, false).unwrap();

        assert!(cache.resolve("svc", "is_on").is_ok());
        assert!(matches!(
            cache.resolve("svc", "count"),
            Err(BridgeError::OperationUnavailable { .. })
        ));
        assert!(matches!(
            cache.resolve("svc", "gone"),
            Err(BridgeError::OperationUnavailable { .. })
        ));
        match cache.resolve("ghost", "is_on") {
            Err(BridgeError::ServiceUnavailable { reason, .. }) => {
                assert!(reason.contains("com/example/Ghost"))
            }
            _ => panic!("ghost should be unavailable"),
        }
        assert!(matches!(
            cache.resolve("svc", "nope"),
            Err(BridgeError::UnknownOperation { .. })
        ));

        let report = cache.report();
        assert_eq!(report.available.len(), 1);
        assert_eq!(report.available[0].operations, vec!["is_on".to_string()]);
        assert_eq!(report.unavailable.len(), 3);
    }

    #[test]
    fn strict_population_fails_fast() {
        let host = host();
        let scope = AttachScope::enter(&host).unwrap();
        let err = HandleCache::populate(&scope, &SPECS, true).err().unwrap();
        assert!(err.is_lookup());
    }
}
