// src/bridge.rs
//! The assembled bridge.
//!
//! A `Bridge` owns the host runtime, the populated handle cache and the
//! application context. It is built once at load time and shared by reference
//! with every call site; nothing here is file-scoped mutable state.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::attach::AttachScope;
use crate::cache::{CacheReport, Dispatch, HandleCache, MethodHandle, OperationSpec, ServiceSpec};
use crate::config::BridgeConfig;
use crate::dispatch;
use crate::error::{BridgeError, BridgeResult};
use crate::host::HostRuntime;
use crate::services::{START_OPERATIONS, STOP_OPERATIONS};
use crate::value::{CallResult, HostArg, ParamKind};

pub struct Bridge<H: HostRuntime> {
    host: Arc<H>,
    config: BridgeConfig,
    specs: &'static [ServiceSpec],
    cache: HandleCache<H>,
    context: OnceCell<H::Global>,
}

impl<H: HostRuntime> Bridge<H> {
    /// Resolve every service in `specs` against `host`.
    pub fn new(host: Arc<H>, config: BridgeConfig, specs: &'static [ServiceSpec]) -> BridgeResult<Self> {
        let cache = {
            let scope = AttachScope::enter(&host)?;
            HandleCache::populate(&scope, specs, config.strict_init)?
        };
        let report = cache.report();
        tracing::info!(
            services = report.available.len(),
            unavailable = report.unavailable.len(),
            strict = config.strict_init,
            "bridge ready"
        );
        Ok(Self {
            host,
            config,
            specs,
            cache,
            context: OnceCell::new(),
        })
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn specs(&self) -> &'static [ServiceSpec] {
        self.specs
    }

    /// Store the application context. Only the first call takes effect.
    pub fn set_context(&self, context: H::Global) -> BridgeResult<()> {
        self.context
            .set(context)
            .map_err(|_| BridgeError::Interop("application context is already set".into()))?;
        tracing::info!("application context set");
        Ok(())
    }

    /// Invoke `service.operation` with the caller-supplied arguments.
    pub fn call(&self, service: &str, operation: &str, args: Vec<HostArg>) -> BridgeResult<CallResult> {
        let resolved = self.cache.resolve(service, operation)?;
        let spec = resolved.spec;
        let args = bind_args(service, spec, args)?;

        let result = match resolved.method {
            MethodHandle::Native => call_native(service, spec, &args),
            MethodHandle::Instance(method) => {
                let getter = resolved.service.getter.ok_or_else(|| {
                    BridgeError::Interop(format!("`{service}` has no singleton getter"))
                })?;
                let scope = AttachScope::enter(&self.host)?;
                dispatch::dispatch(
                    scope.host(),
                    service,
                    &resolved.service.class,
                    getter,
                    *method,
                    spec.shape,
                    &args,
                    self.context.get(),
                )
            }
            MethodHandle::Static(method) => {
                let scope = AttachScope::enter(&self.host)?;
                dispatch::dispatch_static(
                    scope.host(),
                    &resolved.service.class,
                    *method,
                    spec.shape,
                    &args,
                    self.context.get(),
                )
            }
        };
        if let Err(e) = &result {
            tracing::debug!(service, operation, error = %e, "call failed");
        }
        result
    }

    /// Run every lifecycle `init`, then the start calls. Every step is
    /// attempted; the first failure is returned.
    pub fn start_services(&self) -> BridgeResult<()> {
        let inits: Vec<(&str, &str)> = self
            .specs
            .iter()
            .filter(|s| s.operation("init").is_some())
            .map(|s| (s.name, "init"))
            .collect();
        let first = self.run_steps(&inits);
        let started = self.run_steps(START_OPERATIONS);
        first.and(started)
    }

    pub fn stop_services(&self) -> BridgeResult<()> {
        self.run_steps(STOP_OPERATIONS)
    }

    fn run_steps(&self, steps: &[(&str, &str)]) -> BridgeResult<()> {
        let mut first = Ok(());
        for (service, operation) in steps {
            match self.call(service, operation, Vec::new()) {
                Ok(_) => tracing::info!(service, operation, "lifecycle step done"),
                // already reported when the cache was populated
                Err(BridgeError::ServiceUnavailable { .. })
                | Err(BridgeError::OperationUnavailable { .. })
                | Err(BridgeError::UnknownOperation { .. }) => {
                    tracing::debug!(service, operation, "lifecycle step skipped")
                }
                Err(e) => {
                    tracing::warn!(service, operation, error = %e, "lifecycle step failed");
                    if first.is_ok() {
                        first = Err(e);
                    }
                }
            }
        }
        first
    }

    pub fn report(&self) -> CacheReport {
        self.cache.report()
    }
}

/// Check caller arguments against the declared parameters and splice in the
/// context placeholders.
fn bind_args(service: &str, spec: &OperationSpec, args: Vec<HostArg>) -> BridgeResult<Vec<HostArg>> {
    let expected = spec.script_params().count();
    if args.len() != expected {
        return Err(BridgeError::Usage(format!(
            "{service}.{}() takes {expected} argument(s) ({} given)",
            spec.name,
            args.len()
        )));
    }
    let mut given = args.into_iter();
    let mut bound = Vec::with_capacity(spec.params.len());
    for param in spec.params {
        if param.kind == ParamKind::Context {
            bound.push(HostArg::Context);
            continue;
        }
        let arg = match given.next() {
            Some(arg) => arg,
            None => break,
        };
        let arg = match (param.kind, arg) {
            (ParamKind::Double, HostArg::Int(i)) => HostArg::Double(f64::from(i)),
            (ParamKind::StrList, HostArg::StrList(v)) if v.is_empty() => {
                return Err(BridgeError::Usage(format!(
                    "{service}.{}(): `{}` must not be empty",
                    spec.name, param.name
                )))
            }
            (kind, arg) if arg.kind() == kind => arg,
            (kind, arg) => {
                return Err(BridgeError::Usage(format!(
                    "{service}.{}(): `{}` expects {kind:?}, got {:?}",
                    spec.name,
                    param.name,
                    arg.kind()
                )))
            }
        };
        bound.push(arg);
    }
    Ok(bound)
}

fn call_native(service: &str, spec: &OperationSpec, args: &[HostArg]) -> BridgeResult<CallResult> {
    debug_assert_eq!(spec.dispatch, Dispatch::Native);
    match (service, spec.name, args) {
        ("androidlog", "log", [HostArg::Str(message)]) => {
            tracing::info!(target: "androidlog", "{message}");
            Ok(CallResult::None)
        }
        _ => Err(BridgeError::UnknownOperation {
            service: service.to_string(),
            operation: spec.name.to_string(),
        }),
    }
}
