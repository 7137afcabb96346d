// src/host/jni.rs
//! `HostRuntime` over a real `JavaVM`.
//!
//! The attached check uses `JavaVM::get_env`. Attach and detach themselves
//! go through the raw invocation interface so the bridge owns the pairing
//! (see `attach`); every other primitive uses the env of the already-attached
//! calling thread.

use std::os::raw::c_void;
use std::ptr;

use jni::errors::Error as JniError;
use jni::objects::{GlobalRef, JClass, JMethodID, JObject, JStaticMethodID, JString, JValue};
use jni::signature::{Primitive, ReturnType};
use jni::sys::{jvalue, JNI_OK};
use jni::{JNIEnv, JavaVM};

use super::{Attach, HostReturn, HostRuntime, HostValue};
use crate::error::{BridgeError, BridgeResult};
use crate::signature::STRING_CLASS;
use crate::value::ReturnShape;

pub struct JniHost {
    vm: JavaVM,
}

fn interop(context: &str, e: JniError) -> BridgeError {
    BridgeError::Interop(format!("{context}: {e}"))
}

/// Detach a local reference from the env frame lifetime. The bridge releases
/// it explicitly through `delete_local`.
fn into_static(obj: JObject<'_>) -> JObject<'static> {
    // SAFETY: the raw handle stays valid until deleted or the native frame
    // returns; `LocalRef` deletes it before either.
    unsafe { JObject::from_raw(obj.into_raw()) }
}

fn return_type(shape: ReturnShape) -> ReturnType {
    match shape {
        ReturnShape::Void => ReturnType::Primitive(Primitive::Void),
        ReturnShape::Boolean => ReturnType::Primitive(Primitive::Boolean),
        ReturnShape::Int => ReturnType::Primitive(Primitive::Int),
        ReturnShape::String | ReturnShape::Json => ReturnType::Object,
    }
}

fn to_jvalue(value: &HostValue<'_, JniHost>) -> jvalue {
    match value {
        HostValue::Int(i) => JValue::Int(*i).as_jni(),
        HostValue::Double(d) => JValue::Double(*d).as_jni(),
        HostValue::Object(obj) => JValue::Object(*obj).as_jni(),
        HostValue::Global(global) => JValue::Object(global.as_obj()).as_jni(),
    }
}

impl JniHost {
    pub fn new(vm: JavaVM) -> Self {
        Self { vm }
    }

    fn env(&self) -> BridgeResult<JNIEnv<'_>> {
        self.vm.get_env().map_err(|e| interop("thread has no JNI env", e))
    }

    /// Clear a pending exception raised by a lookup and return its description.
    fn lookup_reason(&self, env: &mut JNIEnv<'_>, fallback: JniError) -> String {
        if !env.exception_check().unwrap_or(false) {
            return fallback.to_string();
        }
        match self.take_exception() {
            Some(throwable) => {
                let reason = self.describe(&throwable).unwrap_or_else(|_| fallback.to_string());
                self.delete_local(throwable);
                reason
            }
            None => fallback.to_string(),
        }
    }

    fn lift(
        &self,
        result: Result<jni::objects::JValueOwned<'_>, JniError>,
        shape: ReturnShape,
    ) -> BridgeResult<HostReturn<JObject<'static>>> {
        let value = match result {
            Ok(value) => value,
            // left pending for the converter to drain
            Err(JniError::JavaException) => {
                return Err(BridgeError::Interop("java exception pending".into()))
            }
            Err(e) => return Err(interop("call failed", e)),
        };
        Ok(match shape {
            ReturnShape::Void => HostReturn::Void,
            ReturnShape::Boolean => HostReturn::Boolean(value.z().map_err(|e| interop("boolean return", e))?),
            ReturnShape::Int => HostReturn::Int(value.i().map_err(|e| interop("int return", e))?),
            ReturnShape::String | ReturnShape::Json => {
                HostReturn::Object(into_static(value.l().map_err(|e| interop("object return", e))?))
            }
        })
    }
}

impl HostRuntime for JniHost {
    type Global = GlobalRef;
    type Local = JObject<'static>;
    type Method = JMethodID;
    type StaticMethod = JStaticMethodID;

    fn attach_current_thread(&self) -> BridgeResult<Attach> {
        if self.vm.get_env().is_ok() {
            return Ok(Attach::Existing);
        }
        // `JavaVM::attach_current_thread_permanently` parks its own detach
        // guard in a thread-local; the attach record in `attach` owns the
        // detach instead, so the pair goes through the invocation interface.
        let vm = self.vm.get_java_vm_pointer();
        // SAFETY: `vm` is the process JavaVM; the invocation interface is
        // immutable for its lifetime.
        unsafe {
            let attach = (**vm).AttachCurrentThread.ok_or_else(|| {
                BridgeError::Attach("AttachCurrentThread missing from invocation interface".into())
            })?;
            let mut env: *mut c_void = ptr::null_mut();
            let rc = attach(vm, &mut env, ptr::null_mut());
            if rc != JNI_OK {
                return Err(BridgeError::Attach(format!("AttachCurrentThread returned {rc}")));
            }
        }
        Ok(Attach::New)
    }

    fn detach_current_thread(&self) {
        let vm = self.vm.get_java_vm_pointer();
        // SAFETY: only called for threads this host attached, at thread exit.
        unsafe {
            if let Some(detach) = (**vm).DetachCurrentThread {
                let rc = detach(vm);
                if rc != JNI_OK {
                    tracing::warn!(rc, "DetachCurrentThread failed");
                }
            }
        }
    }

    fn find_class(&self, name: &str) -> BridgeResult<GlobalRef> {
        let mut env = self.env()?;
        let class = match env.find_class(name) {
            Ok(class) => class,
            Err(e) => {
                return Err(BridgeError::ClassLookup {
                    class: name.to_string(),
                    reason: self.lookup_reason(&mut env, e),
                })
            }
        };
        let global = env.new_global_ref(&class).map_err(|e| interop("new_global_ref", e));
        let _ = env.delete_local_ref(class);
        global
    }

    fn find_method(&self, class: &GlobalRef, name: &str, signature: &str) -> BridgeResult<JMethodID> {
        let mut env = self.env()?;
        let class: &JClass = class.as_obj().into();
        env.get_method_id(class, name, signature).map_err(|e| BridgeError::MethodLookup {
            class: String::new(),
            method: name.to_string(),
            signature: signature.to_string(),
            reason: self.lookup_reason(&mut env, e),
        })
    }

    fn find_static_method(
        &self,
        class: &GlobalRef,
        name: &str,
        signature: &str,
    ) -> BridgeResult<JStaticMethodID> {
        let mut env = self.env()?;
        let class: &JClass = class.as_obj().into();
        env.get_static_method_id(class, name, signature)
            .map_err(|e| BridgeError::MethodLookup {
                class: String::new(),
                method: name.to_string(),
                signature: signature.to_string(),
                reason: self.lookup_reason(&mut env, e),
            })
    }

    fn call_method(
        &self,
        instance: &JObject<'static>,
        method: JMethodID,
        shape: ReturnShape,
        args: &[HostValue<'_, Self>],
    ) -> BridgeResult<HostReturn<JObject<'static>>> {
        let mut env = self.env()?;
        let jargs: Vec<jvalue> = args.iter().map(to_jvalue).collect();
        // SAFETY: `method` was resolved on this class with a descriptor that
        // was checked against `shape` and the argument kinds.
        let result = unsafe { env.call_method_unchecked(instance, method, return_type(shape), &jargs) };
        self.lift(result, shape)
    }

    fn call_static(
        &self,
        class: &GlobalRef,
        method: JStaticMethodID,
        shape: ReturnShape,
        args: &[HostValue<'_, Self>],
    ) -> BridgeResult<HostReturn<JObject<'static>>> {
        let mut env = self.env()?;
        let class: &JClass = class.as_obj().into();
        let jargs: Vec<jvalue> = args.iter().map(to_jvalue).collect();
        // SAFETY: as for `call_method`.
        let result =
            unsafe { env.call_static_method_unchecked(class, method, return_type(shape), &jargs) };
        self.lift(result, shape)
    }

    fn call_getter(&self, class: &GlobalRef, getter: JStaticMethodID) -> BridgeResult<JObject<'static>> {
        match self.call_static(class, getter, ReturnShape::String, &[])? {
            HostReturn::Object(obj) => Ok(obj),
            _ => Err(BridgeError::Interop("singleton getter returned a primitive".into())),
        }
    }

    fn new_string(&self, value: &str) -> BridgeResult<JObject<'static>> {
        let mut env = self.env()?;
        let s = env.new_string(value).map_err(|e| interop("new_string", e))?;
        Ok(into_static(s.into()))
    }

    fn new_string_array(&self, values: &[String]) -> BridgeResult<JObject<'static>> {
        let mut env = self.env()?;
        let array = env
            .new_object_array(values.len() as i32, STRING_CLASS, JObject::null())
            .map_err(|e| interop("new_object_array", e))?;
        for (i, value) in values.iter().enumerate() {
            let s = match env.new_string(value) {
                Ok(s) => s,
                Err(e) => {
                    let _ = env.delete_local_ref(array);
                    return Err(interop("new_string", e));
                }
            };
            let set = env.set_object_array_element(&array, i as i32, &s);
            let _ = env.delete_local_ref(s);
            if let Err(e) = set {
                let _ = env.delete_local_ref(array);
                return Err(interop("set_object_array_element", e));
            }
        }
        Ok(into_static(array.into()))
    }

    fn read_string(&self, value: &JObject<'static>) -> BridgeResult<String> {
        let mut env = self.env()?;
        let s: &JString = value.into();
        let text = env.get_string(s).map_err(|e| interop("get_string", e))?;
        Ok(text.into())
    }

    fn is_null(&self, value: &JObject<'static>) -> bool {
        value.as_raw().is_null()
    }

    fn delete_local(&self, value: JObject<'static>) {
        if value.as_raw().is_null() {
            return;
        }
        match self.env() {
            Ok(env) => {
                if let Err(e) = env.delete_local_ref(value) {
                    tracing::warn!(error = %e, "delete_local_ref failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "local reference leaked: no env"),
        }
    }

    fn take_exception(&self) -> Option<JObject<'static>> {
        let mut env = self.env().ok()?;
        if !env.exception_check().unwrap_or(false) {
            return None;
        }
        let throwable = env.exception_occurred().ok();
        let _ = env.exception_clear();
        throwable.map(|t| into_static(t.into()))
    }

    fn describe(&self, throwable: &JObject<'static>) -> BridgeResult<String> {
        let mut env = self.env()?;
        let text = match env.call_method(throwable, "toString", "()Ljava/lang/String;", &[]) {
            Ok(v) => v.l().map_err(|e| interop("toString return", e))?,
            Err(e) => {
                if env.exception_check().unwrap_or(false) {
                    let _ = env.exception_clear();
                }
                return Err(interop("toString", e));
            }
        };
        let text = into_static(text);
        let out = if text.as_raw().is_null() {
            Err(BridgeError::Interop("toString returned null".into()))
        } else {
            self.read_string(&text)
        };
        self.delete_local(text);
        out
    }
}
