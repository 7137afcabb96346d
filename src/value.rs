// src/value.rs
//! Values crossing the bridge: argument lists going in, call results coming out.

use serde_json::Value;

/// Return shape of a host method; selects the type converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnShape {
    Void,
    Boolean,
    Int,
    String,
    /// A `String` holding JSON, decoded into a nested value.
    Json,
}

impl ReturnShape {
    pub fn name(self) -> &'static str {
        match self {
            ReturnShape::Void => "void",
            ReturnShape::Boolean => "boolean",
            ReturnShape::Int => "int",
            ReturnShape::String => "string",
            ReturnShape::Json => "json",
        }
    }
}

/// Kind of one declared operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Double,
    Str,
    StrList,
    /// Filled in with the application context; never supplied by scripts.
    Context,
}

/// A named parameter of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl Param {
    pub const fn int(name: &'static str) -> Self {
        Self { name, kind: ParamKind::Int }
    }

    pub const fn double(name: &'static str) -> Self {
        Self { name, kind: ParamKind::Double }
    }

    pub const fn str(name: &'static str) -> Self {
        Self { name, kind: ParamKind::Str }
    }

    pub const fn str_list(name: &'static str) -> Self {
        Self { name, kind: ParamKind::StrList }
    }

    pub const fn context() -> Self {
        Self { name: "context", kind: ParamKind::Context }
    }

    /// Whether scripts supply this parameter.
    pub fn is_script_supplied(&self) -> bool {
        self.kind != ParamKind::Context
    }
}

/// One argument on the embedding side, before marshaling.
#[derive(Debug, Clone, PartialEq)]
pub enum HostArg {
    Int(i32),
    Double(f64),
    Str(String),
    StrList(Vec<String>),
    /// Placeholder resolved to the bridge's application context.
    Context,
}

impl HostArg {
    pub fn kind(&self) -> ParamKind {
        match self {
            HostArg::Int(_) => ParamKind::Int,
            HostArg::Double(_) => ParamKind::Double,
            HostArg::Str(_) => ParamKind::Str,
            HostArg::StrList(_) => ParamKind::StrList,
            HostArg::Context => ParamKind::Context,
        }
    }
}

/// Outcome of exactly one converter invocation. Failures travel as
/// `Err(BridgeError)` beside it.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    /// Void return, or a null string/JSON return.
    None,
    Bool(bool),
    Int(i32),
    Str(String),
    Structured(Value),
}

impl CallResult {
    pub fn is_none(&self) -> bool {
        matches!(self, CallResult::None)
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            CallResult::Structured(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_not_script_supplied() {
        assert!(!Param::context().is_script_supplied());
        assert!(Param::int("sensor_type").is_script_supplied());
    }

    #[test]
    fn arg_kinds_line_up_with_params() {
        assert_eq!(HostArg::Double(1.5).kind(), ParamKind::Double);
        assert_eq!(HostArg::StrList(vec![]).kind(), ParamKind::StrList);
        assert_eq!(HostArg::Context.kind(), Param::context().kind);
    }
}
