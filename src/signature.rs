// src/signature.rs
//! JNI method descriptors, e.g. `(DDI)Ljava/lang/String;`.
//!
//! Descriptors are parsed once while the handle cache is populated so a
//! disagreement between a declared operation and its descriptor is reported
//! at init instead of at first call.

use std::fmt;
use std::str::FromStr;

use crate::error::BridgeError;
use crate::value::{ParamKind, ReturnShape};

pub const STRING_CLASS: &str = "java/lang/String";
pub const CONTEXT_CLASS: &str = "android/content/Context";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JavaType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
    Object(String),
    Array(Box<JavaType>),
}

impl JavaType {
    /// Whether an argument of `kind` can be passed where this type is expected.
    pub fn accepts(&self, kind: ParamKind) -> bool {
        match (self, kind) {
            (JavaType::Int, ParamKind::Int) => true,
            (JavaType::Double, ParamKind::Double) => true,
            (JavaType::Object(c), ParamKind::Str) => c == STRING_CLASS,
            (JavaType::Object(c), ParamKind::Context) => c == CONTEXT_CLASS,
            (JavaType::Array(inner), ParamKind::StrList) => {
                **inner == JavaType::Object(STRING_CLASS.to_string())
            }
            _ => false,
        }
    }

    /// Whether a method returning this type can be converted with `shape`.
    pub fn fits(&self, shape: ReturnShape) -> bool {
        match shape {
            ReturnShape::Void => *self == JavaType::Void,
            ReturnShape::Boolean => *self == JavaType::Boolean,
            ReturnShape::Int => *self == JavaType::Int,
            ReturnShape::String | ReturnShape::Json => {
                *self == JavaType::Object(STRING_CLASS.to_string())
            }
        }
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaType::Boolean => f.write_str("Z"),
            JavaType::Byte => f.write_str("B"),
            JavaType::Char => f.write_str("C"),
            JavaType::Short => f.write_str("S"),
            JavaType::Int => f.write_str("I"),
            JavaType::Long => f.write_str("J"),
            JavaType::Float => f.write_str("F"),
            JavaType::Double => f.write_str("D"),
            JavaType::Void => f.write_str("V"),
            JavaType::Object(c) => write!(f, "L{c};"),
            JavaType::Array(inner) => write!(f, "[{inner}"),
        }
    }
}

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub params: Vec<JavaType>,
    pub ret: JavaType,
}

impl MethodSignature {
    /// Check declared parameter kinds and return shape against the descriptor.
    pub fn check(&self, params: &[ParamKind], shape: ReturnShape) -> Result<(), String> {
        if self.params.len() != params.len() {
            return Err(format!(
                "descriptor takes {} argument(s), operation declares {}",
                self.params.len(),
                params.len()
            ));
        }
        for (i, (ty, kind)) in self.params.iter().zip(params).enumerate() {
            if !ty.accepts(*kind) {
                return Err(format!("argument {i} is `{ty}`, declared as {kind:?}"));
            }
        }
        if !self.ret.fits(shape) {
            return Err(format!(
                "returns `{}`, declared as {}",
                self.ret,
                shape.name()
            ));
        }
        Ok(())
    }
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn parse_type(&mut self) -> Result<JavaType, String> {
        let c = self.bump().ok_or("unexpected end of descriptor")?;
        Ok(match c {
            'Z' => JavaType::Boolean,
            'B' => JavaType::Byte,
            'C' => JavaType::Char,
            'S' => JavaType::Short,
            'I' => JavaType::Int,
            'J' => JavaType::Long,
            'F' => JavaType::Float,
            'D' => JavaType::Double,
            'V' => JavaType::Void,
            '[' => JavaType::Array(Box::new(self.parse_type()?)),
            'L' => {
                let rest = &self.src[self.pos..];
                let end = rest.find(';').ok_or("unterminated class name")?;
                let name = &rest[..end];
                if name.is_empty() {
                    return Err("empty class name".into());
                }
                self.pos += end + 1;
                JavaType::Object(name.to_string())
            }
            other => return Err(format!("unexpected `{other}` at offset {}", self.pos - 1)),
        })
    }
}

impl FromStr for MethodSignature {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| BridgeError::Interop(format!("invalid descriptor `{s}`: {reason}"));
        let mut cur = Cursor { src: s, pos: 0 };
        if cur.bump() != Some('(') {
            return Err(invalid("missing `(`".into()));
        }
        let mut params = Vec::new();
        loop {
            match cur.peek() {
                Some(')') => {
                    cur.bump();
                    break;
                }
                Some(_) => {
                    let ty = cur.parse_type().map_err(invalid)?;
                    if ty == JavaType::Void {
                        return Err(invalid("void parameter".into()));
                    }
                    params.push(ty);
                }
                None => return Err(invalid("missing `)`".into())),
            }
        }
        let ret = cur.parse_type().map_err(invalid)?;
        if cur.pos != s.len() {
            return Err(invalid("trailing characters".into()));
        }
        Ok(MethodSignature { params, ret })
    }
}
