//! # Dynamic Values
//!
//! The dynamically typed value exchanged with scripting hosts. Cells convert
//! to `DynValue` with `to_dynamic` and accept it with `from_dynamic`, applying
//! their documented coercions.
//!
//! ## Table of Contents
//! 1. Handle - opaque shared object
//! 2. DynKind - value classification
//! 3. DynValue - the value sum type
//! 4. Display (scripting-style `str()`)
//! 5. JSON bridge

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Number, Value};

// ============================================================================
// Handle
// ============================================================================

/// Reference-counted handle to a host object such as a material
#[derive(Clone)]
pub struct Handle {
    type_name: String,
    object: Arc<dyn Any + Send + Sync>,
}

impl Handle {
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<String>, object: T) -> Self {
        Self {
            type_name: type_name.into(),
            object: Arc::new(object),
        }
    }

    /// Script-visible type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object.downcast_ref::<T>()
    }

    /// Whether both handles refer to the same object
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.type_name)
    }
}

// ============================================================================
// DynKind
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynKind {
    None,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    List,
    Tuple,
    Set,
    Dict,
    Handle,
}

// ============================================================================
// DynValue
// ============================================================================

/// A dynamically typed value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DynValue {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<DynValue>),
    Tuple(Vec<DynValue>),
    /// Unordered; duplicates are the producer's concern
    Set(Vec<DynValue>),
    /// Insertion-ordered key/value pairs
    Dict(Vec<(DynValue, DynValue)>),
    Handle(Handle),
}

impl DynValue {
    pub fn kind(&self) -> DynKind {
        match self {
            DynValue::None => DynKind::None,
            DynValue::Bool(_) => DynKind::Bool,
            DynValue::Int(_) => DynKind::Int,
            DynValue::Float(_) => DynKind::Float,
            DynValue::Str(_) => DynKind::Str,
            DynValue::Bytes(_) => DynKind::Bytes,
            DynValue::List(_) => DynKind::List,
            DynValue::Tuple(_) => DynKind::Tuple,
            DynValue::Set(_) => DynKind::Set,
            DynValue::Dict(_) => DynKind::Dict,
            DynValue::Handle(_) => DynKind::Handle,
        }
    }

    /// Type name as a scripting host would print it in an error message
    pub fn type_name(&self) -> &str {
        match self {
            DynValue::None => "NoneType",
            DynValue::Bool(_) => "bool",
            DynValue::Int(_) => "int",
            DynValue::Float(_) => "float",
            DynValue::Str(_) => "str",
            DynValue::Bytes(_) => "bytes",
            DynValue::List(_) => "list",
            DynValue::Tuple(_) => "tuple",
            DynValue::Set(_) => "set",
            DynValue::Dict(_) => "dict",
            DynValue::Handle(h) => h.type_name(),
        }
    }

    pub fn tuple(items: impl IntoIterator<Item = DynValue>) -> Self {
        DynValue::Tuple(items.into_iter().collect())
    }

    pub fn list(items: impl IntoIterator<Item = DynValue>) -> Self {
        DynValue::List(items.into_iter().collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, DynValue::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DynValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            DynValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            DynValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Int or float widened to `f64`; bools are not numbers here
    pub fn as_number(&self) -> Option<f64> {
        match self {
            DynValue::Int(i) => Some(*i as f64),
            DynValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            DynValue::Handle(h) => Some(h),
            _ => None,
        }
    }

    /// Items of a list or tuple
    pub fn as_sequence(&self) -> Option<&[DynValue]> {
        match self {
            DynValue::List(items) | DynValue::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Items of a list, tuple or set
    pub fn as_collection(&self) -> Option<&[DynValue]> {
        match self {
            DynValue::List(items) | DynValue::Tuple(items) | DynValue::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(DynValue, DynValue)]> {
        match self {
            DynValue::Dict(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Look up a string key in a dict
    pub fn get(&self, key: &str) -> Option<&DynValue> {
        self.as_dict()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynValue::Str(s) => write!(f, "'{}'", s),
            DynValue::Bytes(b) => write!(f, "b'{}'", String::from_utf8_lossy(b)),
            other => write!(f, "{}", other),
        }
    }
}

fn fmt_items(f: &mut fmt::Formatter<'_>, items: &[DynValue]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        item.fmt_repr(f)?;
    }
    Ok(())
}

impl fmt::Display for DynValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynValue::None => write!(f, "None"),
            DynValue::Bool(true) => write!(f, "True"),
            DynValue::Bool(false) => write!(f, "False"),
            DynValue::Int(i) => write!(f, "{}", i),
            DynValue::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{:.1}", v)
            }
            DynValue::Float(v) => write!(f, "{}", v),
            DynValue::Str(s) => write!(f, "{}", s),
            DynValue::Bytes(b) => write!(f, "b'{}'", String::from_utf8_lossy(b)),
            DynValue::List(items) => {
                write!(f, "[")?;
                fmt_items(f, items)?;
                write!(f, "]")
            }
            DynValue::Tuple(items) => {
                write!(f, "(")?;
                fmt_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            DynValue::Set(items) if items.is_empty() => write!(f, "set()"),
            DynValue::Set(items) => {
                write!(f, "{{")?;
                fmt_items(f, items)?;
                write!(f, "}}")
            }
            DynValue::Dict(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    k.fmt_repr(f)?;
                    write!(f, ": ")?;
                    v.fmt_repr(f)?;
                }
                write!(f, "}}")
            }
            DynValue::Handle(h) => write!(f, "<{} object>", h.type_name()),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for DynValue {
    fn from(v: bool) -> Self {
        DynValue::Bool(v)
    }
}

impl From<i64> for DynValue {
    fn from(v: i64) -> Self {
        DynValue::Int(v)
    }
}

impl From<i32> for DynValue {
    fn from(v: i32) -> Self {
        DynValue::Int(v as i64)
    }
}

impl From<f64> for DynValue {
    fn from(v: f64) -> Self {
        DynValue::Float(v)
    }
}

impl From<f32> for DynValue {
    fn from(v: f32) -> Self {
        DynValue::Float(v as f64)
    }
}

impl From<&str> for DynValue {
    fn from(v: &str) -> Self {
        DynValue::Str(v.to_string())
    }
}

impl From<String> for DynValue {
    fn from(v: String) -> Self {
        DynValue::Str(v)
    }
}

impl From<Vec<DynValue>> for DynValue {
    fn from(v: Vec<DynValue>) -> Self {
        DynValue::List(v)
    }
}

impl From<Handle> for DynValue {
    fn from(v: Handle) -> Self {
        DynValue::Handle(v)
    }
}

// ============================================================================
// JSON Bridge
// ============================================================================

impl DynValue {
    /// JSON form for hosts that exchange JSON; sets become arrays and handles become their type name
    pub fn to_json(&self) -> Value {
        match self {
            DynValue::None => Value::Null,
            DynValue::Bool(b) => Value::Bool(*b),
            DynValue::Int(i) => Value::Number((*i).into()),
            DynValue::Float(v) => Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null),
            DynValue::Str(s) => Value::String(s.clone()),
            DynValue::Bytes(b) => Value::Array(b.iter().map(|x| Value::Number((*x).into())).collect()),
            DynValue::List(items) | DynValue::Tuple(items) | DynValue::Set(items) => {
                Value::Array(items.iter().map(DynValue::to_json).collect())
            }
            DynValue::Dict(pairs) => {
                let mut map = Map::new();
                for (k, v) in pairs {
                    let key = match k {
                        DynValue::Str(s) => s.clone(),
                        other => other.to_string(),
                    };
                    map.insert(key, v.to_json());
                }
                Value::Object(map)
            }
            DynValue::Handle(h) => Value::String(format!("<{}>", h.type_name())),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => DynValue::None,
            Value::Bool(b) => DynValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => DynValue::Int(i),
                None => DynValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => DynValue::Str(s.clone()),
            Value::Array(items) => DynValue::List(items.iter().map(DynValue::from_json).collect()),
            Value::Object(map) => DynValue::Dict(
                map.iter()
                    .map(|(k, v)| (DynValue::Str(k.clone()), DynValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_scripting_str() {
        let value = DynValue::tuple([
            DynValue::List(vec!["a".into(), "b".into()]),
            DynValue::Int(1),
        ]);
        assert_eq!(value.to_string(), "(['a', 'b'], 1)");
        assert_eq!(DynValue::Float(2.0).to_string(), "2.0");
        assert_eq!(DynValue::Float(0.25).to_string(), "0.25");
        assert_eq!(DynValue::Bool(true).to_string(), "True");
        assert_eq!(DynValue::tuple([DynValue::Int(3)]).to_string(), "(3,)");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(DynValue::None.type_name(), "NoneType");
        assert_eq!(DynValue::Dict(vec![]).type_name(), "dict");
        assert_eq!(DynValue::Handle(Handle::new("Material", 1u8)).type_name(), "Material");
    }

    #[test]
    fn test_handles_compare_by_identity() {
        let a = Handle::new("Thing", 5u32);
        let b = a.clone();
        let c = Handle::new("Thing", 5u32);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.downcast_ref::<u32>(), Some(&5));
        assert!(a.downcast_ref::<i64>().is_none());
    }

    #[test]
    fn test_dict_lookup() {
        let dict = DynValue::Dict(vec![("value".into(), DynValue::Int(4))]);
        assert_eq!(dict.get("value"), Some(&DynValue::Int(4)));
        assert_eq!(dict.get("min"), None);
    }

    #[test]
    fn test_json_bridge() {
        let json: Value = serde_json::json!({"value": 3, "labels": ["x", "y"], "ratio": 0.5});
        let value = DynValue::from_json(&json);
        assert_eq!(value.get("value"), Some(&DynValue::Int(3)));
        assert_eq!(value.get("ratio"), Some(&DynValue::Float(0.5)));
        assert_eq!(value.to_json(), json);
    }
}
