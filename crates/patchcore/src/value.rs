use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Dynamic value carried by ports
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
    /// Zero-payload trigger
    Bang,
}

/// Tag of a [`Value`], used by type predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Bytes,
    Json,
    Array,
    Object,
    Bang,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Json(_) => ValueKind::Json,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
            Value::Bang => ValueKind::Bang,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(j) => Some(j),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_bang(&self) -> bool {
        matches!(self, Value::Bang)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Json(j) => write!(f, "{}", j),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(" "))
            }
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let parts: Vec<String> = keys
                    .into_iter()
                    .map(|k| format!("{}: {}", k, map[k]))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Value::Bang => write!(f, "bang"),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Value::Json(j)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

/// Injectable predicate deciding which values a port accepts
#[derive(Clone)]
pub struct TypeCheck {
    label: String,
    predicate: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl TypeCheck {
    /// Accept every value
    pub fn any() -> Self {
        Self::new("any", |_| true)
    }

    /// Accept exactly one kind of value
    pub fn only(kind: ValueKind) -> Self {
        Self::new(format!("{:?}", kind), move |v| v.kind() == kind)
    }

    /// Accept any of the listed kinds
    pub fn one_of(kinds: &[ValueKind]) -> Self {
        let kinds = kinds.to_vec();
        let label = kinds
            .iter()
            .map(|k| format!("{:?}", k))
            .collect::<Vec<_>>()
            .join("|");
        Self::new(label, move |v| kinds.contains(&v.kind()))
    }

    pub fn new(
        label: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for TypeCheck {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Debug for TypeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeCheck").field(&self.label).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Value::from(1.5).kind(), ValueKind::Number);
        assert_eq!(Value::from("x").kind(), ValueKind::String);
        assert_eq!(Value::Bang.kind(), ValueKind::Bang);
        assert!(Value::default().is_null());
    }

    #[test]
    fn test_type_check_one_of() {
        let check = TypeCheck::one_of(&[ValueKind::Number, ValueKind::Bool]);
        assert!(check.accepts(&Value::Number(3.0)));
        assert!(check.accepts(&Value::Bool(false)));
        assert!(!check.accepts(&Value::from("3")));
        assert_eq!(check.label(), "Number|Bool");
    }

    #[test]
    fn test_bang_serializes_with_tag() {
        let json = serde_json::to_string(&Value::Bang).unwrap();
        assert_eq!(json, r#"{"type":"Bang"}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert!(back.is_bang());
    }

    #[test]
    fn test_display_array() {
        let v = Value::Array(vec![Value::from(1i64), Value::from("a"), Value::Bang]);
        assert_eq!(v.to_string(), "1 a bang");
    }
}
