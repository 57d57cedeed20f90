//! # Runtime Values
//!
//! Constant values stored in the graph: port defaults, node properties and
//! variable initializers.

use super::types::TypeRef;
use super::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    SByte(i8),
    Byte(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    /// Decimal literal kept as text to preserve precision
    Decimal(String),
    String(String),
    /// Enum value written as its member names (several for flags)
    Enum {
        ty: TypeRef,
        members: Vec<String>,
        #[serde(default)]
        raw: i64,
    },
    /// List, set or any collection with an `Add` method
    Collection { ty: TypeRef, items: Vec<Value> },
    Array { element: TypeRef, items: Vec<Value> },
    Dictionary {
        ty: TypeRef,
        entries: Vec<(Value, Value)>,
    },
    /// Constructor call with optional member initializers
    Construct {
        ty: TypeRef,
        #[serde(default)]
        arguments: Vec<Value>,
        #[serde(default)]
        initializers: Vec<(String, Value)>,
    },
    /// Method group
    Delegate {
        #[serde(default)]
        owner: Option<TypeRef>,
        method: String,
    },
    Type(TypeRef),
    Default(TypeRef),
    /// Reference to a live host object, hoisted into a field
    Object(ObjectRef),
    /// Value whose declared type only exists at runtime
    Runtime { ty: TypeRef, value: Box<Value> },
    /// Source text emitted verbatim
    Expression(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub name: String,
    pub ty: TypeRef,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::SByte(v) => Some(v as i64),
            Value::Byte(v) => Some(v as i64),
            Value::Short(v) => Some(v as i64),
            Value::UShort(v) => Some(v as i64),
            Value::Int(v) => Some(v as i64),
            Value::UInt(v) => Some(v as i64),
            Value::Long(v) => Some(v),
            Value::ULong(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v as f64),
            Value::Double(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeRef> {
        match self {
            Value::Type(ty) => Some(ty),
            _ => None,
        }
    }

    /// Items of a collection or array value
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::Collection { items, .. } | Value::Array { items, .. } => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_accessors_widen() {
        assert_eq!(Value::Byte(3).as_i64(), Some(3));
        assert_eq!(Value::Int(2).as_f64(), Some(2.0));
        assert_eq!(Value::ULong(u64::MAX).as_i64(), None);
        assert_eq!(Value::from("x").as_f64(), None);
    }

    #[test]
    fn values_deserialize_from_tagged_json() {
        let value: Value = serde_json::from_str(r#"{ "kind": "float", "value": 1.5 }"#).unwrap();
        assert_eq!(value, Value::Float(1.5));

        let null: Value = serde_json::from_str(r#"{ "kind": "null" }"#).unwrap();
        assert_eq!(null, Value::Null);
    }
}
