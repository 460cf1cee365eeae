//! Core type definitions for shelfdb

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A record payload: field name to JSON-compatible value
pub type Document = BTreeMap<String, Value>;

/// JSON-compatible variant value stored in record payloads
///
/// Untagged, so it serializes to and from plain JSON. `Int` is tried before
/// `Float` during deserialization, keeping whole numbers exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(Document),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Document> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Equality with numeric coercion: `1` equals `1.0`
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Float(_), _) | (_, Value::Float(_)) => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
                _ => false,
            },
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.loose_eq(vb))
            }
            _ => false,
        }
    }

    /// Ordering with numeric coercion
    ///
    /// Defined for numeric pairs and string pairs; everything else is
    /// incomparable and returns None.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// The unit of stored data: an id plus a schemaless payload
///
/// This is exactly the shape persisted to each record file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub data: Document,
}

impl Record {
    pub fn new(id: impl Into<String>, data: Document) -> Self {
        Record {
            id: id.into(),
            data,
        }
    }
}

/// Database metadata, stored as `<database>/metadata.json`
///
/// `tables` is kept consistent with the set of table directories after
/// every create/delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseMeta {
    pub name: String,
    pub tables: Vec<String>,
    #[serde(default)]
    pub settings: Document,
}

impl DatabaseMeta {
    pub fn new(name: impl Into<String>) -> Self {
        DatabaseMeta {
            name: name.into(),
            tables: Vec::new(),
            settings: Document::new(),
        }
    }
}

/// Table metadata, stored as `<table>/metadata.json`
///
/// Keys and indexes are advisory only; no index structure is maintained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub indexes: BTreeMap<String, Vec<String>>,
}

impl TableMeta {
    pub fn new(name: impl Into<String>) -> Self {
        TableMeta {
            name: name.into(),
            keys: Vec::new(),
            indexes: BTreeMap::new(),
        }
    }
}

/// Generate a random record id (32 hex chars)
///
/// Used when a record is inserted without an explicit id.
pub fn generate_record_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes[..]);
    let mut id = String::with_capacity(32);
    for b in bytes {
        id.push_str(&format!("{:02x}", b));
    }
    id
}
