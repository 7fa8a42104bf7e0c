//! Key values used to match remote records against local ones.
//!
//! Only JSON integers and strings are usable as keys. Floats, booleans,
//! nulls and nested values fail the type check and are treated as if the
//! key were absent.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A hashable, totally ordered key value.
///
/// Integers are normalized on construction: anything that fits in an `i64`
/// is stored as [`KeyValue::Int`], so `UInt` only ever holds values above
/// `i64::MAX`. Equality is therefore plain value equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    UInt(u64),
    String(String),
}

impl KeyValue {
    /// Extract a key from a JSON value, if the value is usable as one.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(KeyValue::Int(i))
                } else {
                    n.as_u64().map(KeyValue::UInt)
                }
            }
            serde_json::Value::String(s) => Some(KeyValue::String(s.clone())),
            _ => None,
        }
    }

    /// Convert back into a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            KeyValue::Int(i) => serde_json::Value::from(*i),
            KeyValue::UInt(u) => serde_json::Value::from(*u),
            KeyValue::String(s) => serde_json::Value::from(s.as_str()),
        }
    }

    /// The kind of this key.
    pub fn kind(&self) -> KeyKind {
        match self {
            KeyValue::Int(_) | KeyValue::UInt(_) => KeyKind::Int,
            KeyValue::String(_) => KeyKind::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            KeyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            KeyValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(i) => write!(f, "{}", i),
            KeyValue::UInt(u) => write!(f, "{}", u),
            KeyValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        KeyValue::Int(value)
    }
}

impl From<i32> for KeyValue {
    fn from(value: i32) -> Self {
        KeyValue::Int(value.into())
    }
}

impl From<u64> for KeyValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(i) => KeyValue::Int(i),
            Err(_) => KeyValue::UInt(value),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::String(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::String(value)
    }
}

/// Restricts which key values are accepted from remote records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// Signed or unsigned JSON integers
    Int,
    String,
}

impl KeyKind {
    /// Check whether a key is of this kind.
    pub fn accepts(self, key: &KeyValue) -> bool {
        key.kind() == self
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Int => write!(f, "int"),
            KeyKind::String => write!(f, "string"),
        }
    }
}

impl FromStr for KeyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(KeyKind::Int),
            "string" | "str" => Ok(KeyKind::String),
            other => Err(Error::InvalidKeyKind(other.to_string())),
        }
    }
}
