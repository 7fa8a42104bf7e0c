//! Remote records as handed over by the network/decoding layer.

use crate::{error::Result, Error, KeyKind, KeyValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One unit of remote change data: a mapping from field name to value.
///
/// Values are the closed JSON variant set (string, number, bool, null,
/// array, object). The typed accessors never coerce: asking for a string
/// where the field holds a number is a [`Error::FieldType`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteRecord {
    fields: Map<String, Value>,
}

impl RemoteRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Build a record from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(Error::NotAnObject(json_type_name(&other).to_string())),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Raw access to a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Extract the matching key from `field`.
    ///
    /// Returns `None` when the field is absent, null, not usable as a key,
    /// or not of the requested `kind`.
    pub fn key(&self, field: &str, kind: Option<KeyKind>) -> Option<KeyValue> {
        let key = self.fields.get(field).and_then(KeyValue::from_json)?;
        match kind {
            Some(kind) if !kind.accepts(&key) => None,
            _ => Some(key),
        }
    }

    /// Get a string field.
    pub fn get_str(&self, field: &str) -> Result<Option<&str>> {
        self.typed(field, "String", Value::as_str)
    }

    /// Get an integer field.
    pub fn get_i64(&self, field: &str) -> Result<Option<i64>> {
        self.typed(field, "Int", Value::as_i64)
    }

    /// Get a non-negative integer field.
    pub fn get_u64(&self, field: &str) -> Result<Option<u64>> {
        self.typed(field, "UInt", Value::as_u64)
    }

    /// Get a numeric field. Integers are accepted as well as floats.
    pub fn get_f64(&self, field: &str) -> Result<Option<f64>> {
        self.typed(field, "Float", Value::as_f64)
    }

    pub fn get_bool(&self, field: &str) -> Result<Option<bool>> {
        self.typed(field, "Bool", Value::as_bool)
    }

    /// Get a nested object field.
    pub fn get_object(&self, field: &str) -> Result<Option<&Map<String, Value>>> {
        self.typed(field, "Object", Value::as_object)
    }

    /// Get a nested array field.
    pub fn get_array(&self, field: &str) -> Result<Option<&Vec<Value>>> {
        self.typed(field, "Array", Value::as_array)
    }

    /// Absent and null fields are `Ok(None)`; anything else must convert.
    fn typed<'a, T>(
        &'a self,
        field: &str,
        expected: &str,
        convert: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<Option<T>> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => match convert(value) {
                Some(v) => Ok(Some(v)),
                None => Err(Error::FieldType {
                    field: field.to_string(),
                    expected: expected.to_string(),
                    got: json_type_name(value).to_string(),
                }),
            },
        }
    }
}

impl From<Map<String, Value>> for RemoteRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl TryFrom<Value> for RemoteRecord {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "Int",
        Value::Number(_) => "Float",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}
