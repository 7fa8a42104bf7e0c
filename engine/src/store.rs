//! Storage collaborator contract and an in-memory implementation.
//!
//! The reconciler never touches storage directly. It asks a [`LocalStore`]
//! for a key index, resolves handles to records for updates, and deletes
//! records whose key disappeared remotely.

use crate::{
    error::Result, record::json_type_name, EntityName, Error, KeyValue, LocalKeyIndex,
    RemoteRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// The storage side of a reconciliation.
pub trait LocalStore {
    /// Opaque identifier of a local record.
    type Handle: Clone + fmt::Debug;
    /// The mutable local record handed to update handlers.
    type Record;

    /// Build the key index for `entity`, restricted to records matching
    /// `predicate` when one is given.
    ///
    /// Implementations must return unique keys. Before returning they delete
    /// every in-scope record that has no usable `key_field` value, and every
    /// record repeating a key already indexed. Callers should be aware that
    /// building an index therefore mutates the store.
    fn index_keys(
        &mut self,
        entity: &str,
        key_field: &str,
        predicate: Option<&dyn Fn(&Self::Record) -> bool>,
    ) -> Result<LocalKeyIndex<Self::Handle>>;

    /// Resolve a handle to its record. Fails with [`Error::StaleHandle`] if
    /// the record is gone.
    fn resolve(&mut self, handle: &Self::Handle) -> Result<&mut Self::Record>;

    /// Delete the record behind a handle. Fails with [`Error::StaleHandle`]
    /// if the record is gone.
    fn delete(&mut self, handle: &Self::Handle) -> Result<()>;
}

/// Handle of a record in a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalHandle {
    pub entity: EntityName,
    pub id: u64,
}

impl fmt::Display for LocalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity, self.id)
    }
}

/// A record held by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRecord {
    /// Store-assigned identifier, unique across entities
    pub id: u64,
    /// Entity this record belongs to
    pub entity: EntityName,
    pub fields: Map<String, Value>,
}

impl LocalRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a field, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// The matching key held in `field`, if usable as a key.
    pub fn key(&self, field: &str) -> Option<KeyValue> {
        self.fields.get(field).and_then(KeyValue::from_json)
    }

    /// Copy every field of a remote record over this record.
    pub fn assign(&mut self, remote: &RemoteRecord) {
        for (field, value) in remote.fields() {
            self.fields.insert(field.clone(), value.clone());
        }
    }

    pub fn handle(&self) -> LocalHandle {
        LocalHandle {
            entity: self.entity.clone(),
            id: self.id,
        }
    }
}

/// Records of one entity, in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    records: BTreeMap<u64, LocalRecord>,
}

impl Entity {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    pub fn get(&self, id: u64) -> Option<&LocalRecord> {
        self.records.get(&id)
    }

    pub fn records(&self) -> impl Iterator<Item = &LocalRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// An in-memory [`LocalStore`] of JSON-field records grouped by entity.
///
/// Entities must be registered before records can be inserted into them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStore {
    entities: HashMap<EntityName, Entity>,
    next_id: u64,
}

impl MemoryStore {
    /// Create an empty store with no entities.
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
        }
    }

    /// Builder-style [`add_entity`](Self::add_entity).
    pub fn with_entity(mut self, name: impl Into<EntityName>) -> Self {
        self.add_entity(name);
        self
    }

    /// Register an entity. Registering an existing entity is a no-op.
    pub fn add_entity(&mut self, name: impl Into<EntityName>) {
        self.entities.entry(name.into()).or_default();
    }

    /// Insert a new record built from a JSON object.
    pub fn insert(&mut self, entity: &str, fields: Value) -> Result<LocalHandle> {
        let fields = match fields {
            Value::Object(fields) => fields,
            other => return Err(Error::NotAnObject(json_type_name(&other).to_string())),
        };
        self.insert_fields(entity, fields)
    }

    /// Insert a new record with the fields of a remote record.
    pub fn insert_remote(&mut self, entity: &str, remote: &RemoteRecord) -> Result<LocalHandle> {
        self.insert_fields(entity, remote.fields().clone())
    }

    fn insert_fields(&mut self, entity: &str, fields: Map<String, Value>) -> Result<LocalHandle> {
        let records = self
            .entities
            .get_mut(entity)
            .ok_or_else(|| Error::EntityNotFound(entity.to_string()))?;

        // Default-constructed stores start at 0
        let id = self.next_id.max(1);
        self.next_id = id + 1;

        let record = LocalRecord {
            id,
            entity: entity.to_string(),
            fields,
        };
        let handle = record.handle();
        records.records.insert(id, record);
        Ok(handle)
    }

    /// Get a record by handle.
    pub fn get(&self, handle: &LocalHandle) -> Option<&LocalRecord> {
        self.entities
            .get(&handle.entity)
            .and_then(|e| e.get(handle.id))
    }

    /// Find the first record of `entity` whose `field` holds `key`.
    pub fn find(&self, entity: &str, field: &str, key: &KeyValue) -> Option<&LocalRecord> {
        self.entities
            .get(entity)?
            .records()
            .find(|r| r.key(field).as_ref() == Some(key))
    }

    /// Get an entity by name.
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Count of records in `entity` (0 if unknown).
    pub fn len(&self, entity: &str) -> usize {
        self.entities.get(entity).map_or(0, Entity::len)
    }

    /// Check if the store holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.entities.values().all(Entity::is_empty)
    }

    /// Sorted key values found in `field` across `entity`.
    pub fn keys(&self, entity: &str, field: &str) -> Vec<KeyValue> {
        let mut keys: Vec<_> = self
            .entities
            .get(entity)
            .into_iter()
            .flat_map(Entity::records)
            .filter_map(|r| r.key(field))
            .collect();
        keys.sort();
        keys
    }
}

impl LocalStore for MemoryStore {
    type Handle = LocalHandle;
    type Record = LocalRecord;

    fn index_keys(
        &mut self,
        entity: &str,
        key_field: &str,
        predicate: Option<&dyn Fn(&LocalRecord) -> bool>,
    ) -> Result<LocalKeyIndex<LocalHandle>> {
        let records = self
            .entities
            .get_mut(entity)
            .ok_or_else(|| Error::EntityNotFound(entity.to_string()))?;

        let mut index = LocalKeyIndex::new();
        let mut doomed = Vec::new();

        // Oldest record keeps a contested key
        for record in records.records.values() {
            if predicate.is_some_and(|matches| !matches(record)) {
                continue;
            }
            match record.key(key_field) {
                Some(key) if !index.contains_key(&key) => {
                    index.insert(key, record.handle());
                }
                Some(key) => {
                    tracing::debug!(
                        entity,
                        %key,
                        id = record.id,
                        "deleting local record with duplicate key"
                    );
                    doomed.push(record.id);
                }
                None => {
                    tracing::debug!(entity, id = record.id, "deleting local record without key");
                    doomed.push(record.id);
                }
            }
        }

        for id in doomed {
            records.records.remove(&id);
        }

        Ok(index)
    }

    fn resolve(&mut self, handle: &LocalHandle) -> Result<&mut LocalRecord> {
        self.entities
            .get_mut(&handle.entity)
            .and_then(|e| e.records.get_mut(&handle.id))
            .ok_or_else(|| Error::StaleHandle(handle.to_string()))
    }

    fn delete(&mut self, handle: &LocalHandle) -> Result<()> {
        self.entities
            .get_mut(&handle.entity)
            .and_then(|e| e.records.remove(&handle.id))
            .map(|_| ())
            .ok_or_else(|| Error::StaleHandle(handle.to_string()))
    }
}
