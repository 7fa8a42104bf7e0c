//! Local key index: matching key to local record handle.

use crate::{error::KeyRole, error::Result, Error, KeyValue, LocalStore};
use std::collections::BTreeMap;

/// Mapping from local key value to the handle of the record holding it.
///
/// Keys are unique. Iteration is in ascending key order, which makes the
/// deletion order of a reconciliation pass deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalKeyIndex<H> {
    entries: BTreeMap<KeyValue, H>,
}

impl<H> LocalKeyIndex<H> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Build the index for `entity` through the store.
    ///
    /// This is not a read-only operation: the store deletes records that lack
    /// `key_field` or repeat an already indexed key before returning. See
    /// [`LocalStore::index_keys`].
    pub fn build<S>(
        store: &mut S,
        entity: &str,
        key_field: &str,
        predicate: Option<&dyn Fn(&S::Record) -> bool>,
    ) -> Result<Self>
    where
        S: LocalStore<Handle = H>,
    {
        if key_field.is_empty() {
            return Err(Error::EmptyKeyField(KeyRole::Local));
        }
        let index = store.index_keys(entity, key_field, predicate)?;
        tracing::debug!(entity, keys = index.len(), "built local key index");
        Ok(index)
    }

    /// Insert a key, returning the handle it replaced.
    pub fn insert(&mut self, key: KeyValue, handle: H) -> Option<H> {
        self.entries.insert(key, handle)
    }

    pub fn get(&self, key: &KeyValue) -> Option<&H> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &KeyValue) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &KeyValue) -> Option<H> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &KeyValue> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyValue, &H)> {
        self.entries.iter()
    }
}

impl<H> Default for LocalKeyIndex<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> FromIterator<(KeyValue, H)> for LocalKeyIndex<H> {
    fn from_iter<I: IntoIterator<Item = (KeyValue, H)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
