//! Key extraction from remote records.

use crate::{error::KeyRole, error::Result, Error, KeyKind, KeyValue, RemoteRecord};
use std::collections::HashMap;

/// Remote records keyed by their matching key.
///
/// Built once per reconciliation from the remote change set. Records with an
/// absent, null or mistyped key are left out entirely and only counted.
/// When two records share a key the later one wins in the map, while the key
/// keeps the position of its first occurrence in [`keys`](Self::keys).
#[derive(Debug, Clone, Default)]
pub struct RemoteKeys<'a> {
    by_key: HashMap<KeyValue, &'a RemoteRecord>,
    ordered: Vec<KeyValue>,
    skipped: usize,
    duplicates: usize,
}

impl<'a> RemoteKeys<'a> {
    /// Extract keys from `records` using `key_field`.
    ///
    /// `kind`, when set, rejects keys of the other kind as if they were absent.
    pub fn extract(
        records: &'a [RemoteRecord],
        key_field: &str,
        kind: Option<KeyKind>,
    ) -> Result<Self> {
        if key_field.is_empty() {
            return Err(Error::EmptyKeyField(KeyRole::Remote));
        }

        let mut keys = Self {
            by_key: HashMap::with_capacity(records.len()),
            ordered: Vec::with_capacity(records.len()),
            skipped: 0,
            duplicates: 0,
        };

        for record in records {
            let Some(key) = record.key(key_field, kind) else {
                keys.skipped += 1;
                continue;
            };

            if keys.by_key.insert(key.clone(), record).is_some() {
                tracing::debug!(%key, "duplicate remote key, later record wins");
                keys.duplicates += 1;
            } else {
                keys.ordered.push(key);
            }
        }

        Ok(keys)
    }

    /// The record for `key`, if any.
    pub fn get(&self, key: &KeyValue) -> Option<&'a RemoteRecord> {
        self.by_key.get(key).copied()
    }

    pub fn contains(&self, key: &KeyValue) -> bool {
        self.by_key.contains_key(key)
    }

    /// Distinct keys in remote order.
    pub fn keys(&self) -> &[KeyValue] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Number of records left out for lack of a usable key.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of records that overwrote an earlier record with the same key.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
