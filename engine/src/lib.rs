//! # Sift Engine
//!
//! Key-based reconciliation of remote records against a local store.
//!
//! Given a batch of remote records and the local records of the same entity,
//! the engine works out which local records to delete, which remote records
//! to insert, and which pairs to update, matching them by a key field. It
//! deletes orphaned local records itself and hands inserts and updates to
//! caller-supplied handlers.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never touches storage or the network directly;
//!   everything goes through the [`LocalStore`] trait and the handlers
//! - **Deterministic**: missing, null and duplicate keys are handled by fixed
//!   rules, and every pass runs deletions, insertions and updates in that order
//! - **Call-scoped**: indexes and key maps are rebuilt on every call; nothing
//!   is cached between passes
//!
//! ## Core Concepts
//!
//! ### Keys
//!
//! A [`KeyValue`] is a JSON integer or string read from a key field. Remote
//! records whose key is absent, null or not usable as a key take no part in
//! matching.
//!
//! ### Classification
//!
//! With `L` the local keys and `R` the remote keys:
//! - delete = `L - R`
//! - insert = `R - L`
//! - update = `R ∩ L`
//!
//! An [`OperationSet`] selects which of the three are executed.
//!
//! ### Stores
//!
//! [`LocalStore`] is the storage contract. Building a key index through it
//! also deletes local records with a missing or repeated key. [`MemoryStore`]
//! is an in-memory implementation.
//!
//! ## Quick Start
//!
//! ```rust
//! use sift_engine::{changes, KeyValue, MemoryStore, RemoteRecord};
//! use serde_json::json;
//!
//! let mut store = MemoryStore::new().with_entity("users");
//! store.insert("users", json!({"id": 1, "name": "Old"})).unwrap();
//! store.insert("users", json!({"id": 2, "name": "Bob"})).unwrap();
//!
//! let remote: Vec<RemoteRecord> = serde_json::from_value(json!([
//!     {"id": 2, "name": "Robert"},
//!     {"id": 3, "name": "Carol"},
//! ]))
//! .unwrap();
//!
//! let report = changes(
//!     &mut store,
//!     &remote,
//!     "users",
//!     "id",
//!     "id",
//!     |record, store| store.insert_remote("users", record).map(|_| ()),
//!     |record, local| {
//!         local.assign(record);
//!         Ok(())
//!     },
//! )
//! .unwrap();
//!
//! assert_eq!(report.deleted, vec![KeyValue::Int(1)]);
//! assert_eq!(report.inserted, vec![KeyValue::Int(3)]);
//! assert_eq!(report.updated, vec![KeyValue::Int(2)]);
//! assert_eq!(store.keys("users", "id"), vec![KeyValue::Int(2), KeyValue::Int(3)]);
//! ```
//!
//! ## Errors
//!
//! Handler failures stop the current pass and surface as
//! [`ReconcileError::Handler`]. Nothing already done is rolled back; running
//! the same reconciliation again picks up where it stopped.

pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod key;
pub mod operation;
pub mod reconcile;
pub mod record;
pub mod store;

// Re-export main types at crate root
pub use config::{ConfigError, ConsistencyPolicy, ReconcileConfig};
pub use error::{ConsistencyWarning, Error, InconsistencyReason, KeyRole, ReconcileError};
pub use extract::RemoteKeys;
pub use index::LocalKeyIndex;
pub use key::{KeyKind, KeyValue};
pub use operation::{Operation, OperationSet};
pub use reconcile::{changes, Classification, ReconcileReport, Reconciler};
pub use record::RemoteRecord;
pub use store::{Entity, LocalHandle, LocalRecord, LocalStore, MemoryStore};

/// Name of a local entity (table, collection)
pub type EntityName = String;
