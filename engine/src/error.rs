//! Error types for the sift engine.

use crate::{EntityName, KeyValue, Operation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which side of the reconciliation a key field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    Local,
    Remote,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRole::Local => write!(f, "local"),
            KeyRole::Remote => write!(f, "remote"),
        }
    }
}

/// All possible errors from the engine and its in-memory store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Configuration errors
    #[error("{0} key field must not be empty")]
    EmptyKeyField(KeyRole),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("invalid key kind: {0}")]
    InvalidKeyKind(String),

    #[error("invalid consistency policy: {0}")]
    InvalidPolicy(String),

    // Record errors
    #[error("type mismatch for field '{field}': expected {expected}, got {got}")]
    FieldType {
        field: String,
        expected: String,
        got: String,
    },

    #[error("record must be an object, got {0}")]
    NotAnObject(String),

    // Store errors
    #[error("entity not found: {0}")]
    EntityNotFound(EntityName),

    #[error("stale handle: {0}")]
    StaleHandle(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a classified key could not be acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InconsistencyReason {
    /// The key was classified from the local index but has no handle in it
    MissingLocalHandle,
    /// The key was classified from the remote keys but has no record
    MissingRemoteRecord,
    /// The store no longer resolves the indexed handle
    StaleHandle,
}

impl fmt::Display for InconsistencyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InconsistencyReason::MissingLocalHandle => write!(f, "no local handle for key"),
            InconsistencyReason::MissingRemoteRecord => write!(f, "no remote record for key"),
            InconsistencyReason::StaleHandle => write!(f, "local handle no longer resolves"),
        }
    }
}

/// A key skipped because the index and the store (or the remote key map)
/// disagree about it.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{operation} skipped key {key}: {reason}")]
pub struct ConsistencyWarning {
    pub operation: Operation,
    pub key: KeyValue,
    pub reason: InconsistencyReason,
}

/// Errors returned by a reconciliation pass.
///
/// `E` is the error type of the caller's insert and update handlers.
#[derive(Debug, Error)]
pub enum ReconcileError<E> {
    /// Rejected before any work was done
    #[error("invalid configuration: {0}")]
    Config(Error),

    #[error("store error: {0}")]
    Store(Error),

    /// Only raised under [`ConsistencyPolicy::Fail`](crate::ConsistencyPolicy::Fail)
    #[error("inconsistent index: {0}")]
    Inconsistent(ConsistencyWarning),

    /// A handler failed; work completed before it is not undone
    #[error("{operation} handler failed for key {key}: {error}")]
    Handler {
        operation: Operation,
        key: KeyValue,
        error: E,
    },
}

impl<E> ReconcileError<E> {
    /// The handler's error, if this is a handler failure.
    pub fn handler_error(&self) -> Option<&E> {
        match self {
            ReconcileError::Handler { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Consume and return the handler's error, if this is a handler failure.
    pub fn into_handler_error(self) -> Option<E> {
        match self {
            ReconcileError::Handler { error, .. } => Some(error),
            _ => None,
        }
    }
}
