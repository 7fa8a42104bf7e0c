//! Reconciliation configuration.

use crate::{KeyKind, OperationSet};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// What to do when a classified key cannot be acted upon because the local
/// index, the remote key map and the store disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyPolicy {
    /// Log, record a warning in the report, and carry on (default)
    #[default]
    Warn,
    /// Abort the pass with [`ReconcileError::Inconsistent`](crate::ReconcileError::Inconsistent)
    Fail,
}

impl fmt::Display for ConsistencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyPolicy::Warn => write!(f, "warn"),
            ConsistencyPolicy::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for ConsistencyPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(ConsistencyPolicy::Warn),
            "fail" => Ok(ConsistencyPolicy::Fail),
            other => Err(crate::Error::InvalidPolicy(other.to_string())),
        }
    }
}

/// Options for a [`Reconciler`](crate::Reconciler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconcileConfig {
    /// Which classifications to execute
    pub operations: OperationSet,
    /// Handling of keys the index and the store disagree about
    pub on_inconsistency: ConsistencyPolicy,
    /// Accept only remote keys of this kind
    pub key_kind: Option<KeyKind>,
}

impl ReconcileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(mut self, operations: impl Into<OperationSet>) -> Self {
        self.operations = operations.into();
        self
    }

    pub fn on_inconsistency(mut self, policy: ConsistencyPolicy) -> Self {
        self.on_inconsistency = policy;
        self
    }

    pub fn key_kind(mut self, kind: KeyKind) -> Self {
        self.key_kind = Some(kind);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// - `SIFT_OPERATIONS`: `all`, `none`, or e.g. `insert,update`
    /// - `SIFT_ON_INCONSISTENCY`: `warn` or `fail`
    /// - `SIFT_KEY_KIND`: `int` or `string`
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("SIFT_OPERATIONS") {
            config.operations = value
                .parse()
                .map_err(|_| ConfigError::InvalidOperations(value))?;
        }

        if let Some(value) = lookup("SIFT_ON_INCONSISTENCY") {
            config.on_inconsistency = value
                .parse()
                .map_err(|_| ConfigError::InvalidPolicy(value))?;
        }

        if let Some(value) = lookup("SIFT_KEY_KIND") {
            config.key_kind = Some(
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidKeyKind(value))?,
            );
        }

        Ok(config)
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid SIFT_OPERATIONS value: {0}")]
    InvalidOperations(String),

    #[error("Invalid SIFT_ON_INCONSISTENCY value: {0}")]
    InvalidPolicy(String),

    #[error("Invalid SIFT_KEY_KIND value: {0}")]
    InvalidKeyKind(String),
}
