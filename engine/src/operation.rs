//! The three reconciliation operations and sets of them.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

/// A classification a remote or local record can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Local record whose key is absent remotely
    Delete,
    /// Remote record whose key is absent locally
    Insert,
    /// Key present on both sides
    Update,
}

impl Operation {
    /// All operations, in execution order.
    pub const ALL: [Operation; 3] = [Operation::Delete, Operation::Insert, Operation::Update];

    fn bit(self) -> u8 {
        match self {
            Operation::Delete => 1 << 0,
            Operation::Insert => 1 << 1,
            Operation::Update => 1 << 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Delete => "delete",
            Operation::Insert => "insert",
            Operation::Update => "update",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delete" => Ok(Operation::Delete),
            "insert" => Ok(Operation::Insert),
            "update" => Ok(Operation::Update),
            other => Err(Error::InvalidOperation(other.to_string())),
        }
    }
}

/// A selection of operations to execute. Defaults to all three.
///
/// Serializes as a list of operation names, e.g. `["insert", "update"]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Operation>", into = "Vec<Operation>")]
pub struct OperationSet {
    bits: u8,
}

impl OperationSet {
    /// Every operation.
    pub const fn all() -> Self {
        Self { bits: 0b111 }
    }

    /// No operation.
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Just `op`.
    pub fn only(op: Operation) -> Self {
        Self { bits: op.bit() }
    }

    pub fn contains(self, op: Operation) -> bool {
        self.bits & op.bit() != 0
    }

    /// Add `op`, returning the new set.
    pub fn with(self, op: Operation) -> Self {
        Self {
            bits: self.bits | op.bit(),
        }
    }

    /// Remove `op`, returning the new set.
    pub fn without(self, op: Operation) -> Self {
        Self {
            bits: self.bits & !op.bit(),
        }
    }

    pub fn insert(&mut self, op: Operation) {
        self.bits |= op.bit();
    }

    pub fn remove(&mut self, op: Operation) {
        self.bits &= !op.bit();
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn is_all(self) -> bool {
        self == Self::all()
    }

    pub fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Iterate the contained operations in execution order.
    pub fn iter(self) -> impl Iterator<Item = Operation> {
        Operation::ALL.into_iter().filter(move |op| self.contains(*op))
    }
}

impl Default for OperationSet {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for OperationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for OperationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<_> = self.iter().map(Operation::as_str).collect();
        f.write_str(&names.join(","))
    }
}

/// Parses `"all"`, `"none"`, or a comma-separated list of operation names.
impl FromStr for OperationSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::all()),
            "" | "none" => Ok(Self::empty()),
            list => list.split(',').map(str::parse::<Operation>).collect(),
        }
    }
}

impl From<Operation> for OperationSet {
    fn from(op: Operation) -> Self {
        Self::only(op)
    }
}

impl FromIterator<Operation> for OperationSet {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl From<Vec<Operation>> for OperationSet {
    fn from(ops: Vec<Operation>) -> Self {
        ops.into_iter().collect()
    }
}

impl From<OperationSet> for Vec<Operation> {
    fn from(set: OperationSet) -> Self {
        set.iter().collect()
    }
}

impl BitOr<Operation> for Operation {
    type Output = OperationSet;

    fn bitor(self, rhs: Operation) -> OperationSet {
        OperationSet::only(self).with(rhs)
    }
}

impl BitOr<Operation> for OperationSet {
    type Output = OperationSet;

    fn bitor(self, rhs: Operation) -> OperationSet {
        self.with(rhs)
    }
}
