//! Managed object store.
//!
//! The MIB (management information base) is the agent's table of addressable
//! objects. Each object has a typed value and a fixed access mode; the table
//! is kept in identifier order so bulk walks are successor queries.
//!
//! # Module Overview
//!
//! - [`store`]: the ordered table ([`MibStore`]) and its lock-guarded shared
//!   handle ([`SharedMib`])
//! - [`seed`]: loading the initial table from TOML ([`SeedTable`])
//!
//! # Error Reporting
//!
//! Store failures are application errors. They never close a connection;
//! the agent maps them to a response status with [`MibError::status`].

pub mod seed;
pub mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::{ErrorStatus, Oid, ValueType};

pub use seed::{SeedError, SeedObject, SeedTable, SeedValue};
pub use store::{MibEntry, MibStore, SharedMib};

/// Whether an object accepts writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    /// Reads only. The default for seeded objects.
    #[default]
    ReadOnly,
    /// Reads and writes.
    ReadWrite,
}

impl Access {
    /// Returns `true` if the object accepts `set`.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// Application-level store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MibError {
    /// No object has this identifier.
    #[error("no such object: {0}")]
    NoSuchObject(Oid),

    /// The object does not accept writes.
    #[error("object is read-only: {0}")]
    ReadOnly(Oid),

    /// The supplied value's type differs from the object's declared type.
    #[error("type mismatch for {oid}: object is {expected}, value is {actual}")]
    TypeMismatch {
        /// Target object.
        oid: Oid,
        /// Declared type of the object.
        expected: ValueType,
        /// Type of the rejected value.
        actual: ValueType,
    },
}

impl MibError {
    /// The response status that reports this failure.
    #[must_use]
    pub const fn status(&self) -> ErrorStatus {
        match self {
            Self::NoSuchObject(_) => ErrorStatus::NoSuchObject,
            Self::ReadOnly(_) => ErrorStatus::ReadOnly,
            Self::TypeMismatch { .. } => ErrorStatus::BadValue,
        }
    }

    /// The identifier the failure is about.
    #[must_use]
    pub const fn oid(&self) -> &Oid {
        match self {
            Self::NoSuchObject(oid) | Self::ReadOnly(oid) | Self::TypeMismatch { oid, .. } => oid,
        }
    }
}

/// Result type for store operations.
pub type MibResult<T> = Result<T, MibError>;
