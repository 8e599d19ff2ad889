//! Initial object table loaded from TOML.
//!
//! A seed file lists objects as an array of tables:
//!
//! ```toml
//! [[object]]
//! oid = "1.3.6.1.2.1.1.5.0"
//! type = "string"
//! value = "router-main"
//! access = "read-write"
//! ```
//!
//! `type` is one of `integer`, `string`, `counter`, `timeticks`. `access`
//! defaults to `read-only`. Numeric values are TOML integers and are range
//! checked against the declared type.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::{Access, MibStore};
use crate::protocol::{Oid, ProtocolError, Value, ValueType};

/// Errors from loading a seed table.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The seed file could not be read.
    #[error("failed to read seed file {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid TOML or does not match the seed layout.
    #[error("invalid seed document: {0}")]
    Parse(#[from] toml::de::Error),

    /// An `oid` field is not a valid identifier.
    #[error("invalid identifier '{oid}': {source}")]
    InvalidOid {
        /// Identifier text as written.
        oid: String,
        /// Parse failure.
        #[source]
        source: ProtocolError,
    },

    /// A `value` does not fit its declared type.
    #[error("invalid {value_type} value for {oid}: {reason}")]
    InvalidValue {
        /// Target object.
        oid: Oid,
        /// Declared type.
        value_type: ValueType,
        /// What is wrong with the value.
        reason: String,
    },

    /// The same identifier appears twice.
    #[error("duplicate identifier {0}")]
    DuplicateOid(Oid),
}

/// A raw seed value before type checking.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SeedValue {
    /// TOML integer.
    Number(i64),
    /// TOML string.
    Text(String),
}

/// One `[[object]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedObject {
    /// Dotted identifier.
    pub oid: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Initial value.
    pub value: SeedValue,
    /// Access mode.
    #[serde(default)]
    pub access: Access,
}

impl SeedObject {
    /// Parse the identifier and check the value against the declared type.
    ///
    /// # Errors
    ///
    /// [`SeedError::InvalidOid`] or [`SeedError::InvalidValue`].
    pub fn resolve(&self) -> Result<(Oid, Value), SeedError> {
        let oid: Oid = self.oid.parse().map_err(|source| SeedError::InvalidOid {
            oid: self.oid.clone(),
            source,
        })?;
        let invalid = |reason: String| SeedError::InvalidValue {
            oid: oid.clone(),
            value_type: self.value_type,
            reason,
        };

        let value = match (self.value_type, &self.value) {
            (ValueType::Text, SeedValue::Text(text)) => Value::Text(text.clone()),
            (ValueType::Integer, SeedValue::Number(n)) => i32::try_from(*n)
                .map(Value::Integer)
                .map_err(|_| invalid(format!("{n} is out of range")))?,
            (ValueType::Counter, SeedValue::Number(n)) => u32::try_from(*n)
                .map(Value::Counter)
                .map_err(|_| invalid(format!("{n} is out of range")))?,
            (ValueType::Ticks, SeedValue::Number(n)) => u32::try_from(*n)
                .map(Value::Ticks)
                .map_err(|_| invalid(format!("{n} is out of range")))?,
            (ValueType::Text, SeedValue::Number(_)) => {
                return Err(invalid("expected a string".to_string()));
            },
            (_, SeedValue::Text(_)) => return Err(invalid("expected an integer".to_string())),
        };
        Ok((oid, value))
    }
}

/// A parsed seed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedTable {
    /// Objects in file order.
    #[serde(default, rename = "object")]
    pub objects: Vec<SeedObject>,
}

impl SeedTable {
    /// Parse a seed document.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::Parse`] for malformed TOML or unknown fields.
    pub fn from_toml(text: &str) -> Result<Self, SeedError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a seed file.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::Io`] if the file cannot be read, otherwise see
    /// [`SeedTable::from_toml`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Build a store from this table.
    ///
    /// # Errors
    ///
    /// The first invalid object, or [`SeedError::DuplicateOid`].
    pub fn into_store(self) -> Result<MibStore, SeedError> {
        let mut store = MibStore::new();
        for object in &self.objects {
            let (oid, value) = object.resolve()?;
            if store.entry(&oid).is_some() {
                return Err(SeedError::DuplicateOid(oid));
            }
            store.insert(oid, value, object.access);
        }
        Ok(store)
    }
}
