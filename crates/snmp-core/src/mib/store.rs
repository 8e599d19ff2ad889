//! Ordered object table.
//!
//! [`MibStore`] keeps entries in a `BTreeMap` keyed by [`Oid`], whose
//! ordering is the lexicographic identifier order. Point lookups are map
//! lookups and bulk walks are range queries starting just after the given
//! identifier.
//!
//! # Thread Safety
//!
//! [`MibStore`] itself is single-threaded. Connection workers share a
//! [`SharedMib`], which serializes every operation behind one mutex so a write
//! on one connection is never observed half-applied by a read on another.
//!
//! # Invariants
//!
//! - [INV-MIB-001] An entry's access mode and declared type never change.
//! - [INV-MIB-002] A failed `set_all` writes nothing.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Access, MibError, MibResult};
use crate::protocol::{Oid, Value, ValueType, VarBind};

/// A single managed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MibEntry {
    value: Value,
    access: Access,
}

impl MibEntry {
    /// Create a new entry. The value's type becomes the declared type.
    #[must_use]
    pub const fn new(value: Value, access: Access) -> Self {
        Self { value, access }
    }

    /// Current value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Access mode.
    #[must_use]
    pub const fn access(&self) -> Access {
        self.access
    }

    /// Declared type.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value.value_type()
    }
}

/// Managed objects ordered by identifier.
#[derive(Debug, Clone, Default)]
pub struct MibStore {
    entries: BTreeMap<Oid, MibEntry>,
}

impl MibStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object, returning the entry it replaced, if any.
    pub fn insert(&mut self, oid: Oid, value: Value, access: Access) -> Option<MibEntry> {
        self.entries.insert(oid, MibEntry::new(value, access))
    }

    /// Look up the full entry for `oid`.
    #[must_use]
    pub fn entry(&self, oid: &Oid) -> Option<&MibEntry> {
        self.entries.get(oid)
    }

    /// Exact-match lookup.
    ///
    /// # Errors
    ///
    /// Returns [`MibError::NoSuchObject`] if no object has this identifier.
    pub fn get(&self, oid: &Oid) -> MibResult<Value> {
        self.entries
            .get(oid)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| MibError::NoSuchObject(oid.clone()))
    }

    /// Up to `count` objects strictly after `oid`, in ascending order.
    ///
    /// Returns fewer than `count` bindings only when the table is exhausted.
    /// `oid` need not name an existing object.
    #[must_use]
    pub fn get_next(&self, oid: &Oid, count: usize) -> Vec<VarBind> {
        self.entries
            .range::<Oid, _>((Bound::Excluded(oid), Bound::Unbounded))
            .take(count)
            .map(|(oid, entry)| VarBind::new(oid.clone(), entry.value.clone()))
            .collect()
    }

    /// Check whether `value` could be written to `oid`, without writing.
    ///
    /// # Errors
    ///
    /// - [`MibError::NoSuchObject`] if absent
    /// - [`MibError::ReadOnly`] if the object is read-only
    /// - [`MibError::TypeMismatch`] if the value's type differs from the
    ///   object's
    pub fn check_set(&self, oid: &Oid, value: &Value) -> MibResult<()> {
        let entry = self
            .entries
            .get(oid)
            .ok_or_else(|| MibError::NoSuchObject(oid.clone()))?;
        if !entry.access.is_writable() {
            return Err(MibError::ReadOnly(oid.clone()));
        }
        if entry.value_type() != value.value_type() {
            return Err(MibError::TypeMismatch {
                oid: oid.clone(),
                expected: entry.value_type(),
                actual: value.value_type(),
            });
        }
        Ok(())
    }

    /// Replace the value of a writable object.
    ///
    /// # Errors
    ///
    /// See [`MibStore::check_set`]. On error the store is unchanged.
    pub fn set(&mut self, oid: &Oid, value: Value) -> MibResult<()> {
        self.check_set(oid, &value)?;
        if let Some(entry) = self.entries.get_mut(oid) {
            entry.value = value;
        }
        Ok(())
    }

    /// Apply several writes as one unit.
    ///
    /// Every binding is checked in order first; the first failure is returned
    /// and nothing is written. Otherwise all bindings are applied in order and
    /// the resulting bindings are returned.
    ///
    /// # Errors
    ///
    /// The first error [`MibStore::check_set`] reports, in binding order.
    pub fn set_all(&mut self, bindings: &[VarBind]) -> MibResult<Vec<VarBind>> {
        for binding in bindings {
            self.check_set(&binding.oid, &binding.value)?;
        }
        for binding in bindings {
            if let Some(entry) = self.entries.get_mut(&binding.oid) {
                entry.value = binding.value.clone();
            }
        }
        Ok(bindings.to_vec())
    }

    /// Replace the value of an object regardless of its access mode.
    ///
    /// Used for values the agent maintains itself, such as uptime.
    ///
    /// # Errors
    ///
    /// [`MibError::NoSuchObject`] if absent, [`MibError::TypeMismatch`] if
    /// the value's type differs from the object's.
    pub fn refresh(&mut self, oid: &Oid, value: Value) -> MibResult<()> {
        let entry = self
            .entries
            .get_mut(oid)
            .ok_or_else(|| MibError::NoSuchObject(oid.clone()))?;
        if entry.value_type() != value.value_type() {
            return Err(MibError::TypeMismatch {
                oid: oid.clone(),
                expected: entry.value_type(),
                actual: value.value_type(),
            });
        }
        entry.value = value;
        Ok(())
    }

    /// Number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store has no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over objects in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&Oid, &MibEntry)> {
        self.entries.iter()
    }
}

/// A [`MibStore`] shared between connection workers.
///
/// Cloning the handle is cheap; all clones refer to the same store. Each
/// method takes the lock once for its whole duration.
#[derive(Debug, Clone, Default)]
pub struct SharedMib {
    inner: Arc<Mutex<MibStore>>,
}

impl SharedMib {
    /// Wrap a store for sharing.
    #[must_use]
    pub fn new(store: MibStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MibStore> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`MibStore::get`].
    ///
    /// # Errors
    ///
    /// [`MibError::NoSuchObject`] if absent.
    pub fn get(&self, oid: &Oid) -> MibResult<Value> {
        self.lock().get(oid)
    }

    /// Look up several identifiers against one consistent view of the store.
    ///
    /// # Errors
    ///
    /// The first [`MibError::NoSuchObject`] in request order.
    pub fn get_many(&self, oids: &[Oid]) -> MibResult<Vec<VarBind>> {
        let store = self.lock();
        oids.iter()
            .map(|oid| store.get(oid).map(|value| VarBind::new(oid.clone(), value)))
            .collect()
    }

    /// See [`MibStore::get_next`].
    #[must_use]
    pub fn get_next(&self, oid: &Oid, count: usize) -> Vec<VarBind> {
        self.lock().get_next(oid, count)
    }

    /// See [`MibStore::set`].
    ///
    /// # Errors
    ///
    /// See [`MibStore::check_set`].
    pub fn set(&self, oid: &Oid, value: Value) -> MibResult<()> {
        self.lock().set(oid, value)
    }

    /// See [`MibStore::set_all`].
    ///
    /// # Errors
    ///
    /// See [`MibStore::check_set`].
    pub fn set_all(&self, bindings: &[VarBind]) -> MibResult<Vec<VarBind>> {
        self.lock().set_all(bindings)
    }

    /// See [`MibStore::refresh`].
    ///
    /// # Errors
    ///
    /// See [`MibStore::refresh`].
    pub fn refresh(&self, oid: &Oid, value: Value) -> MibResult<()> {
        self.lock().refresh(oid, value)
    }

    /// Number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if the store has no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl From<MibStore> for SharedMib {
    fn from(store: MibStore) -> Self {
        Self::new(store)
    }
}
