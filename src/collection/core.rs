use crate::document::Document;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Documents in insertion order. Readers share the lock; every mutating operation holds the
/// write lock until its changes are committed.
#[derive(Debug)]
pub struct Collection {
    pub name: Arc<RwLock<String>>,
    pub(crate) docs: RwLock<Vec<Document>>,
}

impl Collection {
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name: Arc::new(RwLock::new(name)), docs: RwLock::new(Vec::new()) }
    }

    pub fn set_name(&self, new_name: String) {
        *self.name.write() = new_name;
    }

    /// Returns the collection's name as a String (cloned), hiding the `RwLock`.
    #[must_use]
    pub fn name_str(&self) -> String {
        self.name.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Vec<Document>> {
        self.docs.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Vec<Document>> {
        self.docs.write()
    }
}
