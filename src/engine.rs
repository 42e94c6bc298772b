use crate::collection::Collection;
use crate::config::EngineConfig;
use crate::errors::DbError;
use crate::types::CollectionName;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// The in-memory engine: a registry of named collections.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) collections: RwLock<HashMap<CollectionName, Arc<Collection>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("collections", &self.list_collection_names())
            .finish()
    }
}

impl Engine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config, collections: RwLock::new(HashMap::new()) }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Creates a collection, or returns the existing one with that name.
    pub fn create_collection(&self, name: impl Into<String>) -> Arc<Collection> {
        let name = name.into();
        let mut map = self.collections.write();
        map.entry(name.clone())
            .or_insert_with(|| {
                log::debug!("created collection {name}");
                Arc::new(Collection::new(name.clone()))
            })
            .clone()
    }

    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    /// Removes a collection. Returns whether it existed.
    pub fn delete_collection(&self, name: &str) -> bool {
        let removed = self.collections.write().remove(name).is_some();
        if removed {
            log::debug!("dropped collection {name}");
        }
        removed
    }

    /// # Errors
    /// Returns `NoSuchCollection` if `old` does not exist, or `Config` if `new` is taken.
    pub fn rename_collection(&self, old: &str, new: &str) -> Result<(), DbError> {
        let mut map = self.collections.write();
        if old == new {
            return if map.contains_key(old) {
                Ok(())
            } else {
                Err(DbError::NoSuchCollection(old.to_string()))
            };
        }
        if map.contains_key(new) {
            return Err(DbError::Config(format!("collection {new} already exists")));
        }
        let col = map.remove(old).ok_or_else(|| DbError::NoSuchCollection(old.to_string()))?;
        col.set_name(new.to_string());
        map.insert(new.to_string(), col);
        log::debug!("renamed collection {old} -> {new}");
        Ok(())
    }

    /// Collection names, sorted.
    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }
}
