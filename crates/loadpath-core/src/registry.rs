//! Already-loaded unit registry.
//!
//! Maps absolute names to loaded units or to an explicit failure marker.
//! The importer never bypasses it for a name it holds.

use crate::module::Module;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A registry slot.
#[derive(Debug, Clone)]
pub enum RegistryEntry {
    Loaded(Arc<Module>),
    /// Requests for this name fail immediately.
    Failed,
}

/// Shared table of loaded units.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    entries: RwLock<HashMap<String, RegistryEntry>>,
}

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<RegistryEntry> {
        self.entries.read().get(name).cloned()
    }

    /// The loaded unit for `name`, ignoring failure markers.
    pub fn get_module(&self, name: &str) -> Option<Arc<Module>> {
        match self.entries.read().get(name) {
            Some(RegistryEntry::Loaded(m)) => Some(Arc::clone(m)),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Insert or overwrite the unit for `name`.
    pub fn insert(&self, name: impl Into<String>, module: Arc<Module>) {
        self.entries
            .write()
            .insert(name.into(), RegistryEntry::Loaded(module));
    }

    /// Map `name` to the failure marker.
    pub fn mark_failed(&self, name: impl Into<String>) {
        self.entries.write().insert(name.into(), RegistryEntry::Failed);
    }

    pub fn remove(&self, name: &str) -> Option<RegistryEntry> {
        self.entries.write().remove(name)
    }

    /// Put back a previously observed slot (or clear it if there was none).
    pub fn reinstate(&self, name: &str, previous: Option<RegistryEntry>) {
        let mut entries = self.entries.write();
        match previous {
            Some(entry) => {
                entries.insert(name.to_string(), entry);
            }
            None => {
                entries.remove(name);
            }
        }
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
