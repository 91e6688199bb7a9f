//! Built-in units compiled into the host process.

use super::Finder;
use crate::error::ImportResult;
use crate::importer::Importer;
use crate::loader::{load_with, Loader, LoaderKind, NativeInit};
use crate::module::Module;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Meta finder for built-in units.
///
/// Built-ins are always top level: any lookup with a search path is declined.
#[derive(Default)]
pub struct BuiltinImporter {
    units: RwLock<HashMap<String, NativeInit>>,
}

impl BuiltinImporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a built-in unit.
    pub fn register<F>(&self, name: impl Into<String>, init: F)
    where
        F: Fn(&Module) -> ImportResult<()> + Send + Sync + 'static,
    {
        self.units.write().insert(name.into(), Arc::new(init));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.read().contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.units.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for BuiltinImporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinImporter")
            .field("names", &self.names())
            .finish()
    }
}

impl Finder for BuiltinImporter {
    fn find_module(&self, fullname: &str, path: Option<&[String]>) -> Option<Arc<dyn Loader>> {
        if path.is_some() {
            return None;
        }
        let init = self.units.read().get(fullname).cloned()?;
        tracing::trace!(name = fullname, "builtin match");
        Some(Arc::new(BuiltinLoader { init }))
    }
}

/// Loader for one built-in unit.
pub struct BuiltinLoader {
    init: NativeInit,
}

impl fmt::Debug for BuiltinLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinLoader").finish_non_exhaustive()
    }
}

impl Loader for BuiltinLoader {
    fn load_module(
        self: Arc<Self>,
        importer: &Importer,
        fullname: &str,
    ) -> ImportResult<Arc<Module>> {
        let loader: Arc<dyn Loader> = self.clone();
        load_with(importer, fullname, false, |module| {
            module.set_origin(None);
            module.set_loader(Some(loader));
            (self.init)(module)
        })
    }

    fn kind(&self) -> LoaderKind {
        LoaderKind::Builtin
    }
}
