//! Native extension units.
//!
//! An extension is a file with a platform library suffix found on the
//! search path. Initialization is delegated to an in-process function
//! registered in [`NativeModules`] under the unit's full name.

use super::{load_with, Loader, LoaderKind};
use crate::error::{ImportError, ImportResult};
use crate::importer::Importer;
use crate::module::Module;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File suffixes recognized as native extensions on this platform.
#[cfg(target_os = "windows")]
pub const EXTENSION_SUFFIXES: &[&str] = &[".dll"];
#[cfg(target_os = "macos")]
pub const EXTENSION_SUFFIXES: &[&str] = &[".dylib", ".so"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const EXTENSION_SUFFIXES: &[&str] = &[".so"];

/// Initializer for a native unit; populates the unit's namespace.
pub type NativeInit = Arc<dyn Fn(&Module) -> ImportResult<()> + Send + Sync>;

/// Table of native initializers keyed by full unit name.
#[derive(Default)]
pub struct NativeModules {
    inits: RwLock<HashMap<String, NativeInit>>,
}

impl NativeModules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the initializer for `name`.
    pub fn register<F>(&self, name: impl Into<String>, init: F)
    where
        F: Fn(&Module) -> ImportResult<()> + Send + Sync + 'static,
    {
        self.inits.write().insert(name.into(), Arc::new(init));
    }

    pub fn get(&self, name: &str) -> Option<NativeInit> {
        self.inits.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inits.read().contains_key(name)
    }
}

impl fmt::Debug for NativeModules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.inits.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("NativeModules").field("names", &names).finish()
    }
}

/// Loads an extension file through its registered initializer.
#[derive(Debug)]
pub struct ExtensionFileLoader {
    name: String,
    path: PathBuf,
    natives: Arc<NativeModules>,
}

impl ExtensionFileLoader {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        natives: Arc<NativeModules>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            natives,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Loader for ExtensionFileLoader {
    fn load_module(
        self: Arc<Self>,
        importer: &Importer,
        fullname: &str,
    ) -> ImportResult<Arc<Module>> {
        let init = self.natives.get(fullname).ok_or_else(|| ImportError::Extension {
            name: fullname.to_string(),
            path: self.path.clone(),
            reason: "no native initializer registered".to_string(),
        })?;
        let loader: Arc<dyn Loader> = self.clone();

        tracing::debug!(name = %self.name, path = %self.path.display(), "initializing extension");
        load_with(importer, fullname, false, |module| {
            module.set_origin(Some(self.path.display().to_string()));
            module.set_loader(Some(loader));
            init(module)
        })
    }

    fn kind(&self) -> LoaderKind {
        LoaderKind::Extension
    }

    fn get_filename(&self, _fullname: &str) -> Option<PathBuf> {
        Some(self.path.clone())
    }
}
