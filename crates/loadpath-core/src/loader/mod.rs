//! Loaders turn a located unit into a registered, executed [`Module`].
//!
//! Every concrete loader funnels through [`load_with`], which owns the unit
//! lifecycle:
//!
//! ```text
//! load_with(importer, "pkg.mod", is_package, init)
//!   ├── registered?  yes → snapshot state (reload)
//!   │                no  → create unit, register it
//!   ├── init(unit)
//!   └── on error     reload     → restore snapshot
//!                    first load → unregister
//! ```

pub mod extension;
pub mod source;

pub use extension::{ExtensionFileLoader, NativeInit, NativeModules, EXTENSION_SUFFIXES};
pub use source::{
    CodeOrigin, SourceFileLoader, SourceLoader, SourcelessFileLoader, PACKAGE_INIT_STEM,
};

use crate::compiler::{CodeObject, Compiler};
use crate::config::ImportFlags;
use crate::error::{ImportError, ImportResult};
use crate::importer::Importer;
use crate::module::Module;
use crate::name::package_of;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What kind of provider a loader represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderKind {
    Builtin,
    Frozen,
    Source,
    Sourceless,
    Extension,
    Custom,
}

impl LoaderKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Frozen => "frozen",
            Self::Source => "source",
            Self::Sourceless => "sourceless",
            Self::Extension => "extension",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A capability that executes or initializes a unit.
///
/// Only [`Loader::load_module`] is required. A loader that registers the
/// unit itself (as [`load_with`] does) is authoritative: the importer
/// returns the registry's entry rather than the loader's return value.
pub trait Loader: Send + Sync + fmt::Debug {
    /// Load `fullname`, returning the executed unit.
    fn load_module(
        self: Arc<Self>,
        importer: &Importer,
        fullname: &str,
    ) -> ImportResult<Arc<Module>>;

    fn kind(&self) -> LoaderKind {
        LoaderKind::Custom
    }

    fn is_package(&self, _fullname: &str) -> bool {
        false
    }

    /// Decoded source text, if this loader has any.
    fn get_source(&self, _fullname: &str) -> ImportResult<Option<String>> {
        Ok(None)
    }

    /// Executable representation, if this loader has one.
    fn get_code(&self, _fullname: &str) -> ImportResult<Option<CodeObject>> {
        Ok(None)
    }

    /// Path of the file backing the unit.
    fn get_filename(&self, _fullname: &str) -> Option<PathBuf> {
        None
    }

    /// Raw bytes of a file this loader can read.
    fn get_data(&self, path: &Path) -> ImportResult<Vec<u8>> {
        std::fs::read(path).map_err(|e| ImportError::io(path, e))
    }
}

/// Collaborators shared by every loader an importer creates.
#[derive(Debug, Clone)]
pub struct LoaderEnv {
    pub compiler: Arc<dyn Compiler>,
    pub flags: Arc<ImportFlags>,
}

impl LoaderEnv {
    #[must_use]
    pub fn new(compiler: Arc<dyn Compiler>, flags: Arc<ImportFlags>) -> Self {
        Self { compiler, flags }
    }
}

/// Run `init` against the registered unit for `fullname`, creating and
/// registering it first if needed.
///
/// A failure on first load removes the registry entry; a failure on reload
/// restores the unit's previous state and leaves the entry in place.
pub fn load_with<F>(
    importer: &Importer,
    fullname: &str,
    is_package: bool,
    init: F,
) -> ImportResult<Arc<Module>>
where
    F: FnOnce(&Arc<Module>) -> ImportResult<()>,
{
    let registry = importer.registry();
    let (module, previous) = match registry.get_module(fullname) {
        Some(existing) => {
            let state = existing.snapshot();
            (existing, Some(state))
        }
        None => {
            let module = Module::new(fullname);
            registry.insert(fullname, Arc::clone(&module));
            (module, None)
        }
    };

    if module.package().is_none() {
        module.set_package(Some(package_of(fullname, is_package)));
    }

    match init(&module) {
        Ok(()) => Ok(module),
        Err(e) => {
            match previous {
                Some(state) => {
                    tracing::debug!(
                        name = fullname,
                        error = %e,
                        "reload failed, restoring previous state"
                    );
                    module.restore(state);
                }
                None => {
                    tracing::debug!(name = fullname, error = %e, "load failed, unregistering");
                    registry.remove(fullname);
                }
            }
            Err(e)
        }
    }
}
