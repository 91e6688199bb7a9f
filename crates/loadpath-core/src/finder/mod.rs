//! Finders map a name (plus an optional search path) to a [`Loader`].
//!
//! Returning `None` means "not mine"; it is never an error. The importer
//! asks its meta finders in registration order and stops at the first hit.

pub mod builtin;
pub mod file;
pub mod frozen;
pub mod path;

pub use builtin::{BuiltinImporter, BuiltinLoader};
pub use file::{FileFinder, LoaderDetails, LoaderFactory};
pub use frozen::{FrozenImporter, FrozenLoader, FROZEN_ORIGIN};
pub use path::{default_loader_details, file_path_hook, PathEntryCache, PathFinder, PathHook};

use crate::loader::Loader;
use std::fmt;
use std::sync::Arc;

/// A capability that locates units.
pub trait Finder: Send + Sync + fmt::Debug {
    /// Find a loader for `fullname`.
    ///
    /// `path` is the parent package's search path, or `None` for a
    /// top-level lookup.
    fn find_module(&self, fullname: &str, path: Option<&[String]>) -> Option<Arc<dyn Loader>>;

    /// Drop any cached state.
    fn invalidate_caches(&self) {}
}

/// Ask each finder in order; the first hit wins and later finders are not consulted.
pub fn find_in_chain(
    finders: &[Arc<dyn Finder>],
    fullname: &str,
    path: Option<&[String]>,
) -> Option<Arc<dyn Loader>> {
    finders.iter().find_map(|finder| finder.find_module(fullname, path))
}
