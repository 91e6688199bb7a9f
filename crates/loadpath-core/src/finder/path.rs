//! Search-path finder and the path entry cache.
//!
//! ```text
//! PathFinder::find_module("pkg.mod", Some(["/lib/pkg"]))
//!   for entry in path (or the default search path):
//!     cache[entry]  hit  → finder or "not applicable"
//!                   miss → first hook that accepts the entry
//!     finder.find_module(...) → first hit wins
//! ```

use super::file::{FileFinder, LoaderDetails};
use super::Finder;
use crate::artifact::{ARTIFACT_SUFFIX, SOURCE_SUFFIX};
use crate::config::ImportFlags;
use crate::loader::{
    ExtensionFileLoader, Loader, LoaderEnv, NativeModules, SourceFileLoader, SourcelessFileLoader,
    EXTENSION_SUFFIXES,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a finder for a path entry, or `None` if the entry is not one it handles.
pub type PathHook = Arc<dyn Fn(&str) -> Option<Arc<dyn Finder>> + Send + Sync>;

/// Path entry → finder, with `None` recording "no hook applies".
#[derive(Default)]
pub struct PathEntryCache {
    entries: RwLock<HashMap<String, Option<Arc<dyn Finder>>>>,
}

impl PathEntryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if the entry was never looked up; `Some(None)` if it is not applicable.
    pub fn get(&self, entry: &str) -> Option<Option<Arc<dyn Finder>>> {
        self.entries.read().get(entry).cloned()
    }

    pub fn insert(&self, entry: impl Into<String>, finder: Option<Arc<dyn Finder>>) {
        self.entries.write().insert(entry.into(), finder);
    }

    /// Ask every cached finder to drop its caches, then forget them all.
    pub fn invalidate(&self) {
        let mut entries = self.entries.write();
        for finder in entries.values().flatten() {
            finder.invalidate_caches();
        }
        entries.clear();
    }

    /// Cached entries in sorted order, with whether a finder applies.
    pub fn entries(&self) -> Vec<(String, bool)> {
        let mut out: Vec<(String, bool)> = self
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.is_some()))
            .collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for PathEntryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathEntryCache")
            .field("entries", &self.entries())
            .finish()
    }
}

/// Default classifiers: extension, then source, then sourceless.
#[must_use]
pub fn default_loader_details(env: &LoaderEnv, natives: &Arc<NativeModules>) -> Vec<LoaderDetails> {
    let natives = Arc::clone(natives);
    let source_env = env.clone();
    vec![
        LoaderDetails::new(EXTENSION_SUFFIXES, false, move |name, path| {
            Arc::new(ExtensionFileLoader::new(name, path, Arc::clone(&natives))) as Arc<dyn Loader>
        }),
        LoaderDetails::new(&[SOURCE_SUFFIX], true, move |name, path| {
            Arc::new(SourceFileLoader::new(name, path, source_env.clone())) as Arc<dyn Loader>
        }),
        LoaderDetails::new(&[ARTIFACT_SUFFIX], true, |name, path| {
            Arc::new(SourcelessFileLoader::new(name, path)) as Arc<dyn Loader>
        }),
    ]
}

/// Hook that builds a [`FileFinder`] for any entry denoting a directory.
///
/// Empty and relative entries always get a finder: the directory they name
/// changes with the current directory, so their applicability is decided
/// at lookup time rather than cached.
#[must_use]
pub fn file_path_hook(details: Vec<LoaderDetails>, flags: Arc<ImportFlags>) -> PathHook {
    Arc::new(move |entry: &str| {
        let finder = FileFinder::new(entry, details.clone(), Arc::clone(&flags));
        if finder.follows_cwd() || finder.is_applicable() {
            Some(Arc::new(finder) as Arc<dyn Finder>)
        } else {
            tracing::trace!(entry, "path entry is not a directory");
            None
        }
    })
}

/// Finder that walks a search path.
pub struct PathFinder {
    search_path: RwLock<Vec<String>>,
    hooks: RwLock<Vec<PathHook>>,
    cache: PathEntryCache,
}

impl PathFinder {
    #[must_use]
    pub fn new(search_path: Vec<String>, hooks: Vec<PathHook>) -> Self {
        Self {
            search_path: RwLock::new(search_path),
            hooks: RwLock::new(hooks),
            cache: PathEntryCache::new(),
        }
    }

    /// Default search path used for top-level names.
    pub fn search_path(&self) -> Vec<String> {
        self.search_path.read().clone()
    }

    pub fn set_search_path(&self, search_path: Vec<String>) {
        *self.search_path.write() = search_path;
    }

    /// Add a hook ahead of the existing ones.
    pub fn insert_hook(&self, hook: PathHook) {
        self.hooks.write().insert(0, hook);
    }

    pub fn cache(&self) -> &PathEntryCache {
        &self.cache
    }

    /// Finder for `entry`, consulting and filling the path entry cache.
    pub fn finder_for(&self, entry: &str) -> Option<Arc<dyn Finder>> {
        if let Some(cached) = self.cache.get(entry) {
            return cached;
        }
        let hooks: Vec<PathHook> = self.hooks.read().clone();
        let finder = hooks.iter().find_map(|hook| hook(entry));
        tracing::debug!(entry, applicable = finder.is_some(), "path entry cached");
        self.cache.insert(entry, finder.clone());
        finder
    }
}

impl fmt::Debug for PathFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathFinder")
            .field("search_path", &self.search_path())
            .field("hooks", &self.hooks.read().len())
            .field("cache", &self.cache)
            .finish()
    }
}

impl Finder for PathFinder {
    fn find_module(&self, fullname: &str, path: Option<&[String]>) -> Option<Arc<dyn Loader>> {
        let entries = match path {
            Some(path) => path.to_vec(),
            None => self.search_path(),
        };
        entries.iter().find_map(|entry| {
            self.finder_for(entry)
                .and_then(|finder| finder.find_module(fullname, None))
        })
    }

    fn invalidate_caches(&self) {
        self.cache.invalidate();
    }
}
