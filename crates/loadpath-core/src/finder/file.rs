//! Per-directory finder.
//!
//! A `FileFinder` owns one path entry and an ordered list of classifiers.
//! For a base name `N` it checks, in order:
//!
//! 1. a subdirectory `N/` holding `__init__<suffix>` for a classifier that
//!    supports packages (a package wins over a same-named module);
//! 2. a file `N<suffix>` for each classifier, most specific first.
//!
//! The directory listing is cached together with the directory's mtime and
//! rebuilt when either the mtime or the resolved directory changes. An empty
//! or relative entry is resolved against the working directory on every
//! lookup.

use super::Finder;
use crate::config::ImportFlags;
use crate::loader::source::PACKAGE_INIT_STEM;
use crate::loader::Loader;
use crate::name::tail_name;
use loadpath_util::fs::dir_entry_names;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Builds a loader for `(fullname, file path)`.
pub type LoaderFactory = Arc<dyn Fn(&str, PathBuf) -> Arc<dyn Loader> + Send + Sync>;

/// One file classifier: suffixes it claims and the loader it builds.
#[derive(Clone)]
pub struct LoaderDetails {
    pub suffixes: Vec<String>,
    pub supports_packages: bool,
    pub factory: LoaderFactory,
}

impl LoaderDetails {
    pub fn new<F>(suffixes: &[&str], supports_packages: bool, factory: F) -> Self
    where
        F: Fn(&str, PathBuf) -> Arc<dyn Loader> + Send + Sync + 'static,
    {
        Self {
            suffixes: suffixes.iter().map(|s| (*s).to_string()).collect(),
            supports_packages,
            factory: Arc::new(factory),
        }
    }
}

impl fmt::Debug for LoaderDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderDetails")
            .field("suffixes", &self.suffixes)
            .field("supports_packages", &self.supports_packages)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct DirListing {
    dir: PathBuf,
    mtime: Option<SystemTime>,
    names: Arc<HashSet<String>>,
}

/// Finder for a single directory path entry.
pub struct FileFinder {
    entry: String,
    details: Vec<LoaderDetails>,
    flags: Arc<ImportFlags>,
    listing: Mutex<Option<DirListing>>,
}

impl FileFinder {
    #[must_use]
    pub fn new(
        entry: impl Into<String>,
        details: Vec<LoaderDetails>,
        flags: Arc<ImportFlags>,
    ) -> Self {
        Self {
            entry: entry.into(),
            details,
            flags,
            listing: Mutex::new(None),
        }
    }

    /// The path entry this finder was built for.
    #[must_use]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Directory the entry denotes right now.
    pub fn resolve_dir(&self) -> Option<PathBuf> {
        let entry = Path::new(&self.entry);
        if entry.is_absolute() {
            return Some(entry.to_path_buf());
        }
        let cwd = std::env::current_dir().ok()?;
        if self.entry.is_empty() {
            Some(cwd)
        } else {
            Some(cwd.join(entry))
        }
    }

    /// Whether the entry is resolved against the current directory on every lookup.
    #[must_use]
    pub fn follows_cwd(&self) -> bool {
        !Path::new(&self.entry).is_absolute()
    }

    /// Whether the entry currently denotes a usable directory.
    pub fn is_applicable(&self) -> bool {
        self.resolve_dir().is_some_and(|dir| dir.is_dir())
    }

    /// Current directory and its (possibly cached) listing.
    fn listing(&self) -> Option<(PathBuf, Arc<HashSet<String>>)> {
        let dir = self.resolve_dir()?;
        let mtime = dir.metadata().ok()?.modified().ok();

        let mut guard = self.listing.lock();
        if let Some(cached) = guard.as_ref() {
            if cached.dir == dir && cached.mtime == mtime {
                return Some((dir, Arc::clone(&cached.names)));
            }
        }

        let names: Arc<HashSet<String>> = match dir_entry_names(&dir) {
            Ok(names) => Arc::new(names.into_iter().collect()),
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "cannot list path entry");
                return None;
            }
        };
        tracing::debug!(dir = %dir.display(), entries = names.len(), "directory listing rebuilt");
        *guard = Some(DirListing {
            dir: dir.clone(),
            mtime,
            names: Arc::clone(&names),
        });
        Some((dir, names))
    }

    /// The real file name in `names` that `candidate` refers to.
    fn match_name(&self, names: &HashSet<String>, candidate: &str) -> Option<String> {
        if names.contains(candidate) {
            return Some(candidate.to_string());
        }
        if !self.flags.case_ok() {
            return None;
        }
        let wanted = candidate.to_lowercase();
        let mut folded: Vec<&String> = names
            .iter()
            .filter(|n| n.to_lowercase() == wanted)
            .collect();
        folded.sort();
        folded.first().map(|n| (*n).clone())
    }

    fn find_package(
        &self,
        fullname: &str,
        dir: &Path,
        names: &HashSet<String>,
    ) -> Option<Arc<dyn Loader>> {
        let base = tail_name(fullname);
        let pkg_name = self.match_name(names, base)?;
        let pkg_dir = dir.join(&pkg_name);
        if !pkg_dir.is_dir() {
            return None;
        }

        let pkg_names: HashSet<String> = dir_entry_names(&pkg_dir).ok()?.into_iter().collect();
        for details in self.details.iter().filter(|d| d.supports_packages) {
            for suffix in &details.suffixes {
                let init = format!("{PACKAGE_INIT_STEM}{suffix}");
                if let Some(actual) = self.match_name(&pkg_names, &init) {
                    let path = pkg_dir.join(actual);
                    if path.is_file() {
                        tracing::trace!(name = fullname, path = %path.display(), "package match");
                        return Some((details.factory)(fullname, path));
                    }
                }
            }
        }

        tracing::warn!(
            name = fullname,
            dir = %pkg_dir.display(),
            "directory has no {PACKAGE_INIT_STEM} entry, not importing it as a package"
        );
        None
    }

    fn find_file(
        &self,
        fullname: &str,
        dir: &Path,
        names: &HashSet<String>,
    ) -> Option<Arc<dyn Loader>> {
        let base = tail_name(fullname);
        for details in &self.details {
            for suffix in &details.suffixes {
                let candidate = format!("{base}{suffix}");
                tracing::trace!(name = fullname, candidate = %candidate, "checking candidate");
                if let Some(actual) = self.match_name(names, &candidate) {
                    let path = dir.join(actual);
                    if path.is_file() {
                        tracing::trace!(name = fullname, path = %path.display(), "module match");
                        return Some((details.factory)(fullname, path));
                    }
                }
            }
        }
        None
    }
}

impl fmt::Debug for FileFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileFinder")
            .field("entry", &self.entry)
            .field("details", &self.details)
            .finish_non_exhaustive()
    }
}

impl Finder for FileFinder {
    fn find_module(&self, fullname: &str, _path: Option<&[String]>) -> Option<Arc<dyn Loader>> {
        let (dir, names) = self.listing()?;
        self.find_package(fullname, &dir, &names)
            .or_else(|| self.find_file(fullname, &dir, &names))
    }

    fn invalidate_caches(&self) {
        *self.listing.lock() = None;
    }
}
