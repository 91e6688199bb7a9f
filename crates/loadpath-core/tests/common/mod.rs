//! Shared fixtures for integration tests.

#![allow(dead_code)]

use loadpath_core::loader::load_with;
use loadpath_core::{
    CodeObject, Compiler, Finder, ImportConfig, ImportResult, Importer, LineCompiler, Loader,
    Module, SyntaxError, Value,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A temporary source tree used as the sole search path entry.
pub struct Tree {
    pub dir: TempDir,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn config(&self) -> ImportConfig {
        ImportConfig::new(vec![self.root().to_string_lossy().into_owned()])
    }

    pub fn importer(&self) -> Importer {
        Importer::new(&self.config())
    }

    pub fn importer_with(&self, compiler: Arc<dyn Compiler>) -> Importer {
        Importer::with_compiler(&self.config(), compiler)
    }
}

/// Compiler wrapper that counts compilations.
#[derive(Debug, Default)]
pub struct CountingCompiler {
    pub calls: AtomicUsize,
}

impl CountingCompiler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Compiler for CountingCompiler {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn compile(&self, source: &str, origin: &str) -> Result<CodeObject, SyntaxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        LineCompiler::new().compile(source, origin)
    }
}

/// Loader that registers a unit tagged with the finder that produced it.
#[derive(Debug)]
pub struct MockLoader {
    pub tag: String,
    pub package: bool,
}

impl Loader for MockLoader {
    fn load_module(
        self: Arc<Self>,
        importer: &Importer,
        fullname: &str,
    ) -> ImportResult<Arc<Module>> {
        load_with(importer, fullname, self.package, |module| {
            module.set_attr("tag", Value::Str(self.tag.clone()));
            if self.package {
                module.set_search_path(Some(Vec::new()));
            }
            Ok(())
        })
    }

    fn is_package(&self, _fullname: &str) -> bool {
        self.package
    }
}

/// Meta finder that claims a fixed set of names and records every query.
#[derive(Debug)]
pub struct MockFinder {
    pub tag: String,
    pub modules: Vec<String>,
    pub packages: Vec<String>,
    pub queries: Mutex<Vec<(String, Option<Vec<String>>)>>,
}

impl MockFinder {
    pub fn new(tag: &str, modules: &[&str], packages: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            tag: tag.to_string(),
            modules: modules.iter().map(|s| (*s).to_string()).collect(),
            packages: packages.iter().map(|s| (*s).to_string()).collect(),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

impl Finder for MockFinder {
    fn find_module(&self, fullname: &str, path: Option<&[String]>) -> Option<Arc<dyn Loader>> {
        self.queries
            .lock()
            .unwrap()
            .push((fullname.to_string(), path.map(<[String]>::to_vec)));
        let package = self.packages.iter().any(|p| p == fullname);
        if package || self.modules.iter().any(|m| m == fullname) {
            Some(Arc::new(MockLoader {
                tag: self.tag.clone(),
                package,
            }))
        } else {
            None
        }
    }
}

/// String attribute of a unit.
pub fn str_attr(module: &Module, name: &str) -> Option<String> {
    match module.get_attr(name) {
        Some(Value::Str(s)) => Some(s),
        _ => None,
    }
}

pub fn int_attr(module: &Module, name: &str) -> Option<i64> {
    match module.get_attr(name) {
        Some(Value::Int(i)) => Some(i),
        _ => None,
    }
}
