//! The import pipeline.
//!
//! ```text
//! import("pkg.mod", caller, fromlist, level)
//!   ├── resolve_name          → absolute name
//!   ├── registry hit?         → return it (failure marker → Halted)
//!   ├── load parent first     → parent must have a search path
//!   ├── meta finders, then the path finder (parent path or default path)
//!   ├── loader.load_module    → registry entry is authoritative
//!   ├── bind on parent        → pkg.mod = <module pkg.mod>
//!   └── fromlist              → import missing submodules of a package
//! ```
//!
//! All public operations run under one re-entrant lock: imports issued by an
//! executing unit re-enter on the same thread, other threads wait.

use crate::compiler::{Compiler, LineCompiler};
use crate::config::{ImportConfig, ImportFlags};
use crate::error::{ImportError, ImportResult};
use crate::finder::{
    default_loader_details, file_path_hook, find_in_chain, BuiltinImporter, Finder,
    FrozenImporter, PathFinder,
};
use crate::loader::{Loader, LoaderEnv, NativeModules};
use crate::module::{Module, Value};
use crate::name::{
    package_of, parent_name, resolve_name, split_relative, CallerContext, DottedName,
};
use crate::registry::{ModuleRegistry, RegistryEntry};
use parking_lot::{ReentrantMutex, RwLock};
use std::fmt;
use std::sync::Arc;

/// Process import context.
pub struct Importer {
    registry: Arc<ModuleRegistry>,
    meta_path: RwLock<Vec<Arc<dyn Finder>>>,
    builtins: Arc<BuiltinImporter>,
    frozen: Arc<FrozenImporter>,
    path_finder: Arc<PathFinder>,
    env: LoaderEnv,
    natives: Arc<NativeModules>,
    lock: ReentrantMutex<()>,
}

impl Importer {
    /// Importer using the [`LineCompiler`] and a fresh registry.
    #[must_use]
    pub fn new(config: &ImportConfig) -> Self {
        Self::with_compiler(config, Arc::new(LineCompiler::new()))
    }

    /// Importer configured from `LOADPATH_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(&ImportConfig::from_env())
    }

    #[must_use]
    pub fn with_compiler(config: &ImportConfig, compiler: Arc<dyn Compiler>) -> Self {
        Self::with_registry(config, compiler, Arc::new(ModuleRegistry::new()))
    }

    /// Importer sharing an existing registry.
    #[must_use]
    pub fn with_registry(
        config: &ImportConfig,
        compiler: Arc<dyn Compiler>,
        registry: Arc<ModuleRegistry>,
    ) -> Self {
        let flags = Arc::new(ImportFlags::from_config(config));
        let env = LoaderEnv::new(compiler, Arc::clone(&flags));
        let natives = Arc::new(NativeModules::new());
        let details = default_loader_details(&env, &natives);
        let path_finder = Arc::new(PathFinder::new(
            config.search_path.clone(),
            vec![file_path_hook(details, flags)],
        ));
        let builtins = Arc::new(BuiltinImporter::new());
        let frozen = Arc::new(FrozenImporter::new());
        let meta_path: Vec<Arc<dyn Finder>> = vec![
            Arc::clone(&builtins) as Arc<dyn Finder>,
            Arc::clone(&frozen) as Arc<dyn Finder>,
        ];

        Self {
            registry,
            meta_path: RwLock::new(meta_path),
            builtins,
            frozen,
            path_finder,
            env,
            natives,
            lock: ReentrantMutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn flags(&self) -> &Arc<ImportFlags> {
        &self.env.flags
    }

    pub fn compiler(&self) -> &Arc<dyn Compiler> {
        &self.env.compiler
    }

    pub fn builtins(&self) -> &Arc<BuiltinImporter> {
        &self.builtins
    }

    pub fn frozen(&self) -> &Arc<FrozenImporter> {
        &self.frozen
    }

    pub fn path_finder(&self) -> &Arc<PathFinder> {
        &self.path_finder
    }

    pub fn natives(&self) -> &Arc<NativeModules> {
        &self.natives
    }

    /// Snapshot of the meta path.
    pub fn meta_path(&self) -> Vec<Arc<dyn Finder>> {
        self.meta_path.read().clone()
    }

    pub fn set_meta_path(&self, finders: Vec<Arc<dyn Finder>>) {
        *self.meta_path.write() = finders;
    }

    /// Add a meta finder ahead of the existing ones.
    pub fn insert_meta_finder(&self, finder: Arc<dyn Finder>) {
        self.meta_path.write().insert(0, finder);
    }

    pub fn push_meta_finder(&self, finder: Arc<dyn Finder>) {
        self.meta_path.write().push(finder);
    }

    /// Locate a loader: meta finders first, then the path finder.
    pub fn find_loader(
        &self,
        fullname: &str,
        path: Option<&[String]>,
    ) -> Option<Arc<dyn Loader>> {
        let meta_path = self.meta_path();
        find_in_chain(&meta_path, fullname, path)
            .or_else(|| self.path_finder.find_module(fullname, path))
    }

    /// Drop every finder cache.
    pub fn invalidate_caches(&self) {
        let _guard = self.lock.lock();
        for finder in self.meta_path() {
            finder.invalidate_caches();
        }
        self.path_finder.invalidate_caches();
        tracing::debug!("finder caches invalidated");
    }

    /// Import `name` (relative to `package` when `level > 0`) and return it.
    pub fn gcd_import(
        &self,
        name: &str,
        package: Option<&str>,
        level: usize,
    ) -> ImportResult<Arc<Module>> {
        let _guard = self.lock.lock();
        let absolute = if level > 0 {
            let package = package.unwrap_or("");
            let absolute = resolve_name(name, package, level)?;
            if !self.registry.contains(package) {
                return Err(ImportError::relative(format!(
                    "parent module {package:?} not loaded, cannot perform relative import"
                )));
            }
            absolute
        } else {
            resolve_name(name, "", 0)?
        };
        tracing::debug!(name, level, absolute = %absolute, "import requested");
        self.find_and_load(&absolute)
    }

    /// Full import with caller context, fromlist and return-value policy.
    ///
    /// Without a fromlist an absolute dotted request returns its top-level
    /// package; with one it returns the named unit itself.
    pub fn import(
        &self,
        name: &str,
        caller: Option<&CallerContext>,
        fromlist: &[&str],
        level: usize,
    ) -> ImportResult<Arc<Module>> {
        let _guard = self.lock.lock();
        let package = if level > 0 {
            let caller = caller.ok_or_else(|| {
                ImportError::relative("relative import with no caller context")
            })?;
            Some(caller.package_name()?)
        } else {
            None
        };
        let module = self.gcd_import(name, package.as_deref(), level)?;

        if !fromlist.is_empty() {
            self.handle_fromlist(&module, fromlist)?;
            return Ok(module);
        }
        if level == 0 {
            let top = name.split('.').next().unwrap_or(name);
            return self.gcd_import(top, None, 0);
        }
        if name.is_empty() {
            return Ok(module);
        }

        // Relative dotted request: return the unit named by the first
        // requested segment. The slice is taken from the resolved name, which
        // a registered unit's own name need not match.
        let absolute = resolve_name(name, package.as_deref().unwrap_or(""), level)?;
        let first = name.split('.').next().unwrap_or(name);
        let cut_off = name.len() - first.len();
        let target = absolute
            .len()
            .checked_sub(cut_off)
            .and_then(|end| absolute.get(..end))
            .ok_or_else(|| ImportError::not_found(absolute.as_str()))?;
        self.registry
            .get_module(target)
            .ok_or_else(|| ImportError::not_found(target))
    }

    /// Import `name`; leading dots make it relative to `package`.
    pub fn import_module(&self, name: &str, package: Option<&str>) -> ImportResult<Arc<Module>> {
        let (level, rest) = split_relative(name);
        if level > 0 && package.map_or(true, str::is_empty) {
            return Err(ImportError::relative(format!(
                "a package is required to import {name:?} relatively"
            )));
        }
        self.gcd_import(rest, package, level)
    }

    /// Re-run the finder and loader for a registered unit, keeping its identity.
    ///
    /// On failure the unit and its registry slot are left as they were.
    pub fn reload(&self, module: &Arc<Module>) -> ImportResult<Arc<Module>> {
        let _guard = self.lock.lock();
        let name = module.name();
        match self.registry.get_module(name) {
            Some(registered) if Arc::ptr_eq(&registered, module) => {}
            _ => {
                return Err(ImportError::NotLoaded {
                    name: name.to_string(),
                })
            }
        }

        let path = match parent_name(name) {
            Some(parent) => {
                let parent_module = self.registry.get_module(parent).ok_or_else(|| {
                    ImportError::NotLoaded {
                        name: parent.to_string(),
                    }
                })?;
                let search_path = parent_module.search_path().ok_or_else(|| {
                    ImportError::NotAPackage {
                        name: name.to_string(),
                        parent: parent.to_string(),
                    }
                })?;
                Some(search_path)
            }
            None => None,
        };
        let loader = self
            .find_loader(name, path.as_deref())
            .ok_or_else(|| ImportError::not_found(name))?;

        let previous_entry = self.registry.get(name);
        let previous_state = module.snapshot();
        tracing::debug!(name, kind = %loader.kind(), "reloading");
        match Arc::clone(&loader).load_module(self, name) {
            Ok(returned) => {
                let reloaded = self.registry.get_module(name).unwrap_or(returned);
                if reloaded.loader().is_none() {
                    reloaded.set_loader(Some(loader));
                }
                Ok(reloaded)
            }
            Err(e) => {
                module.restore(previous_state);
                self.registry.reinstate(name, previous_entry);
                Err(e)
            }
        }
    }

    fn find_and_load(&self, name: &str) -> ImportResult<Arc<Module>> {
        if let Some(found) = self.registered(name)? {
            return Ok(found);
        }
        let dotted = DottedName::parse(name).ok_or_else(|| ImportError::not_found(name))?;

        let path = match dotted.parent() {
            Some(parent) => {
                let parent_module = self.find_and_load(parent)?;
                // Loading the parent may have loaded this unit too.
                if let Some(found) = self.registered(name)? {
                    return Ok(found);
                }
                let search_path = parent_module.search_path().ok_or_else(|| {
                    ImportError::NotAPackage {
                        name: name.to_string(),
                        parent: parent.to_string(),
                    }
                })?;
                Some(search_path)
            }
            None => None,
        };

        let loader = self
            .find_loader(name, path.as_deref())
            .ok_or_else(|| ImportError::not_found(name))?;
        tracing::debug!(name, kind = %loader.kind(), "loading");

        let returned = match Arc::clone(&loader).load_module(self, name) {
            Ok(module) => module,
            Err(e) => {
                if self.registry.remove(name).is_some() {
                    tracing::debug!(name, "removed partially loaded unit");
                }
                return Err(e);
            }
        };

        let module = match self.registry.get_module(name) {
            Some(registered) => registered,
            None => {
                self.registry.insert(name, Arc::clone(&returned));
                returned
            }
        };
        if module.loader().is_none() {
            module.set_loader(Some(loader));
        }
        if module.package().is_none() {
            module.set_package(Some(package_of(name, module.is_package())));
        }

        if let Some(parent) = dotted.parent() {
            if let Some(parent_module) = self.registry.get_module(parent) {
                parent_module.set_attr(dotted.tail(), Value::Module(Arc::clone(&module)));
            }
        }
        Ok(module)
    }

    fn registered(&self, name: &str) -> ImportResult<Option<Arc<Module>>> {
        match self.registry.get(name) {
            Some(RegistryEntry::Loaded(module)) => Ok(Some(module)),
            Some(RegistryEntry::Failed) => Err(ImportError::Halted {
                name: name.to_string(),
            }),
            None => Ok(None),
        }
    }

    fn handle_fromlist(&self, module: &Arc<Module>, fromlist: &[&str]) -> ImportResult<()> {
        if !module.is_package() {
            return Ok(());
        }
        for &attr in fromlist {
            if attr == "*" || module.has_attr(attr) {
                continue;
            }
            let sub = format!("{}.{attr}", module.name());
            if let Some(registered) = self.registry.get_module(&sub) {
                module.set_attr(attr, Value::Module(registered));
                continue;
            }
            match self.find_and_load(&sub) {
                Ok(_) => {}
                Err(e) if e.is_not_found_for(&sub) => {
                    tracing::debug!(name = %sub, "fromlist entry is not a submodule");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl Default for Importer {
    fn default() -> Self {
        Self::new(&ImportConfig::default())
    }
}

impl fmt::Debug for Importer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Importer")
            .field("registry", &self.registry.names())
            .field("meta_path", &self.meta_path.read().len())
            .field("path_finder", &self.path_finder)
            .finish_non_exhaustive()
    }
}
