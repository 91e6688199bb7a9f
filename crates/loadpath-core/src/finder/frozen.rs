//! Frozen units embedded in the host as precompiled code.

use super::Finder;
use crate::compiler::{execute, CodeObject};
use crate::error::ImportResult;
use crate::importer::Importer;
use crate::loader::{load_with, Loader, LoaderKind};
use crate::module::Module;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Origin marker for frozen units.
pub const FROZEN_ORIGIN: &str = "<frozen>";

#[derive(Debug, Clone)]
struct FrozenUnit {
    code: CodeObject,
    is_package: bool,
}

/// Meta finder for frozen units.
#[derive(Debug, Default)]
pub struct FrozenImporter {
    units: RwLock<HashMap<String, FrozenUnit>>,
}

impl FrozenImporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a frozen unit.
    pub fn register(&self, name: impl Into<String>, code: CodeObject, is_package: bool) {
        self.units
            .write()
            .insert(name.into(), FrozenUnit { code, is_package });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.read().contains_key(name)
    }
}

impl Finder for FrozenImporter {
    fn find_module(&self, fullname: &str, _path: Option<&[String]>) -> Option<Arc<dyn Loader>> {
        let unit = self.units.read().get(fullname).cloned()?;
        tracing::trace!(name = fullname, "frozen match");
        Some(Arc::new(FrozenLoader {
            code: unit.code,
            is_package: unit.is_package,
        }))
    }
}

/// Loader for one frozen unit.
#[derive(Debug)]
pub struct FrozenLoader {
    code: CodeObject,
    is_package: bool,
}

impl Loader for FrozenLoader {
    fn load_module(
        self: Arc<Self>,
        importer: &Importer,
        fullname: &str,
    ) -> ImportResult<Arc<Module>> {
        let loader: Arc<dyn Loader> = self.clone();
        load_with(importer, fullname, self.is_package, |module| {
            module.set_origin(Some(FROZEN_ORIGIN.to_string()));
            module.set_loader(Some(loader));
            if self.is_package {
                module.set_search_path(Some(vec![fullname.to_string()]));
            }
            execute(&self.code, module, importer)
        })
    }

    fn kind(&self) -> LoaderKind {
        LoaderKind::Frozen
    }

    fn is_package(&self, _fullname: &str) -> bool {
        self.is_package
    }

    fn get_code(&self, _fullname: &str) -> ImportResult<Option<CodeObject>> {
        Ok(Some(self.code.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_frozen() {
        let frozen = FrozenImporter::new();
        frozen.register("__hello__", CodeObject::new(FROZEN_ORIGIN, vec![]), false);
        frozen.register("__phello__", CodeObject::new(FROZEN_ORIGIN, vec![]), true);

        let module = frozen.find_module("__hello__", None).unwrap();
        assert_eq!(module.kind(), LoaderKind::Frozen);
        assert!(!module.is_package("__hello__"));
        assert!(module.get_source("__hello__").unwrap().is_none());
        assert!(module.get_code("__hello__").unwrap().is_some());

        let package = frozen.find_module("__phello__", None).unwrap();
        assert!(package.is_package("__phello__"));
    }

    #[test]
    fn test_unknown_frozen() {
        assert!(FrozenImporter::new().find_module("<not real>", None).is_none());
    }
}
