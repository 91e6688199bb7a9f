//! `Module` - runtime representation of a loaded unit.
//!
//! A unit's identity is its `Arc<Module>`: the registry owns one strong
//! reference and parent packages hold another as a namespace attribute.
//! Everything mutable lives in one [`ModuleState`] behind a lock so a failed
//! reload can be rolled back wholesale with [`Module::restore`].

use crate::loader::Loader;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A namespace value.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    Module(Arc<Module>),
}

impl Value {
    /// The unit this value refers to, if any.
    #[must_use]
    pub fn as_module(&self) -> Option<&Arc<Module>> {
        match self {
            Self::Module(m) => Some(m),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Module(a), Self::Module(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Module(m) => write!(f, "<module {:?}>", m.name()),
        }
    }
}

/// Everything about a unit that loading may change.
#[derive(Debug, Clone, Default)]
pub struct ModuleState {
    /// Display path or synthetic marker (`<frozen>`); `None` for built-ins.
    pub origin: Option<String>,
    /// Path of the compiled artifact backing this unit, if any.
    pub cached: Option<PathBuf>,
    /// Package this unit belongs to (`""` for top-level modules).
    pub package: Option<String>,
    /// Present iff the unit is a package.
    pub search_path: Option<Vec<String>>,
    /// Loader that produced the unit.
    pub loader: Option<Arc<dyn Loader>>,
    /// Attributes set by execution and by parent binding.
    pub namespace: BTreeMap<String, Value>,
}

/// A loaded, executed unit.
pub struct Module {
    name: String,
    state: RwLock<ModuleState>,
}

impl Module {
    /// Create a new, empty unit.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            state: RwLock::new(ModuleState::default()),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> Option<String> {
        self.state.read().origin.clone()
    }

    pub fn set_origin(&self, origin: Option<String>) {
        self.state.write().origin = origin;
    }

    pub fn cached(&self) -> Option<PathBuf> {
        self.state.read().cached.clone()
    }

    pub fn set_cached(&self, cached: Option<PathBuf>) {
        self.state.write().cached = cached;
    }

    pub fn package(&self) -> Option<String> {
        self.state.read().package.clone()
    }

    pub fn set_package(&self, package: Option<String>) {
        self.state.write().package = package;
    }

    pub fn search_path(&self) -> Option<Vec<String>> {
        self.state.read().search_path.clone()
    }

    pub fn set_search_path(&self, search_path: Option<Vec<String>>) {
        self.state.write().search_path = search_path;
    }

    pub fn is_package(&self) -> bool {
        self.state.read().search_path.is_some()
    }

    pub fn loader(&self) -> Option<Arc<dyn Loader>> {
        self.state.read().loader.clone()
    }

    pub fn set_loader(&self, loader: Option<Arc<dyn Loader>>) {
        self.state.write().loader = loader;
    }

    pub fn get_attr(&self, name: &str) -> Option<Value> {
        self.state.read().namespace.get(name).cloned()
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.state.read().namespace.contains_key(name)
    }

    pub fn set_attr(&self, name: impl Into<String>, value: Value) {
        self.state.write().namespace.insert(name.into(), value);
    }

    /// Attribute names in sorted order.
    pub fn attr_names(&self) -> Vec<String> {
        self.state.read().namespace.keys().cloned().collect()
    }

    /// Copy of the namespace.
    pub fn namespace(&self) -> BTreeMap<String, Value> {
        self.state.read().namespace.clone()
    }

    /// Capture the full mutable state.
    pub fn snapshot(&self) -> ModuleState {
        self.state.read().clone()
    }

    /// Reinstate a state captured by [`Module::snapshot`].
    pub fn restore(&self, state: ModuleState) {
        *self.state.write() = state;
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Namespaces can contain the unit's own ancestors; print names only.
        let state = self.state.read();
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("origin", &state.origin)
            .field("package", &state.package)
            .field("search_path", &state.search_path)
            .field("attrs", &state.namespace.keys().collect::<Vec<_>>())
            .finish()
    }
}
