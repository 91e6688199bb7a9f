#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod artifact;
pub mod codes;
pub mod compiler;
pub mod config;
pub mod encoding;
pub mod error;
pub mod finder;
pub mod importer;
pub mod loader;
pub mod module;
pub mod name;
pub mod registry;
pub mod version;

pub use compiler::{CodeObject, Compiler, LineCompiler};
pub use config::{ImportConfig, ImportFlags};
pub use error::{ImportError, ImportResult, SyntaxError};
pub use finder::{BuiltinImporter, FileFinder, Finder, FrozenImporter, PathFinder};
pub use importer::Importer;
pub use loader::{
    Loader, LoaderKind, NativeModules, SourceFileLoader, SourceLoader, SourcelessFileLoader,
};
pub use module::{Module, Value};
pub use name::{resolve_name, CallerContext, DottedName};
pub use registry::{ModuleRegistry, RegistryEntry};
pub use version::VERSION;
