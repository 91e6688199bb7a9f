//! Compiler abstraction for unit source.
//!
//! Loaders never parse source themselves. They hand decoded text to a
//! [`Compiler`] and persist the resulting [`CodeObject`] in the artifact
//! cache, so the artifact format is simply the serialized code object.
//!
//! ## Usage
//!
//! ```ignore
//! use loadpath_core::compiler::{Compiler, LineCompiler};
//!
//! let code = LineCompiler::new().compile("answer = 42\n", "m.src")?;
//! assert_eq!(code.body.len(), 1);
//! ```

pub mod exec;
pub mod line;

pub use exec::execute;
pub use line::LineCompiler;

use crate::error::SyntaxError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A right-hand side value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Expr {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    /// Dotted attribute lookup rooted in the unit's namespace.
    Name(String),
}

/// One imported name in a `from ... import` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedName {
    /// Name the value is bound under in the executing unit.
    #[must_use]
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StmtKind {
    Pass,
    Assign {
        target: String,
        expr: Expr,
    },
    Import {
        module: String,
        alias: Option<String>,
    },
    ImportFrom {
        module: String,
        level: usize,
        /// Empty for `import *`.
        names: Vec<ImportedName>,
    },
    Raise {
        message: String,
    },
}

/// A statement together with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stmt {
    pub line: usize,
    #[serde(flatten)]
    pub kind: StmtKind,
}

/// Compiled form of a unit's source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeObject {
    /// Display path the code was compiled from.
    pub origin: String,
    pub body: Vec<Stmt>,
}

impl CodeObject {
    #[must_use]
    pub fn new(origin: impl Into<String>, body: Vec<Stmt>) -> Self {
        Self {
            origin: origin.into(),
            body,
        }
    }

    /// Serialize to the artifact payload encoding.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize an artifact payload.
    pub fn from_payload(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Turns decoded source text into a [`CodeObject`].
///
/// Implementations must be `Send + Sync`; one compiler is shared by every
/// loader an importer creates.
pub trait Compiler: Send + Sync + fmt::Debug {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Compile `source`. `origin` is used for error reporting only.
    fn compile(&self, source: &str, origin: &str) -> Result<CodeObject, SyntaxError>;
}
