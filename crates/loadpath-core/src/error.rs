use crate::codes;
use std::path::PathBuf;
use thiserror::Error;

/// A unit's source could not be decoded or compiled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} ({origin}{})", .line.map(|l| format!(", line {l}")).unwrap_or_default())]
pub struct SyntaxError {
    /// Display path (or synthetic marker) of the offending source.
    pub origin: String,
    /// 1-based line number, when known.
    pub line: Option<usize>,
    pub message: String,
}

impl SyntaxError {
    #[must_use]
    pub fn new(origin: impl Into<String>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            line,
            message: message.into(),
        }
    }
}

/// Error type for every load request.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("No module named {name}")]
    NotFound { name: String },

    #[error("{reason}")]
    InvalidRelativeAddress { reason: String },

    #[error("Empty module name")]
    EmptyName,

    #[error("No module named {name}; {parent} is not a package")]
    NotAPackage { name: String, parent: String },

    #[error("import of {name} halted; registry holds a failure marker")]
    Halted { name: String },

    #[error("module {name} is not in the registry, cannot reload")]
    NotLoaded { name: String },

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("corrupt artifact at {path}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("malformed artifact payload at {path}: {source}")]
    MalformedPayload {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("error while executing {module}: {message}")]
    Runtime { module: String, message: String },

    #[error("cannot initialize extension {name} from {path}: {reason}")]
    Extension {
        name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImportError {
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    #[must_use]
    pub fn relative(reason: impl Into<String>) -> Self {
        Self::InvalidRelativeAddress {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn runtime(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Runtime {
            module: module.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => codes::IMPORT_NOT_FOUND,
            Self::InvalidRelativeAddress { .. } => codes::IMPORT_INVALID_RELATIVE,
            Self::EmptyName => codes::IMPORT_EMPTY_NAME,
            Self::NotAPackage { .. } => codes::IMPORT_NOT_A_PACKAGE,
            Self::Halted { .. } => codes::IMPORT_HALTED,
            Self::NotLoaded { .. } => codes::IMPORT_NOT_LOADED,
            Self::Syntax(_) => codes::IMPORT_SYNTAX_ERROR,
            Self::CorruptArtifact { .. } => codes::ARTIFACT_CORRUPT,
            Self::MalformedPayload { .. } => codes::ARTIFACT_MALFORMED_PAYLOAD,
            Self::Runtime { .. } => codes::IMPORT_RUNTIME_ERROR,
            Self::Extension { .. } => codes::IMPORT_EXTENSION_ERROR,
            Self::Io { .. } => codes::IMPORT_IO_ERROR,
        }
    }

    /// Whether this is a "no finder matched `name`" error.
    #[must_use]
    pub fn is_not_found_for(&self, name: &str) -> bool {
        matches!(self, Self::NotFound { name: n } if n == name)
    }
}

pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display_with_line() {
        let err = SyntaxError::new("pkg/mod.src", Some(3), "invalid syntax");
        assert_eq!(err.to_string(), "invalid syntax (pkg/mod.src, line 3)");
    }

    #[test]
    fn test_syntax_error_display_without_line() {
        let err = SyntaxError::new("<frozen>", None, "unknown encoding: koi8-r");
        assert_eq!(err.to_string(), "unknown encoding: koi8-r (<frozen>)");
    }

    #[test]
    fn test_syntax_error_converts() {
        let err: ImportError = SyntaxError::new("a.src", Some(1), "invalid syntax").into();
        assert_eq!(err.code(), codes::IMPORT_SYNTAX_ERROR);
        assert!(err.to_string().contains("invalid syntax"));
    }

    #[test]
    fn test_is_not_found_for() {
        let err = ImportError::not_found("pkg.mod");
        assert!(err.is_not_found_for("pkg.mod"));
        assert!(!err.is_not_found_for("pkg"));
        assert!(!ImportError::EmptyName.is_not_found_for("pkg.mod"));
    }
}
