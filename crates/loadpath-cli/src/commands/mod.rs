pub mod compile;
pub mod find;
pub mod import;
pub mod inspect;
pub mod version;

use loadpath_core::ImportError;

/// Convert a library error into a diagnostic that carries its stable code.
pub(crate) fn diagnostic(err: ImportError) -> miette::Report {
    miette::miette!(code = err.code(), "{err}")
}
