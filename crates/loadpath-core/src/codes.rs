//! Stable error codes for the import system.
//!
//! All codes are SCREAMING_SNAKE_CASE and stable across versions.

/// No finder produced a loader for the requested name.
pub const IMPORT_NOT_FOUND: &str = "IMPORT_NOT_FOUND";

/// Relative level/package arithmetic failed or the caller context is unusable.
pub const IMPORT_INVALID_RELATIVE: &str = "IMPORT_INVALID_RELATIVE";

/// Empty absolute name at level 0.
pub const IMPORT_EMPTY_NAME: &str = "IMPORT_EMPTY_NAME";

/// Submodule requested through a parent that has no search path.
pub const IMPORT_NOT_A_PACKAGE: &str = "IMPORT_NOT_A_PACKAGE";

/// Registry holds the explicit failure marker for the name.
pub const IMPORT_HALTED: &str = "IMPORT_HALTED";

/// Reload requested for a unit the registry does not hold.
pub const IMPORT_NOT_LOADED: &str = "IMPORT_NOT_LOADED";

/// Source failed to decode or compile.
pub const IMPORT_SYNTAX_ERROR: &str = "IMPORT_SYNTAX_ERROR";

/// Unit code raised while executing.
pub const IMPORT_RUNTIME_ERROR: &str = "IMPORT_RUNTIME_ERROR";

/// Native extension has no registered initializer or it failed.
pub const IMPORT_EXTENSION_ERROR: &str = "IMPORT_EXTENSION_ERROR";

/// I/O error while reading a unit.
pub const IMPORT_IO_ERROR: &str = "IMPORT_IO_ERROR";

/// Artifact header is truncated after a valid format tag.
pub const ARTIFACT_CORRUPT: &str = "ARTIFACT_CORRUPT";

/// Artifact header is fresh but the payload does not deserialize.
pub const ARTIFACT_MALFORMED_PAYLOAD: &str = "ARTIFACT_MALFORMED_PAYLOAD";
