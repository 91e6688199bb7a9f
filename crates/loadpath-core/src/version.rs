use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the compiled artifact format.
/// Bump this when `CodeObject` or the artifact header changes incompatibly.
pub const ARTIFACT_FORMAT_VERSION: u16 = 1;

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("loadpath {VERSION} (artifact format v{ARTIFACT_FORMAT_VERSION})");

    if let Some(hash) = option_env!("LOADPATH_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}
