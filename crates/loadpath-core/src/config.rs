use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Environment variable holding the default search path (platform path-list syntax).
pub const PATH_ENV: &str = "LOADPATH_PATH";

/// Environment variable that disables artifact persistence when non-empty.
pub const DONT_WRITE_ARTIFACTS_ENV: &str = "LOADPATH_DONTWRITEARTIFACTS";

/// Environment variable that enables case-insensitive file matching when non-empty.
pub const CASE_OK_ENV: &str = "LOADPATH_CASEOK";

/// Import system configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Default search path consulted for top-level names.
    /// An empty string denotes the working directory at lookup time.
    pub search_path: Vec<String>,

    /// Never persist compiled artifacts.
    pub dont_write_artifacts: bool,

    /// Match file names case-insensitively.
    pub case_ok: bool,
}

impl ImportConfig {
    /// Create a config with the given default search path.
    #[must_use]
    pub fn new(search_path: Vec<String>) -> Self {
        Self {
            search_path,
            ..Default::default()
        }
    }

    /// Build a config from `LOADPATH_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let search_path = std::env::var_os(PATH_ENV)
            .map(|raw| {
                std::env::split_paths(&raw)
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            search_path,
            dont_write_artifacts: env_flag(DONT_WRITE_ARTIFACTS_ENV),
            case_ok: env_flag(CASE_OK_ENV),
        }
    }

    /// Set the default search path.
    #[must_use]
    pub fn with_search_path(mut self, search_path: Vec<String>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Prepend entries to the default search path.
    #[must_use]
    pub fn with_prepended_path(mut self, entries: Vec<String>) -> Self {
        let mut search_path = entries;
        search_path.append(&mut self.search_path);
        self.search_path = search_path;
        self
    }

    /// Disable or enable artifact persistence.
    #[must_use]
    pub fn with_dont_write_artifacts(mut self, dont_write: bool) -> Self {
        self.dont_write_artifacts = dont_write;
        self
    }

    /// Set the case-insensitivity override.
    #[must_use]
    pub fn with_case_ok(mut self, case_ok: bool) -> Self {
        self.case_ok = case_ok;
        self
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var_os(key).is_some_and(|v| !v.is_empty())
}

/// Runtime controls shared by the importer, finders and loaders.
#[derive(Debug, Default)]
pub struct ImportFlags {
    dont_write_artifacts: AtomicBool,
    case_ok: AtomicBool,
}

impl ImportFlags {
    #[must_use]
    pub fn from_config(config: &ImportConfig) -> Self {
        Self {
            dont_write_artifacts: AtomicBool::new(config.dont_write_artifacts),
            case_ok: AtomicBool::new(config.case_ok),
        }
    }

    #[must_use]
    pub fn dont_write_artifacts(&self) -> bool {
        self.dont_write_artifacts.load(Ordering::Relaxed)
    }

    pub fn set_dont_write_artifacts(&self, value: bool) {
        self.dont_write_artifacts.store(value, Ordering::Relaxed);
    }

    #[must_use]
    pub fn case_ok(&self) -> bool {
        self.case_ok.load(Ordering::Relaxed)
    }

    pub fn set_case_ok(&self, value: bool) {
        self.case_ok.store(value, Ordering::Relaxed);
    }
}
