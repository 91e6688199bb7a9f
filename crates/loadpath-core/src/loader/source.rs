//! Loaders for source files and bare artifacts.

use super::{load_with, Loader, LoaderEnv, LoaderKind};
use crate::artifact::{self, StaleReason, Validation, FORMAT_TAG, HEADER_LEN};
use crate::compiler::{execute, CodeObject};
use crate::encoding::decode_source;
use crate::error::{ImportError, ImportResult};
use crate::importer::Importer;
use crate::module::Module;
use loadpath_util::fs::{mtime_secs, read_optional};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Stem of the file that initializes a package directory.
pub const PACKAGE_INIT_STEM: &str = "__init__";

fn is_init_file(path: &Path) -> bool {
    path.file_stem().is_some_and(|s| s == PACKAGE_INIT_STEM)
}

/// Search path of a package whose init file is `path`.
fn package_search_path(path: &Path) -> Vec<String> {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    vec![dir.to_string_lossy().into_owned()]
}

/// Where a [`SourceLoader`] got its code from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeOrigin {
    /// A valid artifact was reused.
    Artifact,
    /// The source was compiled; `persisted` reports whether an artifact was written.
    Compiled { persisted: bool },
}

/// A loader backed by source text, sharing the artifact cache.
///
/// Implementors supply storage hooks: [`Loader::get_data`] for reads,
/// [`SourceLoader::path_mtime`] for the source stamp and
/// [`SourceLoader::set_data`] for best-effort writes. Validation, compiling
/// and persistence are provided on top of them.
pub trait SourceLoader: Loader {
    /// Compiler and runtime flags.
    fn env(&self) -> &LoaderEnv;

    /// Location of the source text.
    fn source_path(&self) -> &Path;

    /// Modification stamp of `path`, in whole seconds truncated to 32 bits.
    fn path_mtime(&self, path: &Path) -> ImportResult<u32>;

    /// Store `data` at `path`, creating intermediate directories.
    ///
    /// Returns whether the data was stored. A store that cannot be written
    /// reports `false` rather than failing the load.
    fn set_data(&self, path: &Path, data: &[u8]) -> bool;

    /// Artifact location for the source.
    fn cache_path(&self) -> PathBuf {
        artifact::cache_path_for(self.source_path())
    }

    /// Artifact bytes, or `None` when there is no usable artifact.
    fn read_artifact(&self, path: &Path) -> Option<Vec<u8>> {
        match self.get_data(path) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::trace!(artifact = %path.display(), error = %e, "no artifact");
                None
            }
        }
    }

    /// Decoded source text.
    fn source_text(&self) -> ImportResult<String> {
        let path = self.source_path();
        let bytes = self.get_data(path)?;
        Ok(decode_source(&bytes, &path.display().to_string())?)
    }

    /// Return the code object for the source and say where it came from.
    fn get_code_with_status(&self) -> ImportResult<(CodeObject, CodeOrigin)> {
        let source_path = self.source_path();
        let mtime = self.path_mtime(source_path)?;
        let cache_path = self.cache_path();

        if let Some(data) = self.read_artifact(&cache_path) {
            match artifact::validate(&data, mtime, &cache_path)? {
                Validation::Fresh(payload) => {
                    let code = artifact::decode_payload(payload, &cache_path)?;
                    tracing::debug!(
                        source = %source_path.display(),
                        artifact = %cache_path.display(),
                        "artifact hit"
                    );
                    return Ok((code, CodeOrigin::Artifact));
                }
                Validation::Stale(reason) => {
                    tracing::debug!(
                        artifact = %cache_path.display(),
                        reason = reason.as_str(),
                        "artifact stale"
                    );
                }
            }
        }

        let env = self.env();
        let text = self.source_text()?;
        let code = env
            .compiler
            .compile(&text, &source_path.display().to_string())?;
        tracing::debug!(
            source = %source_path.display(),
            compiler = env.compiler.name(),
            "compiled source"
        );

        let persisted = if env.flags.dont_write_artifacts() {
            tracing::trace!(source = %source_path.display(), "artifact writing disabled");
            false
        } else {
            self.persist(&code, mtime)
        };
        Ok((code, CodeOrigin::Compiled { persisted }))
    }

    /// Encode `code` stamped with `mtime` and hand it to [`SourceLoader::set_data`].
    fn persist(&self, code: &CodeObject, mtime: u32) -> bool {
        let cache_path = self.cache_path();
        match artifact::encode(mtime, code) {
            Ok(bytes) => self.set_data(&cache_path, &bytes),
            Err(e) => {
                tracing::debug!(
                    artifact = %cache_path.display(),
                    error = %e,
                    "artifact encode failed"
                );
                false
            }
        }
    }
}

/// Loads a unit from a source file, backed by the artifact cache.
#[derive(Debug)]
pub struct SourceFileLoader {
    name: String,
    path: PathBuf,
    env: LoaderEnv,
}

impl SourceFileLoader {
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, env: LoaderEnv) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            env,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceLoader for SourceFileLoader {
    fn env(&self) -> &LoaderEnv {
        &self.env
    }

    fn source_path(&self) -> &Path {
        &self.path
    }

    fn path_mtime(&self, path: &Path) -> ImportResult<u32> {
        mtime_secs(path).map_err(|e| ImportError::io(path, e))
    }

    fn set_data(&self, path: &Path, data: &[u8]) -> bool {
        artifact::write_best_effort(path, data)
    }

    fn read_artifact(&self, path: &Path) -> Option<Vec<u8>> {
        match read_optional(path) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(artifact = %path.display(), error = %e, "artifact unreadable");
                None
            }
        }
    }
}

impl Loader for SourceFileLoader {
    fn load_module(
        self: Arc<Self>,
        importer: &Importer,
        fullname: &str,
    ) -> ImportResult<Arc<Module>> {
        let is_package = is_init_file(&self.path);
        let loader: Arc<dyn Loader> = self.clone();

        load_with(importer, fullname, is_package, |module| {
            module.set_origin(Some(self.path.display().to_string()));
            module.set_cached(Some(self.cache_path()));
            module.set_loader(Some(loader));
            if is_package {
                module.set_search_path(Some(package_search_path(&self.path)));
            }
            let (code, _) = self.get_code_with_status()?;
            execute(&code, module, importer)
        })
    }

    fn kind(&self) -> LoaderKind {
        LoaderKind::Source
    }

    fn is_package(&self, _fullname: &str) -> bool {
        is_init_file(&self.path)
    }

    fn get_source(&self, _fullname: &str) -> ImportResult<Option<String>> {
        self.source_text().map(Some)
    }

    fn get_code(&self, _fullname: &str) -> ImportResult<Option<CodeObject>> {
        self.get_code_with_status().map(|(code, _)| Some(code))
    }

    fn get_filename(&self, _fullname: &str) -> Option<PathBuf> {
        Some(self.path.clone())
    }
}

/// Loads a unit from an artifact with no accompanying source.
///
/// The format tag must match; the embedded timestamp is not checked since
/// there is no source to compare against.
#[derive(Debug)]
pub struct SourcelessFileLoader {
    name: String,
    path: PathBuf,
}

impl SourcelessFileLoader {
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_code(&self) -> ImportResult<CodeObject> {
        let data = self.get_data(&self.path)?;
        if data.len() < HEADER_LEN {
            return Err(ImportError::CorruptArtifact {
                path: self.path.clone(),
                reason: StaleReason::TooShort.as_str().to_string(),
            });
        }
        if data[..4] != FORMAT_TAG {
            return Err(ImportError::CorruptArtifact {
                path: self.path.clone(),
                reason: StaleReason::TagMismatch.as_str().to_string(),
            });
        }
        artifact::decode_payload(&data[HEADER_LEN..], &self.path)
    }
}

impl Loader for SourcelessFileLoader {
    fn load_module(
        self: Arc<Self>,
        importer: &Importer,
        fullname: &str,
    ) -> ImportResult<Arc<Module>> {
        let is_package = is_init_file(&self.path);
        let loader: Arc<dyn Loader> = self.clone();

        load_with(importer, fullname, is_package, |module| {
            module.set_origin(Some(self.path.display().to_string()));
            module.set_cached(Some(self.path.clone()));
            module.set_loader(Some(loader));
            if is_package {
                module.set_search_path(Some(package_search_path(&self.path)));
            }
            let code = self.read_code()?;
            tracing::debug!(
                name = %self.name,
                artifact = %self.path.display(),
                "loading sourceless unit"
            );
            execute(&code, module, importer)
        })
    }

    fn kind(&self) -> LoaderKind {
        LoaderKind::Sourceless
    }

    fn is_package(&self, _fullname: &str) -> bool {
        is_init_file(&self.path)
    }

    fn get_code(&self, _fullname: &str) -> ImportResult<Option<CodeObject>> {
        self.read_code().map(Some)
    }

    fn get_filename(&self, _fullname: &str) -> Option<PathBuf> {
        Some(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{Compiler, LineCompiler};
    use crate::config::{ImportConfig, ImportFlags};

    fn env(dont_write: bool) -> LoaderEnv {
        let config = ImportConfig::default().with_dont_write_artifacts(dont_write);
        LoaderEnv::new(
            Arc::new(LineCompiler),
            Arc::new(ImportFlags::from_config(&config)),
        )
    }

    #[test]
    fn test_compile_then_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.src");
        std::fs::write(&path, "a = 1\n").unwrap();
        let loader = SourceFileLoader::new("m", &path, env(false));

        let (first, origin) = loader.get_code_with_status().unwrap();
        assert_eq!(origin, CodeOrigin::Compiled { persisted: true });
        assert!(loader.cache_path().exists());

        let (second, origin) = loader.get_code_with_status().unwrap();
        assert_eq!(origin, CodeOrigin::Artifact);
        assert_eq!(first, second);
    }

    #[test]
    fn test_dont_write_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.src");
        std::fs::write(&path, "a = 1\n").unwrap();
        let loader = SourceFileLoader::new("m", &path, env(true));

        let (_, origin) = loader.get_code_with_status().unwrap();
        assert_eq!(origin, CodeOrigin::Compiled { persisted: false });
        assert!(!loader.cache_path().exists());
    }

    #[test]
    fn test_package_detection() {
        let loader = SourceFileLoader::new("pkg", "/lib/pkg/__init__.src", env(true));
        assert!(loader.is_package("pkg"));
        assert_eq!(package_search_path(loader.path()), vec!["/lib/pkg".to_string()]);

        let module = SourceFileLoader::new("m", "/lib/m.src", env(true));
        assert!(!module.is_package("m"));
    }

    #[test]
    fn test_get_source_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.src");
        std::fs::write(&path, b"# coding: latin-1\r\nx = '\xe9'\r\n").unwrap();
        let loader = SourceFileLoader::new("m", &path, env(true));

        let source = loader.get_source("m").unwrap().unwrap();
        assert_eq!(source, "# coding: latin-1\nx = '\u{e9}'\n");
    }

    #[test]
    fn test_sourceless_rejects_bad_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.srcc");

        std::fs::write(&path, b"\x01\x00").unwrap();
        let err = SourcelessFileLoader::new("m", &path).read_code().unwrap_err();
        assert!(matches!(err, ImportError::CorruptArtifact { .. }));

        std::fs::write(&path, b"XXXX\x00\x00\x00\x00{}").unwrap();
        let err = SourcelessFileLoader::new("m", &path).read_code().unwrap_err();
        assert!(matches!(err, ImportError::CorruptArtifact { .. }));
    }

    #[test]
    fn test_sourceless_ignores_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.srcc");
        let code = LineCompiler.compile("a = 1\n", "m.src").unwrap();
        std::fs::write(&path, artifact::encode(0xdead, &code).unwrap()).unwrap();

        let loaded = SourcelessFileLoader::new("m", &path).read_code().unwrap();
        assert_eq!(loaded, code);
    }
}
