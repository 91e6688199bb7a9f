//! Compiled artifact cache.
//!
//! An artifact sits next to its source under `__cache__/` and has the layout
//!
//! ```text
//! [4-byte format tag][4-byte LE source mtime (seconds, truncated)][payload]
//! ```
//!
//! The payload is a JSON-serialized [`CodeObject`]. A short or mismatched
//! header means "regenerate"; a header that identifies the format but is
//! truncated before the timestamp, or a payload that fails to decode, is
//! reported as an error.

use crate::compiler::CodeObject;
use crate::error::{ImportError, ImportResult};
use crate::version::ARTIFACT_FORMAT_VERSION;
use std::path::{Path, PathBuf};

/// Suffix of unit source files.
pub const SOURCE_SUFFIX: &str = ".src";

/// Suffix of compiled artifacts.
pub const ARTIFACT_SUFFIX: &str = ".srcc";

/// Directory, next to the source, that holds artifacts.
pub const CACHE_DIR: &str = "__cache__";

/// Length of the tag plus timestamp header.
pub const HEADER_LEN: usize = 8;

/// Tag identifying the current artifact format.
pub const FORMAT_TAG: [u8; 4] = {
    let v = ARTIFACT_FORMAT_VERSION.to_le_bytes();
    [v[0], v[1], b'\r', b'\n']
};

/// Artifact path for a source file: `dir/__cache__/<stem>.srcc`.
#[must_use]
pub fn cache_path_for(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    dir.join(CACHE_DIR).join(format!("{stem}{ARTIFACT_SUFFIX}"))
}

/// Source path an artifact was produced from, if `artifact` lives in a cache dir.
#[must_use]
pub fn source_path_for(artifact: &Path) -> Option<PathBuf> {
    let cache_dir = artifact.parent()?;
    if cache_dir.file_name()? != CACHE_DIR {
        return None;
    }
    let stem = artifact.file_stem()?.to_string_lossy().into_owned();
    let dir = cache_dir.parent().unwrap_or_else(|| Path::new(""));
    Some(dir.join(format!("{stem}{SOURCE_SUFFIX}")))
}

/// Decoded artifact header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactHeader {
    pub tag: [u8; 4],
    pub source_mtime: u32,
}

impl ArtifactHeader {
    #[must_use]
    pub fn is_current_format(&self) -> bool {
        self.tag == FORMAT_TAG
    }
}

/// Parse the header, returning `None` if fewer than 8 bytes are present.
#[must_use]
pub fn read_header(data: &[u8]) -> Option<ArtifactHeader> {
    let tag: [u8; 4] = data.get(0..4)?.try_into().ok()?;
    let mtime: [u8; 4] = data.get(4..HEADER_LEN)?.try_into().ok()?;
    Some(ArtifactHeader {
        tag,
        source_mtime: u32::from_le_bytes(mtime),
    })
}

/// Outcome of checking an artifact against its source.
#[derive(Debug, PartialEq, Eq)]
pub enum Validation<'a> {
    /// Header matches; the payload may be decoded.
    Fresh(&'a [u8]),
    /// The artifact must be regenerated from source.
    Stale(StaleReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    TooShort,
    TagMismatch,
    MtimeMismatch,
}

impl StaleReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooShort => "too short",
            Self::TagMismatch => "format tag mismatch",
            Self::MtimeMismatch => "source changed",
        }
    }
}

/// Check `data` (read from `path`) against the source mtime.
pub fn validate<'a>(
    data: &'a [u8],
    source_mtime: u32,
    path: &Path,
) -> ImportResult<Validation<'a>> {
    if data.len() < 4 {
        return Ok(Validation::Stale(StaleReason::TooShort));
    }
    if data[..4] != FORMAT_TAG {
        return Ok(Validation::Stale(StaleReason::TagMismatch));
    }
    let Some(header) = read_header(data) else {
        return Err(ImportError::CorruptArtifact {
            path: path.to_path_buf(),
            reason: format!("truncated header ({} bytes)", data.len()),
        });
    };
    if header.source_mtime != source_mtime {
        return Ok(Validation::Stale(StaleReason::MtimeMismatch));
    }
    Ok(Validation::Fresh(&data[HEADER_LEN..]))
}

/// Decode an artifact payload.
pub fn decode_payload(payload: &[u8], path: &Path) -> ImportResult<CodeObject> {
    CodeObject::from_payload(payload).map_err(|source| ImportError::MalformedPayload {
        path: path.to_path_buf(),
        source,
    })
}

/// Build artifact bytes for `code` compiled from a source with `source_mtime`.
pub fn encode(source_mtime: u32, code: &CodeObject) -> Result<Vec<u8>, serde_json::Error> {
    let payload = code.to_payload()?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&FORMAT_TAG);
    out.extend_from_slice(&source_mtime.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Persist artifact bytes, creating the cache directory as needed.
///
/// Failures are logged and swallowed; a missing artifact only costs a
/// recompile. Returns whether the artifact was written.
pub fn write_best_effort(path: &Path, bytes: &[u8]) -> bool {
    match loadpath_util::fs::write_creating_dirs(path, bytes) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
            true
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "artifact write skipped");
            false
        }
    }
}
