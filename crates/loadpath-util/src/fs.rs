use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;

/// Read a file, mapping "not found" to `None`.
///
/// # Errors
/// Returns any I/O error other than `NotFound`.
pub fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Modification time of `path` in whole seconds since the Unix epoch,
/// truncated to 32 bits.
///
/// # Errors
/// Returns an error if the metadata cannot be read or the platform has no mtime.
#[allow(clippy::cast_possible_truncation)]
pub fn mtime_secs(path: &Path) -> io::Result<u32> {
    let modified = fs::metadata(path)?.modified()?;
    // Times before the epoch clamp to zero.
    let secs = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Ok(secs as u32)
}

/// List the entry names of a directory.
///
/// Names that are not valid UTF-8 are converted lossily.
///
/// # Errors
/// Returns an error if the directory cannot be read.
pub fn dir_entry_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Sibling temp path for `path`, unique within this process.
fn temp_sibling(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    let stem = path
        .file_name()
        .map_or_else(|| "artifact".into(), |n| n.to_string_lossy());
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    parent.join(format!(".{stem}.{}.{seq}.tmp", std::process::id()))
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Replace `path` with `bytes` so readers see either the old or the new
/// contents, never a partial file.
///
/// The temp file lives beside `path` so the final rename stays on one
/// filesystem. It is removed on every failure path.
///
/// # Errors
/// Returns an error if the temp file cannot be written or renamed.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp = temp_sibling(path);

    if let Err(e) = write_synced(&temp, bytes) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }

    let renamed = fs::rename(&temp, path).or_else(|e| {
        // Windows refuses to rename over an existing file.
        if cfg!(windows) {
            fs::copy(&temp, path).map(|_| ())
        } else {
            Err(e)
        }
    });
    let _ = fs::remove_file(&temp);
    renamed
}

/// Create any missing parent directories of `path`, then [`atomic_write`] it.
///
/// # Errors
/// Returns an error if a directory cannot be created or the write fails.
pub fn write_creating_dirs(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    atomic_write(path, bytes)
}
