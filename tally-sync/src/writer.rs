//! Repository file I/O.
//!
//! ## `write_text` protocol
//!
//! 1. Normalise line endings to LF.
//! 2. Compare with the current file content; skip if identical.
//! 3. Write to `<path>.tally.tmp`.
//! 4. Rename to the final path (atomic on POSIX).
//!
//! Skipping identical content keeps re-extraction from touching files that
//! did not change, so the repository history only shows real edits.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Atomically write `content` to `path`, creating parent directories.
pub fn write_text(path: &Path, content: &str) -> Result<(), SyncError> {
    let tmp = PathBuf::from(format!("{}.tally.tmp", path.display()));
    write_text_with_tmp(path, content, &tmp)
}

fn write_text_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<(), SyncError> {
    let normalized = content.replace("\r\n", "\n");
    let content = normalized.as_str();

    if read_text_opt(path)?.as_deref() == Some(content) {
        tracing::debug!("unchanged: {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if let Some(tmp_parent) = tmp.parent() {
        std::fs::create_dir_all(tmp_parent).map_err(|e| io_err(tmp_parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::info!("wrote: {}", path.display());
    Ok(())
}

/// Pretty-print `value` as JSON (trailing newline) and write it atomically.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SyncError> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    write_text(path, &json)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Read a file; a missing file is [`SyncError::NotFound`].
pub fn read_text(path: &Path) -> Result<String, SyncError> {
    read_text_opt(path)?.ok_or_else(|| SyncError::NotFound {
        path: path.to_path_buf(),
    })
}

/// Read a file; a missing file is `None`.
pub fn read_text_opt(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Read and parse a JSON file; a missing file is [`SyncError::NotFound`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SyncError> {
    read_json_opt(path)?.ok_or_else(|| SyncError::NotFound {
        path: path.to_path_buf(),
    })
}

/// Read and parse a JSON file; a missing file is `None`.
pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SyncError> {
    let Some(text) = read_text_opt(path)? else {
        return Ok(None);
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| SyncError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

// ---------------------------------------------------------------------------
// Directories
// ---------------------------------------------------------------------------

/// Remove `dir` with everything in it, then create it empty.
///
/// A directory that does not exist counts as removed; any other removal
/// failure is an error.
pub fn reset_dir(dir: &Path) -> Result<(), SyncError> {
    if dir.exists() {
        tracing::info!("cleaning up {}", dir.display());
        match std::fs::remove_dir_all(dir) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(io_err(dir, err)),
        }
    }
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))
}

/// Sorted names of the immediate subdirectories of `dir`; empty if `dir` is absent.
pub fn subdirectories(dir: &Path) -> Result<Vec<String>, SyncError> {
    list_entries(dir, |entry| entry.is_dir())
}

/// Sorted names of the files directly in `dir`; empty if `dir` is absent.
pub fn files_in(dir: &Path) -> Result<Vec<String>, SyncError> {
    list_entries(dir, |entry| entry.is_file())
}

fn list_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<String>, SyncError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(io_err(dir, err)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if keep(&path) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn new_repository_file_is_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("account.json");
        write_text(&path, "{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    /// A write replaces the file through a rename, so an untouched file keeps its inode.
    #[cfg(unix)]
    fn inode(path: &Path) -> u64 {
        use std::os::unix::fs::MetadataExt;
        fs::metadata(path).unwrap().ino()
    }

    #[test]
    #[cfg(unix)]
    fn identical_json_is_left_untouched() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("account.json");
        write_json(&path, &json!({"a": 1})).unwrap();
        let before = inode(&path);
        write_json(&path, &json!({"a": 1})).unwrap();
        assert_eq!(inode(&path), before);
    }

    #[test]
    #[cfg(unix)]
    fn edited_code_file_is_rewritten() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.sql");
        write_text(&path, "select 1").unwrap();
        let before = inode(&path);
        write_text(&path, "select 2").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "select 2");
        assert_ne!(inode(&path), before);
    }

    #[test]
    fn no_tmp_sibling_survives_a_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.json");
        write_text(&path, "data").unwrap();
        let tmp_path = PathBuf::from(format!("{}.tally.tmp", path.display()));
        assert!(!tmp_path.exists(), ".tally.tmp must be cleaned up");
    }

    #[test]
    fn task_files_get_their_workflow_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("workflows").join("Sync").join("tasks").join("A.js");
        write_text(&path, "x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn crlf_is_normalized_on_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("t.liquid");
        write_text(&path, "a\r\nb\r\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
        #[cfg(unix)]
        {
            let before = inode(&path);
            write_text(&path, "a\nb\n").unwrap();
            assert_eq!(inode(&path), before);
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = read_json::<Value>(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
    }

    #[test]
    fn malformed_json_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let err = read_json::<Value>(&path).unwrap_err();
        assert!(matches!(err, SyncError::Parse { ref path, .. } if path.ends_with("bad.json")));
    }

    #[test]
    fn reset_dir_clears_existing_content() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("temp");
        fs::create_dir_all(dir.join("workflows")).unwrap();
        fs::write(dir.join("workflows").join("old.json"), "{}").unwrap();

        reset_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn reset_dir_creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("never").join("existed");
        reset_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn listing_a_missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(subdirectories(&tmp.path().join("none")).unwrap().is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn failed_rename_keeps_the_previous_file() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();

        let path = readonly_dir.join("account.json");
        fs::write(&path, "original").unwrap();

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        let tmp_dir = TempDir::new().unwrap();
        let tmp_path = tmp_dir.path().join("account.json.tally.tmp");

        let result = write_text_with_tmp(&path, "new content", &tmp_path);

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Root ignores directory permissions; only assert when the rename failed.
        if result.is_err() {
            assert_eq!(fs::read_to_string(&path).unwrap(), "original");
            assert!(!tmp_path.exists(), ".tally.tmp should be cleaned up");
        }
    }
}
