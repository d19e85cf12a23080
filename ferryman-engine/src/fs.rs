//! Atomic file persistence
//!
//! Every managed file is written through [`atomic_write`]: the text goes to
//! a temp file in the destination's own directory, permissions are fixed to
//! 0644 so the proxy process can read it, and the temp file is renamed over
//! the destination. The proxy never observes a half-written file, and a
//! failure before the rename leaves the destination untouched.

use ferryman_core::{Error, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Mode bits for files the proxy container must be able to read
#[cfg(unix)]
const CONFIG_FILE_MODE: u32 = 0o644;

/// Durable, all-or-nothing write of `text` to `path`
pub fn atomic_write(path: impl AsRef<Path>, text: &str) -> Result<()> {
    let path = path.as_ref();
    let dir = path.parent().ok_or_else(|| {
        Error::InvalidConfig(format!("path has no parent directory: {}", path.display()))
    })?;
    std::fs::create_dir_all(dir)?;

    // The temp file must live in the destination directory: rename is only
    // atomic within one filesystem.
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(text.as_bytes())?;
    temp.flush()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(CONFIG_FILE_MODE);
        std::fs::set_permissions(temp.path(), perms)?;
    }

    temp.persist(path)
        .map_err(|e| Error::Io(e.error))?;

    tracing::debug!(path = %path.display(), bytes = text.len(), "wrote config file");
    Ok(())
}

/// Read a managed file; missing files are a distinct, typed condition
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::not_found(format!("file '{}'", path.display())))
        }
        Err(e) => Err(Error::Io(e)),
    }
}

/// Delete a file, treating an already-missing file as success
pub fn remove_file_if_exists(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "fragment already absent");
            Ok(())
        }
        Err(e) => Err(Error::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.kdl");
        atomic_write(&path, "proxy http://x:80\n").unwrap();
        assert_eq!(read_to_string(&path).unwrap(), "proxy http://x:80\n");
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/a.kdl");
        atomic_write(&path, "x\n").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.kdl");
        atomic_write(&path, "old\n").unwrap();
        atomic_write(&path, "new\n").unwrap();
        assert_eq!(read_to_string(&path).unwrap(), "new\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_written_file_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.kdl");
        atomic_write(&path, "x\n").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_to_string(dir.path().join("missing.kdl")).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        remove_file_if_exists(dir.path().join("missing.kdl")).unwrap();
    }
}
