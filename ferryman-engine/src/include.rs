//! Include-list reconciliation
//!
//! The master document's body is a flat list of `include "<path>"` lines,
//! one per fragment. These operations are idempotent line edits over that
//! list. They are NOT safe under concurrent callers on their own; the sync
//! engine serializes every master-file read-modify-write behind one lock.

use crate::fs;
use ferryman_core::Result;
use std::path::Path;

/// The exact include statement for a fragment path
pub fn include_line(fragment: &Path) -> String {
    format!("include \"{}\"", fragment.display())
}

/// Create the master file, empty, if it does not exist yet
pub fn ensure_master_exists(master: &Path) -> Result<()> {
    if !master.exists() {
        tracing::info!(master = %master.display(), "creating empty master document");
        fs::atomic_write(master, "")?;
    }
    Ok(())
}

/// Ensure the master file references `fragment`.
///
/// Returns true when a line was appended, false when it was already present.
pub fn ensure_included(master: &Path, fragment: &Path) -> Result<bool> {
    let text = fs::read_to_string(master)?;
    let line = include_line(fragment);

    if text.lines().any(|l| l.trim() == line) {
        return Ok(false);
    }

    let mut updated = text;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&line);
    updated.push('\n');
    fs::atomic_write(master, &updated)?;
    tracing::debug!(fragment = %fragment.display(), "added include line");
    Ok(true)
}

/// Remove the include line for `fragment`, then delete the fragment file.
///
/// The master is rewritten strictly before the fragment is removed: a crash
/// in between leaves a harmless orphan file, never a dangling include. A
/// missing include line or an already-deleted fragment is not an error.
pub fn ensure_excluded(master: &Path, fragment: &Path) -> Result<()> {
    let text = fs::read_to_string(master)?;
    let line = include_line(fragment);

    let kept: Vec<&str> = text.lines().filter(|l| l.trim() != line).collect();
    let mut updated = kept.join("\n");
    if !updated.is_empty() {
        updated.push('\n');
    }

    if updated != text {
        fs::atomic_write(master, &updated)?;
        tracing::debug!(fragment = %fragment.display(), "removed include line");
    }

    fs::remove_file_if_exists(fragment)
}

/// Replace the master body with exactly one include line per fragment.
///
/// Reconciliation uses this to rebuild the list from the record store, which
/// also drops any include line whose row no longer exists.
pub fn rebuild(master: &Path, fragments: &[std::path::PathBuf]) -> Result<()> {
    let mut body = String::new();
    for fragment in fragments {
        body.push_str(&include_line(fragment));
        body.push('\n');
    }
    fs::atomic_write(master, &body)?;
    tracing::debug!(lines = fragments.len(), "rebuilt master include list");
    Ok(())
}
