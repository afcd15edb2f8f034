use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const GEMINI_DIR: &str = ".gemini";
pub const DESCRIPTOR_FILE: &str = ".gemini/workspace.json";
pub const BACKUPS_DIR: &str = ".gemini/backups";
pub const GIT_DIR: &str = ".git";

pub const SNAPSHOT_MANIFEST: &str = "manifest.json";
pub const SNAPSHOT_DATA_DIR: &str = "data";

/// Top-level files captured by every snapshot alongside the tier's
/// snapshot directories. Never subject to stale-file removal.
pub const TRACKED_FILES: &[&str] = &[
    ".gemini/workspace.json",
    ".gemini/settings.json",
    "GEMINI.md",
    "Makefile",
];

pub const README_MD: &str = "README.md";
pub const GEMINI_MD: &str = "GEMINI.md";
pub const MAKEFILE: &str = "Makefile";

pub const CONFIG_FILE: &str = ".wsboot.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn descriptor_path(root: &Path) -> PathBuf {
    root.join(DESCRIPTOR_FILE)
}

pub fn backups_dir(root: &Path) -> PathBuf {
    root.join(BACKUPS_DIR)
}

pub fn snapshot_manifest(snapshot_dir: &Path) -> PathBuf {
    snapshot_dir.join(SNAPSHOT_MANIFEST)
}

pub fn snapshot_data(snapshot_dir: &Path) -> PathBuf {
    snapshot_dir.join(SNAPSHOT_DATA_DIR)
}

/// Walk upward from `start` to the first directory holding a workspace
/// descriptor.
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| descriptor_path(dir).is_file())
        .map(Path::to_path_buf)
}

/// Convert a path under `base` into the `/`-separated relative form used in
/// manifests and reports.
pub fn relative_key(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
