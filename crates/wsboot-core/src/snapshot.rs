//! Snapshot Engine: tier-scoped backups under `.gemini/backups/` and
//! confirmed restore with stale-file removal.
//!
//! Layout of one snapshot:
//!
//! ```text
//! .gemini/backups/20260126T143022123Z_before-refactor/
//!   manifest.json
//!   data/src/main.rs
//!   data/docs/roadmap.md
//!   ...
//! ```
//!
//! Every check on a manifest (Path Guard, eligible set, data presence,
//! symlinks on the live side) runs while building the [`RestorePlan`], so a
//! rejected snapshot never touches the workspace.

use crate::descriptor;
use crate::error::{Result, WorkspaceError};
use crate::guard;
use crate::paths;
use crate::structure::Entry;
use crate::tier::{EntryKind, Tier};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Manual,
    PreUpgrade,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub name: String,
    pub created: DateTime<FixedOffset>,
    pub tier: Tier,
    pub kind: SnapshotKind,
    /// Snapshot-eligible directories at capture time; stale removal on
    /// restore never leaves this set.
    pub dirs: Vec<String>,
    pub entries: Vec<Entry>,
}

impl SnapshotManifest {
    pub fn file_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::File)
            .count()
    }
}

/// A snapshot on disk: `id` is the directory name under the backup root.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotHandle {
    pub id: String,
    pub path: PathBuf,
    pub manifest: SnapshotManifest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestorePlan {
    pub snapshot: String,
    pub tier: Tier,
    pub restore: Vec<Entry>,
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreSummary {
    pub snapshot: String,
    pub tier: Tier,
    pub restored: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RestoreResult {
    ConfirmationRequired(RestorePlan),
    Restored(RestoreSummary),
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// Capture the tier's snapshot directories and the tracked identity files.
pub fn snapshot(root: &Path, tier: Tier, name: &str) -> Result<SnapshotHandle> {
    capture(root, tier, name, SnapshotKind::Manual)
}

/// Backup taken by the Upgrade Engine before the first structural change.
pub fn pre_upgrade_backup(root: &Path, from: Tier, to: Tier) -> Result<SnapshotHandle> {
    let name = format!("pre_upgrade_{}_to_{}", from.as_str(), to.as_str());
    capture(root, from, &name, SnapshotKind::PreUpgrade)
}

fn capture(root: &Path, tier: Tier, name: &str, kind: SnapshotKind) -> Result<SnapshotHandle> {
    let backups = paths::backups_dir(root);
    guard::sanitize_identifier(name, &backups)?;

    std::fs::create_dir_all(&backups)?;

    // Two snapshots with the same name inside one millisecond would share a
    // directory; wait for the clock to move on.
    let (created, id, dest) = loop {
        let created = descriptor::now();
        let id = format!(
            "{}_{name}",
            created.with_timezone(&Utc).format("%Y%m%dT%H%M%S%3fZ")
        );
        let dest = guard::sanitize_identifier(&id, &backups)?;
        match std::fs::create_dir(&dest) {
            Ok(()) => break (created, id, dest),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
            Err(e) => return Err(e.into()),
        }
    };

    match copy_into(root, tier, &dest) {
        Ok(entries) => {
            let manifest = SnapshotManifest {
                name: name.to_string(),
                created,
                tier,
                kind,
                dirs: tier.snapshot_dirs().iter().map(|d| d.to_string()).collect(),
                entries,
            };
            let mut data = serde_json::to_string_pretty(&manifest)?;
            data.push('\n');
            crate::io::atomic_write(&paths::snapshot_manifest(&dest), data.as_bytes())?;
            tracing::info!(
                snapshot = %id,
                files = manifest.file_count(),
                "snapshot created"
            );
            Ok(SnapshotHandle {
                id,
                path: dest,
                manifest,
            })
        }
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_dir_all(&dest) {
                tracing::warn!(
                    path = %dest.display(),
                    error = %cleanup,
                    "could not remove partial snapshot"
                );
            }
            Err(e)
        }
    }
}

fn copy_into(root: &Path, tier: Tier, dest: &Path) -> Result<Vec<Entry>> {
    let data = paths::snapshot_data(dest);
    std::fs::create_dir_all(&data)?;
    let mut entries = Vec::new();

    for dir in tier.snapshot_dirs() {
        let src = root.join(dir);
        match std::fs::symlink_metadata(&src) {
            Ok(meta) if meta.file_type().is_symlink() => {
                tracing::warn!(path = dir, "skipping symlinked snapshot directory");
                continue;
            }
            Ok(meta) if meta.is_dir() => {}
            _ => continue,
        }

        for entry in WalkDir::new(&src).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            let Some(rel) = paths::relative_key(root, entry.path()) else {
                continue;
            };
            let file_type = entry.file_type();
            if file_type.is_symlink() {
                tracing::warn!(path = %rel, "skipping symlink");
                continue;
            }
            let target = data.join(&rel);
            if file_type.is_dir() {
                std::fs::create_dir_all(&target)?;
                entries.push(Entry::dir(rel));
            } else if file_type.is_file() {
                crate::io::copy_file(entry.path(), &target)?;
                entries.push(Entry::file(rel));
            }
        }
    }

    for tracked in paths::TRACKED_FILES {
        let src = root.join(tracked);
        let is_file = std::fs::symlink_metadata(&src)
            .map(|m| m.file_type().is_file())
            .unwrap_or(false);
        if is_file {
            crate::io::copy_file(&src, &data.join(tracked))?;
            entries.push(Entry::file(*tracked));
        }
    }

    Ok(entries)
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

fn load_manifest(snapshot_dir: &Path) -> Result<SnapshotManifest> {
    let path = paths::snapshot_manifest(snapshot_dir);
    let data = std::fs::read_to_string(&path).map_err(|e| {
        WorkspaceError::Rollback(format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&data)
        .map_err(|e| WorkspaceError::Rollback(format!("corrupt manifest {}: {e}", path.display())))
}

/// Every readable snapshot, newest first. Directories without a readable
/// manifest are skipped with a warning.
pub fn list_snapshots(root: &Path) -> Result<Vec<SnapshotHandle>> {
    let backups = paths::backups_dir(root);
    if !backups.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(&backups)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let id = entry.file_name().to_string_lossy().into_owned();
        match load_manifest(&entry.path()) {
            Ok(manifest) => out.push(SnapshotHandle {
                id,
                path: entry.path(),
                manifest,
            }),
            Err(e) => tracing::warn!(snapshot = %id, error = %e, "skipping unreadable snapshot"),
        }
    }
    out.sort_by(|a, b| b.id.cmp(&a.id));
    Ok(out)
}

/// Resolve a snapshot by directory id or short name (most recent match).
/// `None` selects the most recent snapshot.
pub fn find_snapshot(root: &Path, name: Option<&str>) -> Result<SnapshotHandle> {
    let backups = paths::backups_dir(root);
    let Some(name) = name else {
        return list_snapshots(root)?.into_iter().next().ok_or_else(|| {
            WorkspaceError::Rollback(format!("no snapshots found in {}", paths::BACKUPS_DIR))
        });
    };

    let exact = guard::sanitize_identifier(name, &backups)?;
    let exact_is_dir = std::fs::symlink_metadata(&exact)
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if exact_is_dir {
        let manifest = load_manifest(&exact)?;
        return Ok(SnapshotHandle {
            id: name.to_string(),
            path: exact,
            manifest,
        });
    }

    let all = list_snapshots(root)?;
    let available: Vec<String> = all.iter().map(|s| s.id.clone()).collect();
    all.into_iter()
        .find(|s| s.manifest.name == name)
        .ok_or_else(|| WorkspaceError::SnapshotNotFound {
            name: name.to_string(),
            available,
        })
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

fn rejected(path: &str, e: WorkspaceError) -> WorkspaceError {
    WorkspaceError::Rollback(format!("manifest entry '{path}' rejected: {e}"))
}

/// Compute what a confirmed restore would do. Performs every check that can
/// fail; the workspace is not modified.
pub fn plan_restore(root: &Path, handle: &SnapshotHandle) -> Result<RestorePlan> {
    let manifest = &handle.manifest;
    let data = paths::snapshot_data(&handle.path);
    let eligible = manifest.tier.snapshot_dirs();

    for dir in &manifest.dirs {
        guard::sanitize_relative(dir, root).map_err(|e| rejected(dir, e))?;
        if !eligible.contains(&dir.as_str()) {
            return Err(WorkspaceError::Rollback(format!(
                "directory '{dir}' is not snapshot-eligible for tier {}",
                manifest.tier
            )));
        }
    }

    let mut kept: HashSet<&str> = HashSet::new();
    for entry in &manifest.entries {
        let live = guard::sanitize_relative(&entry.path, root).map_err(|e| rejected(&entry.path, e))?;
        let stored =
            guard::sanitize_relative(&entry.path, &data).map_err(|e| rejected(&entry.path, e))?;

        let top = entry.path.split('/').next().unwrap_or_default();
        let in_scope = manifest.dirs.iter().any(|d| d == top)
            || (entry.kind == EntryKind::File && paths::TRACKED_FILES.contains(&entry.path.as_str()));
        if !in_scope {
            return Err(WorkspaceError::Rollback(format!(
                "manifest entry '{}' is outside the snapshot scope",
                entry.path
            )));
        }
        if entry.kind == EntryKind::File && !stored.is_file() {
            return Err(WorkspaceError::Rollback(format!(
                "snapshot data missing for '{}'",
                entry.path
            )));
        }
        guard::ensure_no_symlinks(root, &live).map_err(|e| rejected(&entry.path, e))?;
        kept.insert(entry.path.as_str());
    }

    let mut remove = Vec::new();
    for dir in &manifest.dirs {
        let live = root.join(dir);
        match std::fs::symlink_metadata(&live) {
            Ok(meta) if meta.file_type().is_symlink() => {
                tracing::warn!(path = %dir, "not descending into symlinked directory");
                continue;
            }
            Ok(meta) if meta.is_dir() => {}
            _ => continue,
        }
        for entry in WalkDir::new(&live)
            .min_depth(1)
            .follow_links(false)
            .contents_first(true)
            .sort_by_file_name()
        {
            let entry = entry?;
            if let Some(rel) = paths::relative_key(root, entry.path()) {
                if !kept.contains(rel.as_str()) {
                    remove.push(rel);
                }
            }
        }
    }

    Ok(RestorePlan {
        snapshot: handle.id.clone(),
        tier: manifest.tier,
        restore: manifest.entries.clone(),
        remove,
    })
}

/// Restore a snapshot. Without `confirmed` only the plan is returned.
pub fn restore(root: &Path, name: Option<&str>, confirmed: bool) -> Result<RestoreResult> {
    let handle = find_snapshot(root, name)?;
    let plan = plan_restore(root, &handle)?;
    if !confirmed {
        return Ok(RestoreResult::ConfirmationRequired(plan));
    }

    let data = paths::snapshot_data(&handle.path);
    let failed = |path: &str, e: std::io::Error| {
        WorkspaceError::Rollback(format!("failed to restore '{path}': {e}"))
    };

    let mut restored = 0;
    for entry in &plan.restore {
        let live = root.join(&entry.path);
        match entry.kind {
            EntryKind::Dir => {
                if live.is_file() {
                    std::fs::remove_file(&live).map_err(|e| failed(&entry.path, e))?;
                }
                std::fs::create_dir_all(&live).map_err(|e| failed(&entry.path, e))?;
            }
            EntryKind::File => {
                if live.is_dir() {
                    std::fs::remove_dir_all(&live).map_err(|e| failed(&entry.path, e))?;
                }
                if let Some(parent) = live.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| failed(&entry.path, e))?;
                }
                std::fs::copy(data.join(&entry.path), &live).map_err(|e| failed(&entry.path, e))?;
                restored += 1;
            }
        }
    }

    let mut removed = 0;
    for rel in &plan.remove {
        let live = root.join(rel);
        let result = match std::fs::symlink_metadata(&live) {
            Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(&live),
            Ok(_) => std::fs::remove_file(&live),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => Err(e),
        };
        result.map_err(|e| WorkspaceError::Rollback(format!("failed to remove '{rel}': {e}")))?;
        tracing::debug!(path = %rel, "removed stale path");
        removed += 1;
    }

    tracing::info!(
        snapshot = %plan.snapshot,
        restored,
        removed,
        "snapshot restored"
    );
    Ok(RestoreResult::Restored(RestoreSummary {
        snapshot: plan.snapshot,
        tier: plan.tier,
        restored,
        removed,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::materialize;
    use tempfile::TempDir;

    fn lite_workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        materialize(dir.path(), Tier::Lite).unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "fn main() {}\n").unwrap();
        dir
    }

    #[test]
    fn snapshot_writes_manifest_and_data() {
        let ws = lite_workspace();
        let handle = snapshot(ws.path(), Tier::Lite, "before").unwrap();
        assert!(handle.id.ends_with("_before"));
        assert_eq!(handle.id.find('_'), Some(19));
        assert!(paths::snapshot_manifest(&handle.path).is_file());
        assert!(handle.path.join("data/src/main.rs").is_file());
        assert!(handle.manifest.entries.contains(&Entry::file("src/main.rs")));
        assert!(handle.manifest.entries.contains(&Entry::dir("src")));
        assert!(handle
            .manifest
            .entries
            .contains(&Entry::file(".gemini/settings.json")));
        // tests/ is not eligible at Lite
        assert!(!handle.manifest.entries.iter().any(|e| e.path.starts_with("tests")));
    }

    #[test]
    fn snapshot_name_is_guarded() {
        let ws = lite_workspace();
        assert!(snapshot(ws.path(), Tier::Lite, "../escape").is_err());
        assert!(snapshot(ws.path(), Tier::Lite, "a/b").is_err());
        assert!(!ws.path().join(".gemini/escape").exists());
    }

    #[test]
    fn restore_round_trip_removes_added_and_restores_deleted() {
        let ws = lite_workspace();
        snapshot(ws.path(), Tier::Lite, "base").unwrap();

        std::fs::write(ws.path().join("src/x.rs"), "new").unwrap();
        std::fs::create_dir_all(ws.path().join("docs/extra")).unwrap();
        std::fs::write(ws.path().join("docs/extra/y.md"), "new").unwrap();
        std::fs::remove_file(ws.path().join("docs/roadmap.md")).unwrap();
        std::fs::write(ws.path().join("src/main.rs"), "changed").unwrap();

        let plan = match restore(ws.path(), Some("base"), false).unwrap() {
            RestoreResult::ConfirmationRequired(plan) => plan,
            other => panic!("expected confirmation, got {other:?}"),
        };
        assert!(plan.remove.contains(&"src/x.rs".to_string()));
        assert!(plan.remove.contains(&"docs/extra".to_string()));
        // unconfirmed restore is read-only
        assert!(ws.path().join("src/x.rs").exists());
        assert!(!ws.path().join("docs/roadmap.md").exists());

        let summary = match restore(ws.path(), Some("base"), true).unwrap() {
            RestoreResult::Restored(s) => s,
            other => panic!("expected restore, got {other:?}"),
        };
        assert_eq!(summary.removed, 3);
        assert!(!ws.path().join("src/x.rs").exists());
        assert!(!ws.path().join("docs/extra").exists());
        assert!(ws.path().join("docs/roadmap.md").is_file());
        assert_eq!(
            std::fs::read_to_string(ws.path().join("src/main.rs")).unwrap(),
            "fn main() {}\n"
        );
    }

    #[test]
    fn stale_removal_stays_inside_eligible_dirs() {
        let ws = lite_workspace();
        snapshot(ws.path(), Tier::Lite, "base").unwrap();
        std::fs::write(ws.path().join("tests/later.rs"), "").unwrap();
        std::fs::write(ws.path().join("notes.txt"), "").unwrap();
        restore(ws.path(), None, true).unwrap();
        assert!(ws.path().join("tests/later.rs").exists());
        assert!(ws.path().join("notes.txt").exists());
        assert!(ws.path().join(".gemini/backups").is_dir());
    }

    #[test]
    fn lookup_by_name_picks_most_recent() {
        let ws = lite_workspace();
        let first = snapshot(ws.path(), Tier::Lite, "same").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = snapshot(ws.path(), Tier::Lite, "same").unwrap();
        assert_ne!(first.id, second.id);

        let found = find_snapshot(ws.path(), Some("same")).unwrap();
        assert_eq!(found.id, second.id);
        let exact = find_snapshot(ws.path(), Some(&first.id)).unwrap();
        assert_eq!(exact.id, first.id);

        let listed: Vec<String> = list_snapshots(ws.path())
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(listed, vec![second.id, first.id]);
    }

    #[test]
    fn missing_snapshot_lists_available() {
        let ws = lite_workspace();
        let handle = snapshot(ws.path(), Tier::Lite, "base").unwrap();
        match find_snapshot(ws.path(), Some("nope")) {
            Err(WorkspaceError::SnapshotNotFound { available, .. }) => {
                assert_eq!(available, vec![handle.id]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn no_snapshots_is_rollback_error() {
        let ws = lite_workspace();
        let err = restore(ws.path(), None, true).unwrap_err();
        assert!(matches!(err, WorkspaceError::Rollback(_)));
    }

    #[test]
    fn traversal_in_manifest_is_rejected_before_mutation() {
        let ws = lite_workspace();
        let handle = snapshot(ws.path(), Tier::Lite, "base").unwrap();
        std::fs::write(ws.path().join("src/x.rs"), "keep me").unwrap();

        let mut manifest = handle.manifest.clone();
        manifest.entries.push(Entry::file("src/../../outside.txt"));
        std::fs::write(
            paths::snapshot_manifest(&handle.path),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();

        let err = restore(ws.path(), Some("base"), true).unwrap_err();
        assert!(matches!(err, WorkspaceError::Rollback(_)), "{err}");
        assert!(ws.path().join("src/x.rs").exists());
    }

    #[test]
    fn corrupt_manifest_is_rollback_error() {
        let ws = lite_workspace();
        let handle = snapshot(ws.path(), Tier::Lite, "base").unwrap();
        std::fs::write(paths::snapshot_manifest(&handle.path), "{not json").unwrap();
        let err = find_snapshot(ws.path(), Some(&handle.id)).unwrap_err();
        assert!(matches!(err, WorkspaceError::Rollback(_)));
        assert!(list_snapshots(ws.path()).unwrap().is_empty());
    }

    #[test]
    fn pre_upgrade_backup_is_named_and_tagged() {
        let ws = lite_workspace();
        let handle = pre_upgrade_backup(ws.path(), Tier::Lite, Tier::Enterprise).unwrap();
        assert_eq!(handle.manifest.name, "pre_upgrade_1_to_3");
        assert_eq!(handle.manifest.kind, SnapshotKind::PreUpgrade);
        assert_eq!(handle.manifest.tier, Tier::Lite);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_captured() {
        let ws = lite_workspace();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret"), "s").unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret"), ws.path().join("src/link"))
            .unwrap();
        let handle = snapshot(ws.path(), Tier::Lite, "base").unwrap();
        assert!(!handle.manifest.entries.iter().any(|e| e.path == "src/link"));
        assert!(!handle.path.join("data/src/link").exists());
    }
}
