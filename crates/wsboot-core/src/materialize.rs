//! Structure Materializer: create whatever a tier requires and is missing.
//! Existing files are never touched, so every call is safe to repeat.

use crate::error::{Result, WorkspaceError};
use crate::guard;
use crate::structure::{Entry, StructureSpec};
use crate::tier::{EntryKind, Tier};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterializationResult {
    pub tier: Tier,
    pub created: Vec<Entry>,
}

impl MaterializationResult {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
    }
}

/// Entries `materialize(root, tier)` would create, without writing anything.
pub fn preview(root: &Path, tier: Tier) -> Result<Vec<Entry>> {
    preview_excluding(root, tier, &HashSet::new())
}

/// Like [`preview`], skipping paths an earlier planned step already creates.
pub fn preview_excluding(
    root: &Path,
    tier: Tier,
    planned: &HashSet<String>,
) -> Result<Vec<Entry>> {
    let layout = StructureSpec::for_tier(tier);
    let mut out = Vec::new();
    for def in layout.entries() {
        if planned.contains(def.path) {
            continue;
        }
        let path = guard::sanitize_relative(def.path, root)?;
        if std::fs::symlink_metadata(&path).is_err() {
            out.push(Entry::from(*def));
        }
    }
    Ok(out)
}

pub fn materialize(root: &Path, tier: Tier) -> Result<MaterializationResult> {
    let layout = StructureSpec::for_tier(tier);
    let mut created: Vec<Entry> = Vec::new();

    for def in layout.entries() {
        let path = guard::sanitize_relative(def.path, root)?;
        guard::ensure_no_symlinks(root, &path)?;

        let fail = |created: &[Entry], source: std::io::Error| WorkspaceError::Creation {
            path: def.path.to_string(),
            created: created.iter().map(|e| e.to_string()).collect(),
            source,
        };

        match def.kind {
            EntryKind::Dir => {
                if path.is_dir() {
                    continue;
                }
                if path.exists() {
                    return Err(fail(
                        &created,
                        std::io::Error::new(
                            std::io::ErrorKind::AlreadyExists,
                            "exists but is not a directory",
                        ),
                    ));
                }
                std::fs::create_dir_all(&path).map_err(|e| fail(&created, e))?;
                tracing::debug!(path = def.path, "created directory");
            }
            EntryKind::File => {
                if path.is_dir() {
                    return Err(fail(
                        &created,
                        std::io::Error::new(
                            std::io::ErrorKind::AlreadyExists,
                            "exists but is a directory",
                        ),
                    ));
                }
                let written = crate::io::write_if_missing(&path, def.stub.as_bytes())
                    .map_err(|e| fail(&created, e))?;
                if !written {
                    continue;
                }
                tracing::debug!(path = def.path, "created file");
            }
        }
        created.push(Entry::from(*def));
    }

    tracing::info!(
        tier = tier.as_str(),
        created = created.len(),
        "materialized workspace structure"
    );
    Ok(MaterializationResult { tier, created })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
