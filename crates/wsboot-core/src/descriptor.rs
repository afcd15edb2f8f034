use crate::error::{Result, WorkspaceError};
use crate::paths;
use crate::tier::Tier;
use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Schema version written into new descriptors.
pub const SCHEMA_VERSION: &str = "2026.26";

// ---------------------------------------------------------------------------
// WorkspaceDescriptor
// ---------------------------------------------------------------------------

/// Persisted identity of a workspace (`.gemini/workspace.json`).
///
/// `tier` changes only through a fully successful upgrade; see
/// [`crate::upgrade`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDescriptor {
    pub version: String,
    pub tier: Tier,
    pub name: String,
    pub created: DateTime<FixedOffset>,
    #[serde(default)]
    pub parent_workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgraded: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_tier: Option<Tier>,
}

pub fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

impl WorkspaceDescriptor {
    pub fn new(name: impl Into<String>, tier: Tier, parent_workspace: Option<String>) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            tier,
            name: name.into(),
            created: now(),
            parent_workspace,
            upgraded: None,
            previous_tier: None,
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::descriptor_path(root);
        if !path.exists() {
            return Err(WorkspaceError::NotAWorkspace(root.to_path_buf()));
        }
        let data = std::fs::read_to_string(&path)?;
        let descriptor: WorkspaceDescriptor = serde_json::from_str(&data).map_err(|e| {
            WorkspaceError::Configuration(format!("invalid {}: {e}", paths::DESCRIPTOR_FILE))
        })?;
        migrate(descriptor)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::descriptor_path(root);
        let mut data = serde_json::to_string_pretty(self)?;
        data.push('\n');
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Record a completed upgrade that started at `started`. Callers persist
    /// with [`Self::save`] only after every structural step has succeeded.
    pub fn record_upgrade(&mut self, target: Tier, started: DateTime<FixedOffset>) {
        self.previous_tier = Some(self.tier);
        self.tier = target;
        self.upgraded = Some(started);
    }
}

/// Bring a loaded descriptor up to [`SCHEMA_VERSION`].
///
/// Every released schema so far shares one shape, so older versions are
/// restamped. A future shape change adds a match arm here.
pub fn migrate(mut descriptor: WorkspaceDescriptor) -> Result<WorkspaceDescriptor> {
    if descriptor.version.trim().is_empty() {
        return Err(WorkspaceError::Configuration(
            "workspace.json has an empty 'version'".to_string(),
        ));
    }
    if descriptor.version != SCHEMA_VERSION {
        tracing::debug!(
            from = %descriptor.version,
            to = SCHEMA_VERSION,
            "migrating workspace descriptor"
        );
        descriptor.version = SCHEMA_VERSION.to_string();
    }
    Ok(descriptor)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
