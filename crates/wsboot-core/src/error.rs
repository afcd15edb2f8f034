use crate::tier::Tier;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("invalid path '{raw}': {reason}")]
    UnsafePath { raw: String, reason: &'static str },

    #[error("not a workspace: {} has no .gemini/workspace.json", .0.display())]
    NotAWorkspace(PathBuf),

    #[error("failed to create {path}: {source}")]
    Creation {
        path: String,
        /// Entries written before the failure; re-running is safe.
        created: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot move from tier {from} to tier {to}: upgrades are forward-only, use rollback to restore a previous state")]
    Downgrade { from: Tier, to: Tier },

    #[error(
        "upgrade step to tier {failed} failed (last applied: {}; recover with backup '{backup}'): {source}",
        display_tier(.last_applied)
    )]
    Upgrade {
        failed: Tier,
        last_applied: Option<Tier>,
        backup: String,
        #[source]
        source: Box<WorkspaceError>,
    },

    #[error("snapshot not found: {name} (available: {})", display_list(.available))]
    SnapshotNotFound { name: String, available: Vec<String> },

    #[error("rollback failed: {0}")]
    Rollback(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn display_tier(tier: &Option<Tier>) -> String {
    tier.map(|t| t.to_string())
        .unwrap_or_else(|| "none".to_string())
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// Coarse error category used by callers to pick an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Creation,
    Upgrade,
    Rollback,
    Configuration,
    Workspace,
}

impl WorkspaceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkspaceError::Validation(_)
            | WorkspaceError::UnsafePath { .. }
            | WorkspaceError::Downgrade { .. } => ErrorKind::Validation,
            WorkspaceError::Creation { .. } => ErrorKind::Creation,
            WorkspaceError::Upgrade { .. } => ErrorKind::Upgrade,
            WorkspaceError::SnapshotNotFound { .. } | WorkspaceError::Rollback(_) => {
                ErrorKind::Rollback
            }
            WorkspaceError::Configuration(_)
            | WorkspaceError::Yaml(_)
            | WorkspaceError::Json(_) => ErrorKind::Configuration,
            WorkspaceError::NotAWorkspace(_)
            | WorkspaceError::Io(_)
            | WorkspaceError::Walk(_) => ErrorKind::Workspace,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Validation => 1,
            ErrorKind::Creation => 2,
            ErrorKind::Upgrade => 3,
            ErrorKind::Rollback => 4,
            ErrorKind::Configuration => 5,
            ErrorKind::Workspace => 6,
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;
