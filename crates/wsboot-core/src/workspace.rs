//! Operations surface: the five lifecycle operations a front end calls.
//!
//! Each takes a root (or the directory a new workspace goes into) and
//! returns a typed result. Confirmation is a value, not a prompt; callers
//! re-invoke with `yes`/`confirmed` set.

use crate::content::{ContentProvider, ScaffoldContent};
use crate::descriptor::WorkspaceDescriptor;
use crate::error::{Result, WorkspaceError};
use crate::guard;
use crate::materialize::materialize;
use crate::paths;
use crate::snapshot::{self, RestoreResult, SnapshotHandle};
use crate::structure::{Entry, StructureSpec};
use crate::tier::Tier;
use crate::upgrade::{self, UpgradeResult};
use crate::validate::{validate_workspace, ValidationReport};
use serde::Serialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub name: String,
    pub tier: Tier,
    /// Parent workspace directory; the new workspace is created inside it
    /// and the path is recorded in the descriptor.
    pub parent: Option<PathBuf>,
    pub template: Option<String>,
    pub templates_dir: Option<PathBuf>,
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePreview {
    pub path: PathBuf,
    pub tier: Tier,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSummary {
    pub path: PathBuf,
    pub descriptor: WorkspaceDescriptor,
    pub created: Vec<Entry>,
    pub content: Vec<PathBuf>,
    pub report: ValidationReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreateResult {
    Preview(CreatePreview),
    Created(CreateSummary),
}

/// Create workspace `opts.name` under `opts.parent`, or under `base` when no
/// parent is given. Every input check, template lookup included, runs before
/// `force` removes anything. A directory this call created is removed again
/// if any later step fails.
pub fn create(base: &Path, opts: &CreateOptions) -> Result<CreateResult> {
    guard::validate_project_name(&opts.name)?;
    let container = opts.parent.as_deref().unwrap_or(base);
    let dest = guard::sanitize_identifier(&opts.name, container)?;

    let provider = ScaffoldContent::new(&opts.name).with_templates_dir(opts.templates_dir.clone());
    if let Some(template) = &opts.template {
        provider.resolve_template(template)?;
    }

    if let Ok(meta) = std::fs::symlink_metadata(&dest) {
        if meta.file_type().is_symlink() {
            return Err(WorkspaceError::UnsafePath {
                raw: opts.name.clone(),
                reason: "target is a symbolic link",
            });
        }
        if !opts.force {
            return Err(WorkspaceError::Validation(format!(
                "directory '{}' already exists, use --force to overwrite",
                dest.display()
            )));
        }
        if !opts.dry_run {
            tracing::info!(path = %dest.display(), "removing existing directory (--force)");
            let removed = if meta.is_dir() {
                std::fs::remove_dir_all(&dest)
            } else {
                std::fs::remove_file(&dest)
            };
            removed.map_err(|e| creation_failure(&dest, &[], e.into()))?;
        }
    }

    if opts.dry_run {
        let entries = StructureSpec::for_tier(opts.tier)
            .entries()
            .iter()
            .map(|def| Entry::from(*def))
            .collect();
        return Ok(CreateResult::Preview(CreatePreview {
            path: dest,
            tier: opts.tier,
            entries,
        }));
    }

    std::fs::create_dir_all(container).map_err(|e| creation_failure(container, &[], e.into()))?;
    std::fs::create_dir(&dest).map_err(|e| creation_failure(&dest, &[], e.into()))?;

    match populate(&dest, opts, &provider) {
        Ok(summary) => {
            tracing::info!(
                name = %opts.name,
                tier = opts.tier.as_str(),
                path = %dest.display(),
                "workspace created"
            );
            Ok(CreateResult::Created(summary))
        }
        Err(e) => {
            tracing::warn!(path = %dest.display(), error = %e, "creation failed, cleaning up");
            if let Err(cleanup) = std::fs::remove_dir_all(&dest) {
                tracing::warn!(
                    path = %dest.display(),
                    error = %cleanup,
                    "could not remove partially created workspace"
                );
            }
            Err(e)
        }
    }
}

fn populate(dest: &Path, opts: &CreateOptions, provider: &dyn ContentProvider) -> Result<CreateSummary> {
    let created = materialize(dest, opts.tier)?.created;
    let content = provider
        .apply(opts.tier, dest, opts.template.as_deref())
        .map_err(|e| creation_failure(dest, &created, e))?;

    let parent = opts
        .parent
        .as_ref()
        .map(|p| p.display().to_string());
    let descriptor = WorkspaceDescriptor::new(&opts.name, opts.tier, parent);
    descriptor
        .save(dest)
        .map_err(|e| creation_failure(&paths::descriptor_path(dest), &created, e))?;

    Ok(CreateSummary {
        path: dest.to_path_buf(),
        descriptor,
        created,
        content,
        report: validate_workspace(dest),
    })
}

/// Tags an I/O failure during creation with the entries written so far.
/// Other errors pass through unchanged.
fn creation_failure(path: &Path, created: &[Entry], err: WorkspaceError) -> WorkspaceError {
    match err {
        WorkspaceError::Io(source) => WorkspaceError::Creation {
            path: path.display().to_string(),
            created: created.iter().map(|e| e.to_string()).collect(),
            source,
        },
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Validate / upgrade / snapshot / rollback
// ---------------------------------------------------------------------------

pub fn validate(root: &Path) -> ValidationReport {
    validate_workspace(root)
}

/// Upgrade to `target`, or to the next tier when `target` is `None`.
pub fn upgrade(
    root: &Path,
    target: Option<Tier>,
    yes: bool,
    dry_run: bool,
    templates_dir: Option<PathBuf>,
) -> Result<UpgradeResult> {
    let descriptor = WorkspaceDescriptor::load(root)?;
    let target = match target {
        Some(t) => t,
        None => descriptor.tier.next().ok_or_else(|| {
            WorkspaceError::Validation(format!(
                "workspace is already at the highest tier ({})",
                descriptor.tier
            ))
        })?,
    };
    let provider = ScaffoldContent::new(&descriptor.name).with_templates_dir(templates_dir);
    upgrade::upgrade(root, target, yes, dry_run, &provider)
}

/// Manual snapshot of the workspace at its declared tier.
pub fn snapshot(root: &Path, name: &str) -> Result<SnapshotHandle> {
    let descriptor = WorkspaceDescriptor::load(root)?;
    snapshot::snapshot(root, descriptor.tier, name)
}

pub fn snapshots(root: &Path) -> Result<Vec<SnapshotHandle>> {
    WorkspaceDescriptor::load(root)?;
    snapshot::list_snapshots(root)
}

/// Restore `backup` (or the most recent snapshot). Without `confirmed`
/// only the plan is returned.
pub fn rollback(root: &Path, backup: Option<&str>, confirmed: bool) -> Result<RestoreResult> {
    WorkspaceDescriptor::load(root)?;
    snapshot::restore(root, backup, confirmed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn opts(name: &str, tier: Tier) -> CreateOptions {
        CreateOptions {
            name: name.to_string(),
            tier,
            ..Default::default()
        }
    }

    fn created(result: CreateResult) -> CreateSummary {
        match result {
            CreateResult::Created(s) => s,
            other => panic!("expected created, got {other:?}"),
        }
    }

    #[test]
    fn lite_to_standard_lifecycle() {
        let base = TempDir::new().unwrap();
        let summary = created(create(base.path(), &opts("bot", Tier::Lite)).unwrap());
        let root = summary.path.clone();
        assert_eq!(root, base.path().join("bot"));
        assert!(!summary.report.has_errors(), "{:?}", summary.report.findings);
        assert_eq!(validate(&root).error_count(), 0);

        let preview = upgrade(&root, Some(Tier::Standard), false, true, None).unwrap();
        let UpgradeResult::Preview(plan) = preview else {
            panic!("expected preview");
        };
        let listed: Vec<String> = plan.entries().map(|e| e.to_string()).collect();
        for expected in ["tests/unit/", "tests/integration/", ".snapshots/"] {
            assert!(listed.contains(&expected.to_string()));
        }
        assert!(!root.join("tests/unit").exists());

        let done = upgrade(&root, Some(Tier::Standard), true, false, None).unwrap();
        assert!(matches!(done, UpgradeResult::Upgraded(_)));
        let raw = std::fs::read_to_string(root.join(".gemini/workspace.json")).unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["tier"], "2");
        assert_eq!(validate(&root).error_count(), 0);

        let err = upgrade(&root, Some(Tier::Lite), true, false, None).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert_eq!(WorkspaceDescriptor::load(&root).unwrap().tier, Tier::Standard);
    }

    #[test]
    fn upgrade_defaults_to_next_tier() {
        let base = TempDir::new().unwrap();
        let root = created(create(base.path(), &opts("bot", Tier::Standard)).unwrap()).path;
        let UpgradeResult::Preview(plan) = upgrade(&root, None, false, true, None).unwrap() else {
            panic!("expected preview");
        };
        assert_eq!(plan.to, Tier::Enterprise);

        upgrade(&root, None, true, false, None).unwrap();
        let err = upgrade(&root, None, true, false, None).unwrap_err();
        assert!(matches!(err, WorkspaceError::Validation(_)));
    }

    #[test]
    fn rollback_after_upgrade_restores_declared_tier() {
        let base = TempDir::new().unwrap();
        let root = created(create(base.path(), &opts("bot", Tier::Lite)).unwrap()).path;
        upgrade(&root, Some(Tier::Standard), true, false, None).unwrap();

        let plan = rollback(&root, None, false).unwrap();
        assert!(matches!(plan, RestoreResult::ConfirmationRequired(_)));
        assert_eq!(WorkspaceDescriptor::load(&root).unwrap().tier, Tier::Standard);

        rollback(&root, None, true).unwrap();
        assert_eq!(WorkspaceDescriptor::load(&root).unwrap().tier, Tier::Lite);
    }

    #[test]
    fn create_refuses_existing_directory_without_force() {
        let base = TempDir::new().unwrap();
        std::fs::create_dir(base.path().join("bot")).unwrap();
        std::fs::write(base.path().join("bot/old.txt"), "old").unwrap();

        let err = create(base.path(), &opts("bot", Tier::Lite)).unwrap_err();
        assert!(matches!(err, WorkspaceError::Validation(_)));

        let mut forced = opts("bot", Tier::Lite);
        forced.force = true;
        created(create(base.path(), &forced).unwrap());
        assert!(!base.path().join("bot/old.txt").exists());
    }

    #[test]
    fn create_rejects_bad_names_without_writing() {
        let base = TempDir::new().unwrap();
        for name in ["../escape", "/abs", "src", "9lives"] {
            assert!(create(base.path(), &opts(name, Tier::Lite)).is_err(), "{name}");
        }
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
    }

    #[test]
    fn create_dry_run_writes_nothing() {
        let base = TempDir::new().unwrap();
        let mut o = opts("bot", Tier::Enterprise);
        o.dry_run = true;
        let CreateResult::Preview(p) = create(base.path(), &o).unwrap() else {
            panic!("expected preview");
        };
        assert_eq!(p.entries.len(), Tier::Enterprise.required_entries().len());
        assert!(!base.path().join("bot").exists());
    }

    #[test]
    fn create_under_parent_records_it() {
        let base = TempDir::new().unwrap();
        let mono = base.path().join("mono");
        let mut o = opts("child", Tier::Lite);
        o.parent = Some(mono.clone());
        let summary = created(create(base.path(), &o).unwrap());
        assert_eq!(summary.path, mono.join("child"));
        assert_eq!(
            summary.descriptor.parent_workspace,
            Some(mono.display().to_string())
        );
    }

    #[test]
    fn unknown_template_is_rejected_before_writing() {
        let base = TempDir::new().unwrap();
        let mut o = opts("bot", Tier::Lite);
        o.template = Some("python".into());
        let err = create(base.path(), &o).unwrap_err();
        assert!(matches!(err, WorkspaceError::Configuration(_)));
        assert!(!base.path().join("bot").exists());
    }

    #[test]
    fn force_with_rejected_template_keeps_existing_directory() {
        let base = TempDir::new().unwrap();
        let templates = TempDir::new().unwrap();
        std::fs::create_dir(base.path().join("bot")).unwrap();
        std::fs::write(base.path().join("bot/precious.txt"), "keep me").unwrap();

        for template in ["../etc", "missing"] {
            let mut o = opts("bot", Tier::Lite);
            o.force = true;
            o.template = Some(template.into());
            o.templates_dir = Some(templates.path().to_path_buf());
            let err = create(base.path(), &o).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::Validation | ErrorKind::Configuration),
                "{template}: {err}"
            );
            assert_eq!(
                std::fs::read_to_string(base.path().join("bot/precious.txt")).unwrap(),
                "keep me",
                "{template}"
            );
        }
    }

    #[test]
    fn content_failure_is_a_creation_error_and_cleans_up() {
        let base = TempDir::new().unwrap();
        let templates = TempDir::new().unwrap();
        // README.md is written as a file first, so this overlay cannot land.
        std::fs::create_dir_all(templates.path().join("clash/README.md")).unwrap();
        std::fs::write(templates.path().join("clash/README.md/inner"), "x").unwrap();

        let mut o = opts("bot", Tier::Lite);
        o.template = Some("clash".into());
        o.templates_dir = Some(templates.path().to_path_buf());
        let err = create(base.path(), &o).unwrap_err();
        match &err {
            WorkspaceError::Creation { created, .. } => {
                assert!(created.contains(&"src/".to_string()), "{created:?}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.exit_code(), 2);
        assert!(!base.path().join("bot").exists());
    }

    #[test]
    fn force_then_failing_content_leaves_no_half_built_workspace() {
        let base = TempDir::new().unwrap();
        let templates = TempDir::new().unwrap();
        std::fs::create_dir_all(templates.path().join("clash/README.md")).unwrap();
        std::fs::write(templates.path().join("clash/README.md/inner"), "x").unwrap();
        created(create(base.path(), &opts("bot", Tier::Lite)).unwrap());

        let mut o = opts("bot", Tier::Standard);
        o.force = true;
        o.template = Some("clash".into());
        o.templates_dir = Some(templates.path().to_path_buf());
        let err = create(base.path(), &o).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Creation, "{err}");
        assert!(!base.path().join("bot").exists());
    }

    #[test]
    fn parent_that_is_a_file_is_a_creation_error() {
        let base = TempDir::new().unwrap();
        let not_a_dir = base.path().join("mono");
        std::fs::write(&not_a_dir, "file").unwrap();

        let mut o = opts("child", Tier::Lite);
        o.parent = Some(not_a_dir.clone());
        let err = create(base.path(), &o).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Creation, "{err}");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(std::fs::read_to_string(&not_a_dir).unwrap(), "file");
    }

    #[test]
    fn operations_require_a_workspace() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            snapshot(dir.path(), "x"),
            Err(WorkspaceError::NotAWorkspace(_))
        ));
        assert!(matches!(
            rollback(dir.path(), None, true),
            Err(WorkspaceError::NotAWorkspace(_))
        ));
        assert!(validate(dir.path()).has_errors());
    }
}
