//! Upgrade Engine: forward-only tier transitions.
//!
//! Order of effects for a confirmed upgrade:
//! backup, materialize each intermediate tier, content provider,
//! post-validation, descriptor. The descriptor is the commit point; any
//! failure before it leaves the declared tier unchanged and re-running to
//! the same target resumes.

use crate::content::ContentProvider;
use crate::descriptor::{self, WorkspaceDescriptor};
use crate::error::{Result, WorkspaceError};
use crate::materialize::{materialize, preview_excluding, MaterializationResult};
use crate::snapshot;
use crate::structure::Entry;
use crate::tier::Tier;
use crate::validate::{validate, ValidationReport};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeStep {
    pub tier: Tier,
    pub creates: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradePlan {
    pub from: Tier,
    pub to: Tier,
    pub steps: Vec<UpgradeStep>,
}

impl UpgradePlan {
    /// Every entry the upgrade would create, in step order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.steps.iter().flat_map(|s| s.creates.iter())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpgradeSummary {
    pub from: Tier,
    pub to: Tier,
    pub backup: String,
    pub steps: Vec<MaterializationResult>,
    pub content: Vec<PathBuf>,
    pub report: ValidationReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpgradeResult {
    Preview(UpgradePlan),
    ConfirmationRequired(UpgradePlan),
    Upgraded(UpgradeSummary),
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Aggregate per-step preview for `current -> target`. Read-only.
pub fn plan(root: &Path, current: Tier, target: Tier) -> Result<UpgradePlan> {
    if target <= current {
        return Err(WorkspaceError::Downgrade {
            from: current,
            to: target,
        });
    }
    let mut planned: HashSet<String> = HashSet::new();
    let mut steps = Vec::new();
    for tier in current.steps_to(target) {
        let creates = preview_excluding(root, tier, &planned)?;
        planned.extend(creates.iter().map(|e| e.path.clone()));
        steps.push(UpgradeStep { tier, creates });
    }
    Ok(UpgradePlan {
        from: current,
        to: target,
        steps,
    })
}

// ---------------------------------------------------------------------------
// Upgrade
// ---------------------------------------------------------------------------

pub fn upgrade(
    root: &Path,
    target: Tier,
    yes: bool,
    dry_run: bool,
    provider: &dyn ContentProvider,
) -> Result<UpgradeResult> {
    let mut descriptor = WorkspaceDescriptor::load(root)?;
    let from = descriptor.tier;
    let plan = plan(root, from, target)?;

    if dry_run {
        return Ok(UpgradeResult::Preview(plan));
    }
    if !yes {
        return Ok(UpgradeResult::ConfirmationRequired(plan));
    }

    let started = descriptor::now();
    let backup = snapshot::pre_upgrade_backup(root, from, target)?.id;
    tracing::info!(from = from.as_str(), to = target.as_str(), backup = %backup, "upgrading workspace");

    let failed = |tier: Tier, last_applied: Option<Tier>, source: WorkspaceError| {
        WorkspaceError::Upgrade {
            failed: tier,
            last_applied,
            backup: backup.clone(),
            source: Box::new(source),
        }
    };

    let mut last_applied = None;
    let mut steps = Vec::new();
    for tier in from.steps_to(target) {
        let result = materialize(root, tier).map_err(|e| failed(tier, last_applied, e))?;
        steps.push(result);
        last_applied = Some(tier);
    }

    let content = provider
        .apply(target, root, None)
        .map_err(|e| failed(target, last_applied, e))?;

    let report = validate(root, target);
    if report.has_errors() {
        let detail: Vec<String> = report
            .errors()
            .map(|f| format!("{}: {}", f.path, f.message))
            .collect();
        return Err(failed(
            target,
            last_applied,
            WorkspaceError::Validation(format!(
                "post-upgrade validation failed: {}",
                detail.join("; ")
            )),
        ));
    }

    descriptor.record_upgrade(target, started);
    descriptor.save(root)?;
    tracing::info!(tier = target.as_str(), "upgrade complete");

    Ok(UpgradeResult::Upgraded(UpgradeSummary {
        from,
        to: target,
        backup,
        steps,
        content,
        report,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
