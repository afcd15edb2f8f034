//! Read-only compliance check of a workspace tree against a tier.
//!
//! Findings come out in a fixed order: the tier's structure table first,
//! then the advisory checks in [`advisory_findings`]. Filesystem
//! enumeration order never leaks into a report.

use crate::descriptor::WorkspaceDescriptor;
use crate::error::WorkspaceError;
use crate::paths;
use crate::structure::StructureSpec;
use crate::tier::{EntryKind, Tier};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Prefix of the marker line the content provider embeds in `GEMINI.md`.
pub const GEMINI_TIER_MARKER: &str = "<!-- wsboot:tier=";

/// Filesystems with coarse mtimes can stamp a file written during an upgrade
/// slightly before the recorded upgrade time.
const FRESHNESS_SLACK_SECS: i64 = 2;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub path: String,
    pub message: String,
}

impl Finding {
    fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            path: path.into(),
            message: message.into(),
        }
    }

    fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub tier: Tier,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(root: &Path, tier: Tier) -> ValidationReport {
    let mut findings = structural_findings(root, tier);
    findings.extend(advisory_findings(root, tier));
    ValidationReport { tier, findings }
}

/// Validate against the tier the descriptor declares. A missing or
/// unreadable descriptor is itself an ERROR; the tree is then checked
/// against the Lite baseline.
pub fn validate_workspace(root: &Path) -> ValidationReport {
    match WorkspaceDescriptor::load(root) {
        Ok(descriptor) => validate(root, descriptor.tier),
        Err(e) => {
            let message = match e {
                WorkspaceError::NotAWorkspace(_) => "workspace descriptor is missing".to_string(),
                other => other.to_string(),
            };
            let mut report = validate(root, Tier::Lite);
            report
                .findings
                .insert(0, Finding::error(paths::DESCRIPTOR_FILE, message));
            report
        }
    }
}

fn structural_findings(root: &Path, tier: Tier) -> Vec<Finding> {
    let layout = StructureSpec::for_tier(tier);
    let mut findings = Vec::new();
    for def in layout.entries() {
        let meta = std::fs::symlink_metadata(root.join(def.path));
        let finding = match (def.kind, meta) {
            (EntryKind::Dir, Err(_)) => Some(Finding::error(
                def.path,
                format!("missing required directory for tier {tier}"),
            )),
            (EntryKind::File, Err(_)) => Some(Finding::error(
                def.path,
                format!("missing required file for tier {tier}"),
            )),
            (EntryKind::Dir, Ok(m)) if !m.is_dir() => {
                Some(Finding::error(def.path, "expected a directory"))
            }
            (EntryKind::File, Ok(m)) if !m.is_file() => {
                Some(Finding::error(def.path, "expected a regular file"))
            }
            _ => None,
        };
        findings.extend(finding);
    }
    findings
}

fn advisory_findings(root: &Path, tier: Tier) -> Vec<Finding> {
    let mut findings = Vec::new();

    for def in tier.recommended_entries() {
        let present = match def.kind {
            EntryKind::Dir => root.join(def.path).is_dir(),
            EntryKind::File => root.join(def.path).is_file(),
        };
        if present {
            continue;
        }
        let message = if def.path == paths::GIT_DIR {
            "workspace is not under version control".to_string()
        } else {
            "recommended file is missing".to_string()
        };
        findings.push(Finding::warning(def.path, message));
    }

    let gemini = root.join(paths::GEMINI_MD);
    if let Some(upgraded) = WorkspaceDescriptor::load(root).ok().and_then(|d| d.upgraded) {
        if let Some(modified) = std::fs::metadata(&gemini).and_then(|m| m.modified()).ok() {
            let modified: DateTime<Utc> = modified.into();
            if modified + TimeDelta::seconds(FRESHNESS_SLACK_SECS) < upgraded.with_timezone(&Utc) {
                findings.push(Finding::warning(
                    paths::GEMINI_MD,
                    "older than the last upgrade; regenerate it",
                ));
            }
        }
    }

    if let Ok(content) = std::fs::read_to_string(&gemini) {
        if let Some(generated_for) = marker_tier(&content) {
            if generated_for != tier {
                findings.push(Finding::warning(
                    paths::GEMINI_MD,
                    format!("generated for tier {generated_for}, workspace is tier {tier}; regenerate it"),
                ));
            }
        }
    }

    if let Ok(content) = std::fs::read_to_string(root.join(paths::MAKEFILE)) {
        let missing: Vec<&str> = tier
            .make_targets()
            .into_iter()
            .filter(|t| !has_make_target(&content, t))
            .collect();
        if !missing.is_empty() {
            findings.push(Finding::warning(
                paths::MAKEFILE,
                format!("missing targets: {}", missing.join(", ")),
            ));
        }
    }

    findings
}

fn marker_tier(content: &str) -> Option<Tier> {
    let start = content.find(GEMINI_TIER_MARKER)? + GEMINI_TIER_MARKER.len();
    let rest = &content[start..];
    let end = rest.find("-->")?;
    rest[..end].trim().parse().ok()
}

fn has_make_target(makefile: &str, target: &str) -> bool {
    makefile.lines().any(|line| {
        line.strip_prefix(target)
            .is_some_and(|rest| rest.trim_start().starts_with(':'))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
