use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Structural complexity level of a workspace. Declaration order is the
/// upgrade order, so the derived `Ord` is the tier order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Tier {
    #[default]
    #[serde(rename = "1")]
    Lite,
    #[serde(rename = "2")]
    Standard,
    #[serde(rename = "3")]
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Dir,
    File,
}

/// One row of a tier's structure table. `stub` is the content written when a
/// required file is missing; it is ignored for directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryDef {
    pub path: &'static str,
    pub kind: EntryKind,
    pub stub: &'static str,
}

const fn dir(path: &'static str) -> EntryDef {
    EntryDef {
        path,
        kind: EntryKind::Dir,
        stub: "",
    }
}

const fn file(path: &'static str, stub: &'static str) -> EntryDef {
    EntryDef {
        path,
        kind: EntryKind::File,
        stub,
    }
}

// ---------------------------------------------------------------------------
// Tier tables (each tier lists only what it adds over the tier below)
// ---------------------------------------------------------------------------

const LITE_REQUIRED: &[EntryDef] = &[
    dir(".gemini"),
    dir(".agent"),
    dir(".agent/skills"),
    dir(".agent/workflows"),
    dir("src"),
    dir("tests"),
    dir("docs"),
    dir("scratchpad"),
    dir("logs"),
    dir("logs/sessions"),
    file(".gemini/settings.json", "{}\n"),
    file("docs/roadmap.md", "# Roadmap\n\n- [ ] Initial setup\n"),
    file("scratchpad/.gitkeep", ""),
    file("logs/sessions/.gitkeep", ""),
];

const STANDARD_REQUIRED: &[EntryDef] = &[
    dir("tests/unit"),
    dir("tests/integration"),
    dir(".snapshots"),
    dir("docs/architecture"),
    dir("docs/api"),
    file(".agent/skills/debug.md", "# Debug Skill\n\nDebug protocol skill.\n"),
    file(
        ".agent/workflows/feature.md",
        "# Feature Workflow\n\nFeature implementation workflow.\n",
    ),
    file(".snapshots/.gitkeep", ""),
];

const ENTERPRISE_REQUIRED: &[EntryDef] = &[
    dir("inputs"),
    dir("outputs"),
    dir("outputs/contracts"),
    dir("tests/evals"),
    dir("docs/decisions"),
    dir("docs/evaluations"),
    dir("benchmarks"),
    file("inputs/README.md", "# Inputs\n\nRead-only source data.\n"),
    file("outputs/contracts/.gitkeep", ""),
    file(
        "docs/decisions/0001-record-architecture-decisions.md",
        "# 1. Record architecture decisions\n\nStatus: accepted\n",
    ),
];

const LITE_RECOMMENDED: &[EntryDef] = &[
    dir(".git"),
    file("README.md", ""),
    file(".gitignore", ""),
    file("GEMINI.md", ""),
    file("Makefile", ""),
];

const STANDARD_RECOMMENDED: &[EntryDef] = &[file("CHANGELOG.md", "")];

const ENTERPRISE_RECOMMENDED: &[EntryDef] = &[file("SECURITY.md", "")];

const LITE_TARGETS: &[&str] = &[
    "run", "test", "install", "context", "clean", "audit", "status", "help", "lint", "format",
    "backup",
];

const STANDARD_TARGETS: &[&str] = &[
    "test-watch", "coverage", "typecheck", "snapshot", "restore", "docs",
];

const ENTERPRISE_TARGETS: &[&str] = &["scan", "eval", "shift-report", "lock"];

const LITE_SNAPSHOT_DIRS: &[&str] = &[".agent", "src", "docs"];
const STANDARD_SNAPSHOT_DIRS: &[&str] = &["tests"];
const ENTERPRISE_SNAPSHOT_DIRS: &[&str] = &["inputs", "outputs"];

// ---------------------------------------------------------------------------
// Tier API
// ---------------------------------------------------------------------------

impl Tier {
    pub fn all() -> &'static [Tier] {
        &[Tier::Lite, Tier::Standard, Tier::Enterprise]
    }

    /// 1-based position in the tier order.
    pub fn order(self) -> u8 {
        self as u8 + 1
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Lite => "1",
            Tier::Standard => "2",
            Tier::Enterprise => "3",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Lite => "Lite",
            Tier::Standard => "Standard",
            Tier::Enterprise => "Enterprise",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Tier::Lite => "Lightweight workspace with basic features",
            Tier::Standard => "Full-featured workspace with testing and quality gates",
            Tier::Enterprise => "Enterprise workspace with advanced features and evaluations",
        }
    }

    pub fn next(self) -> Option<Tier> {
        Tier::all().get(self as usize + 1).copied()
    }

    /// Tiers strictly above `self` up to and including `target`, in order.
    /// Empty when `target <= self`.
    pub fn steps_to(self, target: Tier) -> Vec<Tier> {
        Tier::all()
            .iter()
            .copied()
            .filter(|t| *t > self && *t <= target)
            .collect()
    }

    /// This tier and every tier below it, lowest first.
    fn cumulative(self) -> impl Iterator<Item = Tier> {
        Tier::all().iter().copied().filter(move |t| *t <= self)
    }

    fn own_required(self) -> &'static [EntryDef] {
        match self {
            Tier::Lite => LITE_REQUIRED,
            Tier::Standard => STANDARD_REQUIRED,
            Tier::Enterprise => ENTERPRISE_REQUIRED,
        }
    }

    fn own_recommended(self) -> &'static [EntryDef] {
        match self {
            Tier::Lite => LITE_RECOMMENDED,
            Tier::Standard => STANDARD_RECOMMENDED,
            Tier::Enterprise => ENTERPRISE_RECOMMENDED,
        }
    }

    fn own_targets(self) -> &'static [&'static str] {
        match self {
            Tier::Lite => LITE_TARGETS,
            Tier::Standard => STANDARD_TARGETS,
            Tier::Enterprise => ENTERPRISE_TARGETS,
        }
    }

    fn own_snapshot_dirs(self) -> &'static [&'static str] {
        match self {
            Tier::Lite => LITE_SNAPSHOT_DIRS,
            Tier::Standard => STANDARD_SNAPSHOT_DIRS,
            Tier::Enterprise => ENTERPRISE_SNAPSHOT_DIRS,
        }
    }

    /// Every required entry for this tier, in table order (lowest tier first).
    pub fn required_entries(self) -> Vec<&'static EntryDef> {
        self.cumulative()
            .flat_map(|t| t.own_required().iter())
            .collect()
    }

    /// Entries whose absence is reported as a warning rather than an error.
    pub fn recommended_entries(self) -> Vec<&'static EntryDef> {
        self.cumulative()
            .flat_map(|t| t.own_recommended().iter())
            .collect()
    }

    pub fn make_targets(self) -> Vec<&'static str> {
        self.cumulative()
            .flat_map(|t| t.own_targets().iter().copied())
            .collect()
    }

    /// Top-level directories captured by a snapshot taken at this tier.
    pub fn snapshot_dirs(self) -> Vec<&'static str> {
        self.cumulative()
            .flat_map(|t| t.own_snapshot_dirs().iter().copied())
            .collect()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.name())
    }
}

impl std::str::FromStr for Tier {
    type Err = crate::error::WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "lite" => Ok(Tier::Lite),
            "2" | "standard" => Ok(Tier::Standard),
            "3" | "enterprise" => Ok(Tier::Enterprise),
            _ => Err(crate::error::WorkspaceError::Validation(format!(
                "invalid tier '{s}': must be 1, 2, 3 or lite, standard, enterprise"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
