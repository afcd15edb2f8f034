use crate::tier::{EntryDef, EntryKind, Tier};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A filesystem entry relative to the workspace root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    pub path: String,
    pub kind: EntryKind,
}

impl Entry {
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Dir,
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
        }
    }
}

impl From<&EntryDef> for Entry {
    fn from(def: &EntryDef) -> Self {
        Self {
            path: def.path.to_string(),
            kind: def.kind,
        }
    }
}

/// Directories render with a trailing `/`.
impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EntryKind::Dir => write!(f, "{}/", self.path),
            EntryKind::File => f.write_str(&self.path),
        }
    }
}

/// The entries a tier requires: the union of its own table and every lower
/// tier's, in table order.
#[derive(Debug, Clone)]
pub struct StructureSpec {
    tier: Tier,
    entries: Vec<&'static EntryDef>,
}

impl StructureSpec {
    pub fn for_tier(tier: Tier) -> Self {
        Self {
            tier,
            entries: tier.required_entries(),
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn entries(&self) -> &[&'static EntryDef] {
        &self.entries
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    pub fn is_superset_of(&self, other: &StructureSpec) -> bool {
        other.entries.iter().all(|e| self.contains(e.path))
    }
}
