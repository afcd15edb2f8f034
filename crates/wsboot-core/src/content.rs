//! File content generation, run after structure materialization and before
//! the descriptor is written.
//!
//! Generated files carry a managed block between markers. Regeneration
//! replaces only that block, so anything a user writes outside it survives
//! upgrades.

use crate::error::{Result, WorkspaceError};
use crate::guard;
use crate::io::{ensure_gitignore_entry, replace_between_markers, write_if_missing};
use crate::paths;
use crate::tier::{EntryKind, Tier};
use crate::validate::GEMINI_TIER_MARKER;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const GEMINI_BEGIN: &str = "<!-- wsboot:begin -->";
const GEMINI_END: &str = "<!-- wsboot:end -->";
const MAKEFILE_BEGIN: &str = "# wsboot:begin";
const MAKEFILE_END: &str = "# wsboot:end";

const GITIGNORE_DEFAULT: &str = "\
# Workspace
.gemini/backups/
logs/sessions/*
!logs/sessions/.gitkeep
scratchpad/*
!scratchpad/.gitkeep

# Editors and OS
.DS_Store
.idea/
.vscode/
";

/// Writes tier-dependent files into a workspace.
pub trait ContentProvider {
    /// Returns every path written or rewritten.
    fn apply(&self, tier: Tier, root: &Path, template: Option<&str>) -> Result<Vec<PathBuf>>;
}

/// Default provider: README, .gitignore, GEMINI.md, Makefile and an optional
/// template overlay.
#[derive(Debug, Clone)]
pub struct ScaffoldContent {
    project: String,
    templates_dir: Option<PathBuf>,
}

impl ScaffoldContent {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            templates_dir: None,
        }
    }

    pub fn with_templates_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.templates_dir = dir;
        self
    }

    fn write_readme(&self, tier: Tier, root: &Path, written: &mut Vec<PathBuf>) -> Result<()> {
        let path = root.join(paths::README_MD);
        let body = format!(
            "# {}\n\n{}.\n\nRun `make help` for the available commands.\n",
            self.project,
            tier.description()
        );
        if write_if_missing(&path, body.as_bytes())? {
            written.push(path);
        }
        Ok(())
    }

    fn write_gitignore(&self, root: &Path, written: &mut Vec<PathBuf>) -> Result<()> {
        let path = root.join(".gitignore");
        if write_if_missing(&path, GITIGNORE_DEFAULT.as_bytes())? {
            written.push(path);
        } else {
            ensure_gitignore_entry(root, ".gemini/backups/")?;
        }
        Ok(())
    }

    fn write_gemini_md(&self, tier: Tier, root: &Path, written: &mut Vec<PathBuf>) -> Result<()> {
        let path = root.join(paths::GEMINI_MD);
        let block = gemini_block(tier);
        if write_if_missing(&path, format!("# {}\n\n{block}", self.project).as_bytes())?
            || replace_between_markers(&path, GEMINI_BEGIN, GEMINI_END, block.trim_end())?
        {
            written.push(path);
            return Ok(());
        }
        // A hand-written GEMINI.md without markers gets the block appended.
        let mut content = std::fs::read_to_string(&path)?;
        if !content.ends_with('\n') {
            content.push('\n');
        }
        content.push('\n');
        content.push_str(&block);
        crate::io::atomic_write(&path, content.as_bytes())?;
        written.push(path);
        Ok(())
    }

    fn write_makefile(&self, tier: Tier, root: &Path, written: &mut Vec<PathBuf>) -> Result<()> {
        let path = root.join(paths::MAKEFILE);
        let block = makefile_block(tier);
        if write_if_missing(&path, format!("SHELL := /bin/bash\n\n{block}").as_bytes())?
            || replace_between_markers(&path, MAKEFILE_BEGIN, MAKEFILE_END, block.trim_end())?
        {
            written.push(path);
        } else {
            tracing::debug!("Makefile has no managed block, leaving it untouched");
        }
        Ok(())
    }

    /// Resolve a template name to its directory under `templates_dir`.
    /// Touches nothing; callers use it to reject a bad template before any
    /// mutation.
    pub fn resolve_template(&self, name: &str) -> Result<PathBuf> {
        let Some(templates_dir) = &self.templates_dir else {
            return Err(WorkspaceError::Configuration(format!(
                "template '{name}' requested but no templates_dir is configured"
            )));
        };
        let source = guard::sanitize_identifier(name, templates_dir)?;
        if !source.is_dir() {
            return Err(WorkspaceError::Configuration(format!(
                "template not found: {}",
                source.display()
            )));
        }
        Ok(source)
    }

    fn overlay_template(&self, source: &Path, root: &Path, written: &mut Vec<PathBuf>) -> Result<()> {
        for entry in WalkDir::new(source)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_symlink() {
                tracing::warn!(path = %entry.path().display(), "skipping symlink in template");
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(rel) = paths::relative_key(source, entry.path()) else {
                continue;
            };
            let dest = guard::sanitize_relative(&rel, root)?;
            guard::ensure_no_symlinks(root, &dest)?;
            if dest.exists() {
                tracing::debug!(path = %rel, "template file already present, keeping it");
                continue;
            }
            crate::io::copy_file(entry.path(), &dest)?;
            written.push(dest);
        }
        Ok(())
    }
}

impl ContentProvider for ScaffoldContent {
    fn apply(&self, tier: Tier, root: &Path, template: Option<&str>) -> Result<Vec<PathBuf>> {
        let source = template.map(|name| self.resolve_template(name)).transpose()?;
        let mut written = Vec::new();
        self.write_readme(tier, root, &mut written)?;
        self.write_gitignore(root, &mut written)?;
        self.write_gemini_md(tier, root, &mut written)?;
        self.write_makefile(tier, root, &mut written)?;
        if let Some(source) = &source {
            self.overlay_template(source, root, &mut written)?;
        }
        tracing::debug!(files = written.len(), "content provider applied");
        Ok(written)
    }
}

fn gemini_block(tier: Tier) -> String {
    let mut out = format!("{GEMINI_BEGIN}\n{GEMINI_TIER_MARKER}{} -->\n", tier.as_str());
    out.push_str(&format!(
        "## Workspace\n\nTier {tier}: {}.\n\n### Layout\n\n",
        tier.description()
    ));
    for def in tier.required_entries() {
        if def.kind == EntryKind::Dir && !def.path.contains('/') {
            out.push_str(&format!("- `{}/`\n", def.path));
        }
    }
    out.push_str("\n### Commands\n\n");
    for target in tier.make_targets() {
        out.push_str(&format!("- `make {target}`\n"));
    }
    out.push_str(GEMINI_END);
    out.push('\n');
    out
}

fn makefile_block(tier: Tier) -> String {
    let targets = tier.make_targets();
    let mut out = format!("{MAKEFILE_BEGIN}\n.PHONY: {}\n", targets.join(" "));
    for target in &targets {
        out.push('\n');
        out.push_str(&format!("{target}:\n"));
        if *target == "help" {
            for t in &targets {
                out.push_str(&format!("\t@echo \"  {t}\"\n"));
            }
        } else {
            out.push_str(&format!("\t@echo \"{target}: not configured for this project\"\n"));
        }
    }
    out.push_str(MAKEFILE_END);
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::materialize;
    use crate::validate::validate;
    use tempfile::TempDir;

    #[test]
    fn scaffold_clears_advisory_warnings_except_git() {
        let dir = TempDir::new().unwrap();
        materialize(dir.path(), Tier::Lite).unwrap();
        ScaffoldContent::new("bot")
            .apply(Tier::Lite, dir.path(), None)
            .unwrap();
        let report = validate(dir.path(), Tier::Lite);
        let warned: Vec<&str> = report.warnings().map(|f| f.path.as_str()).collect();
        assert_eq!(warned, vec![".git"]);
    }

    #[test]
    fn regeneration_keeps_user_content() {
        let dir = TempDir::new().unwrap();
        let provider = ScaffoldContent::new("bot");
        provider.apply(Tier::Lite, dir.path(), None).unwrap();

        let gemini = dir.path().join("GEMINI.md");
        let mut content = std::fs::read_to_string(&gemini).unwrap();
        content.push_str("\n## My notes\n\nkeep this\n");
        std::fs::write(&gemini, &content).unwrap();
        std::fs::write(dir.path().join("README.md"), "custom readme").unwrap();

        provider.apply(Tier::Standard, dir.path(), None).unwrap();
        let content = std::fs::read_to_string(&gemini).unwrap();
        assert!(content.contains("keep this"));
        assert!(content.contains("<!-- wsboot:tier=2 -->"));
        assert!(!content.contains("<!-- wsboot:tier=1 -->"));
        assert_eq!(content.matches(GEMINI_BEGIN).count(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("README.md")).unwrap(),
            "custom readme"
        );
        let makefile = std::fs::read_to_string(dir.path().join("Makefile")).unwrap();
        assert!(makefile.contains("\ncoverage:\n"));
    }

    #[test]
    fn hand_written_makefile_is_left_alone() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Makefile"), "all:\n\ttrue\n").unwrap();
        let written = ScaffoldContent::new("bot")
            .apply(Tier::Lite, dir.path(), None)
            .unwrap();
        assert!(!written.contains(&dir.path().join("Makefile")));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Makefile")).unwrap(),
            "all:\n\ttrue\n"
        );
    }

    #[test]
    fn existing_gitignore_gains_backup_entry() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target/").unwrap();
        ScaffoldContent::new("bot")
            .apply(Tier::Lite, dir.path(), None)
            .unwrap();
        let content = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, "target/\n.gemini/backups/\n");
    }

    #[test]
    fn template_overlay_copies_without_overwriting() {
        let templates = TempDir::new().unwrap();
        let tpl = templates.path().join("python");
        std::fs::create_dir_all(tpl.join("src")).unwrap();
        std::fs::write(tpl.join("src/main.py"), "print('hi')\n").unwrap();
        std::fs::write(tpl.join("README.md"), "template readme").unwrap();

        let dir = TempDir::new().unwrap();
        let written = ScaffoldContent::new("bot")
            .with_templates_dir(Some(templates.path().to_path_buf()))
            .apply(Tier::Lite, dir.path(), Some("python"))
            .unwrap();
        assert!(written.contains(&dir.path().join("src/main.py")));
        // README.md is written by the provider first and kept
        assert!(std::fs::read_to_string(dir.path().join("README.md"))
            .unwrap()
            .starts_with("# bot"));
    }

    #[test]
    fn template_name_is_guarded() {
        let templates = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        let provider =
            ScaffoldContent::new("bot").with_templates_dir(Some(templates.path().to_path_buf()));
        let err = provider
            .apply(Tier::Lite, dir.path(), Some("../etc"))
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::UnsafePath { .. }));
        let err = provider
            .apply(Tier::Lite, dir.path(), Some("missing"))
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::Configuration(_)));
        assert!(!dir.path().join("README.md").exists());
    }
}
