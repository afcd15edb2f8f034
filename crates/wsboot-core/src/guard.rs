//! Path Guard: every externally supplied name or relative path is checked
//! here before it is joined to a filesystem root.

use crate::error::{Result, WorkspaceError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const RESERVED_NAMES: &[&str] = &["test", "tests", "src", "lib", "bin", "build", "dist"];

const MAX_PROJECT_NAME_LEN: usize = 50;

static PROJECT_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn project_name_re() -> &'static Regex {
    PROJECT_NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").unwrap())
}

fn unsafe_path(raw: &str, reason: &'static str) -> WorkspaceError {
    WorkspaceError::UnsafePath {
        raw: raw.to_string(),
        reason,
    }
}

fn has_drive_prefix(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Split `raw` into normal segments, rejecting anything that could escape a
/// root: absolute forms, `..`, NUL bytes. `.` and empty segments are dropped.
fn segments(raw: &str) -> Result<Vec<&str>> {
    if raw.is_empty() {
        return Err(unsafe_path(raw, "empty path"));
    }
    if raw.contains('\0') {
        return Err(unsafe_path(raw, "contains a NUL byte"));
    }
    if raw.starts_with("\\\\") {
        return Err(unsafe_path(raw, "UNC paths are not allowed"));
    }
    if raw.starts_with('/') || raw.starts_with('\\') || has_drive_prefix(raw) {
        return Err(unsafe_path(raw, "absolute paths are not allowed"));
    }
    let parts: Vec<&str> = raw
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if parts.iter().any(|s| *s == "..") {
        return Err(unsafe_path(raw, "parent directory references are not allowed"));
    }
    if parts.is_empty() {
        return Err(unsafe_path(raw, "path has no components"));
    }
    Ok(parts)
}

/// Validate a relative path (manifest entry, template file) and join it to
/// `root`. The result is always a descendant of `root`.
pub fn sanitize_relative(raw: &str, root: &Path) -> Result<PathBuf> {
    let mut out = root.to_path_buf();
    for part in segments(raw)? {
        out.push(part);
    }
    Ok(out)
}

/// Validate a bare identifier (project, backup or template name) and join it
/// to `root`. Separators are rejected outright.
pub fn sanitize_identifier(raw: &str, root: &Path) -> Result<PathBuf> {
    if raw.contains('/') || raw.contains('\\') {
        return Err(unsafe_path(raw, "separators are not allowed in a name"));
    }
    let parts = segments(raw)?;
    Ok(root.join(parts[0]))
}

/// Refuse to write through a symlink that already sits between `root` and
/// `path`; a link could redirect the write outside the workspace.
pub fn ensure_no_symlinks(root: &Path, path: &Path) -> Result<()> {
    let Ok(rel) = path.strip_prefix(root) else {
        return Err(unsafe_path(
            &path.to_string_lossy(),
            "path is outside the workspace root",
        ));
    };
    let mut current = root.to_path_buf();
    for component in rel.components() {
        current.push(component);
        match std::fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(unsafe_path(
                    &path.to_string_lossy(),
                    "path crosses a symbolic link",
                ));
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    Ok(())
}

/// Project naming rules on top of [`sanitize_identifier`].
pub fn validate_project_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(WorkspaceError::Validation(
            "project name cannot be empty".to_string(),
        ));
    }
    if name.len() > MAX_PROJECT_NAME_LEN {
        return Err(WorkspaceError::Validation(format!(
            "project name must be {MAX_PROJECT_NAME_LEN} characters or less"
        )));
    }
    sanitize_identifier(name, Path::new(""))?;
    if !project_name_re().is_match(name) {
        return Err(WorkspaceError::Validation(format!(
            "invalid project name '{name}': must start with a letter and contain only letters, numbers, underscores and hyphens"
        )));
    }
    if RESERVED_NAMES.contains(&name.to_ascii_lowercase().as_str()) {
        return Err(WorkspaceError::Validation(format!(
            "'{name}' is a reserved name, choose another"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_and_absolute() {
        let root = Path::new("/tmp/ws");
        for raw in [
            "../etc/passwd",
            "a/../../b",
            "a\\..\\b",
            "/etc/passwd",
            "\\windows",
            "C:\\Windows",
            "c:relative",
            "\\\\server\\share",
            "",
            "nul\0byte",
            ".",
            "./",
        ] {
            assert!(
                sanitize_relative(raw, root).is_err(),
                "expected rejection: {raw:?}"
            );
        }
    }

    #[test]
    fn accepts_plain_relative_paths() {
        let root = Path::new("/tmp/ws");
        let p = sanitize_relative("src/app/main.rs", root).unwrap();
        assert_eq!(p, PathBuf::from("/tmp/ws/src/app/main.rs"));
        let p = sanitize_relative("./docs//roadmap.md", root).unwrap();
        assert_eq!(p, PathBuf::from("/tmp/ws/docs/roadmap.md"));
        assert!(p.starts_with(root));
    }

    #[test]
    fn identifier_rejects_separators() {
        let root = Path::new("/tmp/ws");
        assert!(sanitize_identifier("a/b", root).is_err());
        assert!(sanitize_identifier("a\\b", root).is_err());
        assert!(sanitize_identifier("..", root).is_err());
        let p = sanitize_identifier("valid-name", root).unwrap();
        assert_eq!(p, PathBuf::from("/tmp/ws/valid-name"));
        assert!(p.starts_with(root));
    }

    #[test]
    fn project_names() {
        for ok in ["bot", "my-project", "My_App2"] {
            validate_project_name(ok).unwrap_or_else(|e| panic!("expected valid {ok}: {e}"));
        }
        for bad in ["", "123-invalid", "-dash", "has space", "src", "Tests", "a/b", ".."] {
            assert!(validate_project_name(bad).is_err(), "expected invalid: {bad}");
        }
        assert!(validate_project_name(&"a".repeat(51)).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_component_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let outside = tempfile::TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("src")).unwrap();
        let target = dir.path().join("src/evil.txt");
        assert!(ensure_no_symlinks(dir.path(), &target).is_err());
        assert!(ensure_no_symlinks(dir.path(), &dir.path().join("docs/ok.md")).is_ok());
    }
}
