use std::path::{Path, PathBuf};
use wsboot_core::paths;

/// Resolve the workspace root.
///
/// Priority:
/// 1. `--root` flag / `WSBOOT_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.gemini/workspace.json`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_from(&cwd)
}

fn resolve_from(cwd: &Path) -> PathBuf {
    paths::find_workspace_root(cwd).unwrap_or_else(|| cwd.to_path_buf())
}
