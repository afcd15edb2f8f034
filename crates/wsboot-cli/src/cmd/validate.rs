use crate::output::{print_json, print_report};
use std::path::Path;
use wsboot_core::workspace;
use wsboot_core::WorkspaceError;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let report = workspace::validate(root);

    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    if report.has_errors() {
        return Err(WorkspaceError::Validation(format!(
            "{} structural error(s) in {}",
            report.error_count(),
            root.display()
        ))
        .into());
    }
    Ok(())
}
