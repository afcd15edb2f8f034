use crate::cmd::confirm;
use crate::output::print_json;
use anyhow::Context;
use std::path::Path;
use wsboot_core::snapshot::{RestorePlan, RestoreResult};
use wsboot_core::workspace;

/// Plans longer than this are summarised.
const PLAN_PREVIEW_LINES: usize = 10;

pub fn run(root: &Path, backup: Option<&str>, yes: bool, json: bool) -> anyhow::Result<()> {
    let result = workspace::rollback(root, backup, yes).context("rollback failed")?;

    if json {
        return print_json(&result);
    }

    let summary = match result {
        RestoreResult::Restored(summary) => summary,
        RestoreResult::ConfirmationRequired(plan) => {
            print_plan(&plan);
            if !confirm("Restore this snapshot? Files listed for removal will be deleted.")? {
                println!("Aborted.");
                return Ok(());
            }
            match workspace::rollback(root, Some(&plan.snapshot), true)
                .context("rollback failed")?
            {
                RestoreResult::Restored(summary) => summary,
                RestoreResult::ConfirmationRequired(_) => {
                    anyhow::bail!("restore was not applied")
                }
            }
        }
    };

    println!(
        "Restored {} file(s), removed {} stale path(s) from {} (tier {})",
        summary.restored, summary.removed, summary.snapshot, summary.tier
    );
    Ok(())
}

fn print_plan(plan: &RestorePlan) {
    println!("Rolling back from: {}", plan.snapshot);
    println!("Will restore {} path(s):", plan.restore.len());
    for e in plan.restore.iter().take(PLAN_PREVIEW_LINES) {
        println!("  restore {e}");
    }
    if plan.restore.len() > PLAN_PREVIEW_LINES {
        println!("  ... and {} more", plan.restore.len() - PLAN_PREVIEW_LINES);
    }
    if !plan.remove.is_empty() {
        println!("Will remove {} stale path(s):", plan.remove.len());
        for p in &plan.remove {
            println!("  remove  {p}");
        }
    }
}
