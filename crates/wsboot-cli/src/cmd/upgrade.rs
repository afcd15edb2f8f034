use crate::cmd::confirm;
use crate::output::{print_entries, print_json};
use anyhow::Context;
use std::path::Path;
use wsboot_core::config::BootstrapConfig;
use wsboot_core::upgrade::{UpgradePlan, UpgradeResult, UpgradeSummary};
use wsboot_core::workspace;
use wsboot_core::Tier;

pub fn run(
    root: &Path,
    tier: Option<Tier>,
    yes: bool,
    dry_run: bool,
    config: &BootstrapConfig,
    json: bool,
) -> anyhow::Result<()> {
    let templates_dir = config.templates_dir.clone();
    let result = workspace::upgrade(root, tier, yes, dry_run, templates_dir.clone())
        .context("upgrade failed")?;

    // In JSON mode a pending confirmation is reported, not prompted for.
    if json {
        return print_json(&result);
    }

    match result {
        UpgradeResult::Preview(plan) => {
            print_plan(&plan);
            println!("Dry run: nothing was written.");
        }
        UpgradeResult::ConfirmationRequired(plan) => {
            print_plan(&plan);
            if !confirm(&format!("Upgrade to tier {}?", plan.to))? {
                println!("Aborted.");
                return Ok(());
            }
            let result = workspace::upgrade(root, Some(plan.to), true, false, templates_dir)
                .context("upgrade failed")?;
            if let UpgradeResult::Upgraded(summary) = result {
                print_summary(&summary);
            }
        }
        UpgradeResult::Upgraded(summary) => print_summary(&summary),
    }
    Ok(())
}

fn print_plan(plan: &UpgradePlan) {
    println!("Upgrade plan: tier {} -> tier {}", plan.from, plan.to);
    for step in &plan.steps {
        println!("Step to tier {}:", step.tier);
        if step.creates.is_empty() {
            println!("  (nothing to create)");
        }
        print_entries("create", &step.creates);
    }
}

fn print_summary(summary: &UpgradeSummary) {
    println!(
        "Upgraded tier {} -> tier {} (backup: {})",
        summary.from, summary.to, summary.backup
    );
    for step in &summary.steps {
        print_entries("created", &step.created);
    }
    let warnings = summary.report.warnings().count();
    if warnings > 0 {
        println!("{warnings} warning(s); run `wsboot validate` for details.");
    }
}
