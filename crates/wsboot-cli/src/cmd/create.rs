use crate::output::{print_entries, print_json};
use anyhow::Context;
use std::path::{Path, PathBuf};
use wsboot_core::config::BootstrapConfig;
use wsboot_core::workspace::{self, CreateOptions, CreateResult};
use wsboot_core::Tier;

pub struct CreateArgs {
    pub name: String,
    pub tier: Option<Tier>,
    pub parent: Option<PathBuf>,
    pub template: Option<String>,
    pub force: bool,
    pub dry_run: bool,
}

pub fn run(base: &Path, args: CreateArgs, config: &BootstrapConfig, json: bool) -> anyhow::Result<()> {
    let opts = CreateOptions {
        tier: args.tier.unwrap_or(config.default_tier),
        parent: args
            .parent
            .or_else(|| config.parent_workspace.as_ref().map(PathBuf::from)),
        template: args.template,
        templates_dir: config.templates_dir.clone(),
        force: args.force,
        dry_run: args.dry_run,
        name: args.name,
    };

    let result = workspace::create(base, &opts)
        .with_context(|| format!("failed to create workspace '{}'", opts.name))?;

    if json {
        return print_json(&result);
    }

    match result {
        CreateResult::Preview(p) => {
            println!(
                "Dry run: would create {} at tier {}",
                p.path.display(),
                p.tier
            );
            print_entries("create", &p.entries);
        }
        CreateResult::Created(s) => {
            println!(
                "Created workspace '{}' (tier {}) at {}",
                s.descriptor.name,
                s.descriptor.tier,
                s.path.display()
            );
            print_entries("created", &s.created);
            for path in &s.content {
                if let Ok(rel) = path.strip_prefix(&s.path) {
                    println!("  wrote   {}", rel.display());
                }
            }
            let warnings = s.report.warnings().count();
            if warnings > 0 {
                println!("{warnings} warning(s); run `wsboot validate` for details.");
            }
        }
    }
    Ok(())
}
