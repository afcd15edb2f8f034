mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wsboot_core::config::BootstrapConfig;
use wsboot_core::{Tier, WorkspaceError};

/// Exit code for errors that did not originate in the workspace core.
const EXIT_UNEXPECTED: i32 = 255;

#[derive(Parser)]
#[command(
    name = "wsboot",
    about = "Create, validate, upgrade and restore tiered agent workspaces",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: auto-detect from .gemini/workspace.json)
    #[arg(long, global = true, env = "WSBOOT_ROOT")]
    root: Option<PathBuf>,

    /// Config file (default: ./.wsboot.yaml if present)
    #[arg(long, global = true, env = "WSBOOT_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Verbose logging
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new workspace
    Create {
        /// Project name (letters, digits, '-' and '_'; starts with a letter)
        name: String,
        /// Tier: 1|2|3 or lite|standard|enterprise
        #[arg(long, short = 't')]
        tier: Option<Tier>,
        /// Parent workspace directory to create the project in
        #[arg(long)]
        parent: Option<PathBuf>,
        /// Template directory name under the configured templates_dir
        #[arg(long)]
        template: Option<String>,
        /// Replace an existing directory of the same name
        #[arg(long)]
        force: bool,
        /// Show what would be created without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Check the workspace against its declared tier
    Validate,

    /// Upgrade the workspace to a higher tier
    Upgrade {
        /// Target tier (default: next tier)
        #[arg(long, short = 't')]
        tier: Option<Tier>,
        /// Apply without asking for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
        /// Show the planned changes without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Take a named snapshot of the workspace
    Snapshot { name: String },

    /// List snapshots, newest first
    Snapshots,

    /// Restore a snapshot (default: the most recent one)
    Rollback {
        /// Snapshot directory or short name
        #[arg(long)]
        backup: Option<String>,
        /// Restore without asking for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Describe the available tiers
    Tiers,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli);

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(exit_code(&e));
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = BootstrapConfig::load(cli.config.as_deref(), &cwd)?;
    for w in config.validate() {
        tracing::warn!("config: {}", w.message);
    }

    match cli.command {
        Commands::Create {
            name,
            tier,
            parent,
            template,
            force,
            dry_run,
        } => {
            let base = cli.root.unwrap_or(cwd);
            let args = cmd::create::CreateArgs {
                name,
                tier,
                parent,
                template,
                force,
                dry_run,
            };
            cmd::create::run(&base, args, &config, cli.json)
        }
        Commands::Validate => {
            let root = root::resolve_root(cli.root.as_deref());
            cmd::validate::run(&root, cli.json)
        }
        Commands::Upgrade { tier, yes, dry_run } => {
            let root = root::resolve_root(cli.root.as_deref());
            cmd::upgrade::run(&root, tier, yes, dry_run, &config, cli.json)
        }
        Commands::Snapshot { name } => {
            let root = root::resolve_root(cli.root.as_deref());
            cmd::snapshot::create(&root, &name, cli.json)
        }
        Commands::Snapshots => {
            let root = root::resolve_root(cli.root.as_deref());
            cmd::snapshot::list(&root, cli.json)
        }
        Commands::Rollback { backup, yes } => {
            let root = root::resolve_root(cli.root.as_deref());
            cmd::rollback::run(&root, backup.as_deref(), yes, cli.json)
        }
        Commands::Tiers => cmd::tiers::run(cli.json),
    }
}

/// Map an error to the process exit code: the core's category code when the
/// chain carries a [`WorkspaceError`], 255 otherwise.
fn exit_code(e: &anyhow::Error) -> i32 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<WorkspaceError>())
        .map(WorkspaceError::exit_code)
        .unwrap_or(EXIT_UNEXPECTED)
}
