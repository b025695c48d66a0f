//! cascade - multi-stage SVN merge pipeline

mod cli;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cli::context::CommandContext;
use cli::history::{HistoryOptions, run_history};
use cli::profile::{ProfileAction, run_profile};
use cli::run::{RunOptions, run_step};
use cli::steps::run_steps;
use std::path::PathBuf;
use svn_cascade::config::Settings;
use svn_cascade::types::Namespace;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cascade")]
#[command(about = "Merge revisions through a chain of SVN branches")]
#[command(version)]
struct Cli {
    /// Profile file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Profile to use instead of the active one
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a step and every auto step that follows it
    Run {
        /// Step id (defaults to the first active step)
        step: Option<String>,

        /// Revisions for a directory, e.g. `--rev 0=101-103,107`
        ///
        /// Also retries an auto step directly, e.g. `run b --rev 0=1420`.
        #[arg(long = "rev", value_name = "IDX=SPEC")]
        revisions: Vec<String>,

        /// Include hotfix steps
        #[arg(long)]
        hotfix: bool,
    },

    /// Browse source history for a directory
    History {
        /// Directory index
        #[arg(long = "dir")]
        directory: usize,

        /// Step whose source is browsed (defaults to the first step)
        #[arg(long)]
        step: Option<String>,

        /// Number of entries to fetch
        #[arg(long)]
        limit: Option<u32>,

        /// Pick entries and print the coalesced revision specifier
        #[arg(long)]
        pick: bool,
    },

    /// Show the active step sequence
    Steps {
        /// Include hotfix steps
        #[arg(long)]
        hotfix: bool,
    },

    /// Manage profiles
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// List profiles
    List,
    /// Show a profile (defaults to the active one)
    Show {
        /// Profile id
        id: Option<String>,
    },
    /// Make a profile active
    Use {
        /// Profile id
        id: String,
    },
    /// Copy a profile under a new name, with blank roots
    Create {
        /// New profile name
        name: String,
        /// Profile to copy
        #[arg(long, default_value = "default")]
        base: String,
    },
    /// Delete a profile
    Delete {
        /// Profile id
        id: String,
    },
    /// Restore a built-in profile
    Reset {
        /// Profile id
        id: String,
    },
    /// Set an environment root or display name
    SetEnv {
        /// `remote` or `local`
        namespace: Namespace,
        /// Environment key, e.g. `release`
        key: String,
        /// Root path or URL
        #[arg(long)]
        root: Option<String>,
        /// Display name used in commit messages
        #[arg(long)]
        name: Option<String>,
    },
}

impl From<ProfileCommand> for ProfileAction {
    fn from(command: ProfileCommand) -> Self {
        match command {
            ProfileCommand::List => Self::List,
            ProfileCommand::Show { id } => Self::Show(id),
            ProfileCommand::Use { id } => Self::Use(id),
            ProfileCommand::Create { name, base } => Self::Create { name, base },
            ProfileCommand::Delete { id } => Self::Delete(id),
            ProfileCommand::Reset { id } => Self::Reset(id),
            ProfileCommand::SetEnv {
                namespace,
                key,
                root,
                name,
            } => Self::SetEnv {
                namespace,
                key,
                root,
                name,
            },
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::from_env().context("invalid SVN_CASCADE_* settings")?;
    let mut ctx = CommandContext::new(settings, cli.config.as_deref(), cli.profile.as_deref())
        .context("failed to load profiles")?;

    match cli.command {
        Commands::Run {
            step,
            revisions,
            hotfix,
        } => {
            let completed = run_step(
                &ctx,
                RunOptions {
                    step,
                    revisions,
                    hotfix,
                },
            )
            .await?;
            if !completed {
                anyhow::bail!("run stopped before completing");
            }
        }
        Commands::History {
            directory,
            step,
            limit,
            pick,
        } => {
            run_history(
                &ctx,
                HistoryOptions {
                    directory,
                    step,
                    limit,
                    pick,
                },
            )
            .await?;
        }
        Commands::Steps { hotfix } => run_steps(&ctx, hotfix)?,
        Commands::Profile { action } => run_profile(&mut ctx, action.into())?,
    }

    Ok(())
}
