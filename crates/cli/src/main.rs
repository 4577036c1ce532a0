//! Lockstep command-line tool.
//!
//! Merges a branch into the current branch of a Dolt row store and a Git
//! file tree as one operation, rolling the row store back when the tree
//! merge does not go through.

mod render;
mod style;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lockstep_core::errors::CoreError;
use lockstep_core::report::{AbortReport, DryRunReport, FailureReport, StatusReport, SuccessReport};
use lockstep_core::{
    DoltStore, GitStore, MergeCoordinator, MergeFailure, MergeOptions, ProjectConfig,
};

/// Exit code for setup errors and operation failures.
const EXIT_OPERATION_FAILED: u8 = 4;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Lockstep command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "lockstep",
    version,
    about = "Merge a Dolt row store and a Git file tree together"
)]
struct Cli {
    /// Project root containing the `.lockstep` directory.
    #[arg(short = 'C', long = "project", global = true, default_value = ".")]
    project: PathBuf,

    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge a branch into the current branch of both stores.
    Merge(MergeArgs),

    /// Show branch, HEAD and merge state of both stores.
    Status {
        /// Print a JSON envelope instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Branch to merge into the current branch.
    #[arg(required_unless_present = "abort")]
    branch: Option<String>,

    /// Abort an in-progress merge in both stores.
    #[arg(long, conflicts_with_all = ["branch", "no_commit", "squash", "message", "dry_run"])]
    abort: bool,

    /// Merge but leave the tree store commit pending.
    #[arg(long)]
    no_commit: bool,

    /// Squash the branch into a single commit.
    #[arg(long)]
    squash: bool,

    /// Tree store merge commit message.
    #[arg(short, long)]
    message: Option<String>,

    /// Only report the conflicts a merge would produce.
    #[arg(long, conflicts_with_all = ["no_commit", "squash", "message"])]
    dry_run: bool,

    /// Print a JSON envelope instead of text.
    #[arg(long)]
    json: bool,
}

impl Commands {
    fn json(&self) -> bool {
        match self {
            Commands::Merge(args) => args.json,
            Commands::Status { json } => *json,
        }
    }
}

impl MergeArgs {
    fn options(&self) -> MergeOptions {
        MergeOptions {
            no_commit: self.no_commit,
            squash: self.squash,
            message: self.message.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = ProjectConfig::load_for_project(&cli.project);
    init_logging(
        cli.verbose,
        config.as_ref().ok().map(|c| c.project.log_level.as_str()),
    );

    let code = match open_coordinator(config) {
        Ok(coordinator) => run(&cli.command, &coordinator).await.unwrap_or_else(|e| {
            eprintln!("{}", style::error(&format!("{e:#}")));
            EXIT_OPERATION_FAILED
        }),
        Err(err) => report_setup_failure(&cli, err),
    };
    ExitCode::from(code)
}

/// Log to stderr: `RUST_LOG` wins, then `-v`, then the configured level.
fn init_logging(verbose: bool, configured: Option<&str>) {
    let default = if verbose {
        "debug"
    } else {
        configured.unwrap_or("warn")
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

type Coordinator = MergeCoordinator<DoltStore, GitStore>;

fn open_coordinator(
    config: Result<ProjectConfig, lockstep_core::errors::ConfigError>,
) -> Result<Coordinator, CoreError> {
    MergeCoordinator::open(&config?)
}

/// A project that cannot be opened fails like any other operation, in the
/// output format the command asked for.
fn report_setup_failure(cli: &Cli, err: CoreError) -> u8 {
    let failure = MergeFailure::from(err);
    if cli.command.json() {
        if let Err(e) = render::print_json(&FailureReport::from(&failure)) {
            eprintln!("{}", style::error(&format!("{e:#}")));
        }
    } else {
        eprintln!(
            "{}",
            style::error(&format!(
                "failed to open project at {}: {failure}",
                cli.project.display()
            ))
        );
    }
    failure.exit_code()
}

async fn run(command: &Commands, coordinator: &Coordinator) -> Result<u8> {
    match command {
        Commands::Merge(args) if args.abort => cmd_abort(coordinator, args.json).await,
        Commands::Merge(args) => {
            let branch = args
                .branch
                .as_deref()
                .context("a branch to merge is required")?;
            if args.dry_run {
                cmd_dry_run(coordinator, branch, args.json).await
            } else {
                cmd_merge(coordinator, branch, &args.options(), args.json).await
            }
        }
        Commands::Status { json } => cmd_status(coordinator, *json).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_merge(
    coordinator: &Coordinator,
    branch: &str,
    options: &MergeOptions,
    json: bool,
) -> Result<u8> {
    let spinner = render::spinner(format!("Merging '{branch}'..."), !json);
    let result = coordinator.merge_branch(branch, options).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match result {
        Ok(outcome) => {
            if json {
                render::print_json(&SuccessReport::from(&outcome))?;
            } else {
                render::render_outcome(&outcome);
            }
            Ok(0)
        }
        Err(failure) => report_failure(&failure, json),
    }
}

async fn cmd_dry_run(coordinator: &Coordinator, branch: &str, json: bool) -> Result<u8> {
    let spinner = render::spinner(format!("Checking '{branch}' for conflicts..."), !json);
    let result = coordinator.check_conflicts_with_current(branch).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match result {
        Ok((target, conflicts)) => {
            let report = DryRunReport::new(branch, &target, conflicts);
            if json {
                render::print_json(&report)?;
            } else {
                render::render_dry_run(&report);
            }
            Ok(report.exit_code())
        }
        Err(failure) => report_failure(&failure, json),
    }
}

async fn cmd_abort(coordinator: &Coordinator, json: bool) -> Result<u8> {
    match coordinator.abort_merge().await {
        Ok(aborted) => {
            let report = AbortReport::new(aborted);
            if json {
                render::print_json(&report)?;
            } else {
                render::render_abort(&report);
            }
            Ok(0)
        }
        Err(failure) => report_failure(&failure, json),
    }
}

async fn cmd_status(coordinator: &Coordinator, json: bool) -> Result<u8> {
    match coordinator.status().await {
        Ok(statuses) => {
            let report = StatusReport::new(statuses);
            if json {
                render::print_json(&report)?;
            } else {
                render::render_status(&report);
            }
            Ok(0)
        }
        Err(failure) => report_failure(&failure, json),
    }
}

fn report_failure(failure: &MergeFailure, json: bool) -> Result<u8> {
    if json {
        render::print_json(&FailureReport::from(failure))?;
    } else {
        render::render_failure(failure);
    }
    Ok(failure.exit_code())
}
