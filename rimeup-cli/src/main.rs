//! rimeup CLI - keeps Rime scheme, dictionary and model data current.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use console::style;

use commands::config::ConfigCommands;
use commands::ArtifactArg;
use error::CliError;
use runner::CliRunner;

/// Exit status after Ctrl-C (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, Parser)]
#[command(name = "rimeup", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log debug detail to the log file
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compare installed versions against the latest releases
    Status,

    /// Download and apply available updates, then redeploy
    Update {
        /// Only update the given artifact (repeatable)
        #[arg(long, value_enum)]
        only: Vec<ArtifactArg>,

        /// Do not redeploy the input method afterwards
        #[arg(long)]
        no_deploy: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Redeploy the input method without updating anything
    Deploy,

    /// View or change configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Config { command } => commands::config::run(command, cli.config),
        Commands::Status => {
            let runner = start(cli.config, cli.verbose, "status")?;
            commands::status::run(&runner)
        }
        Commands::Update {
            only,
            no_deploy,
            yes,
        } => {
            let runner = start(cli.config, cli.verbose, "update")?;
            commands::update::run(
                &runner,
                commands::update::UpdateArgs {
                    only: only.into_iter().map(Into::into).collect(),
                    no_deploy,
                    yes,
                },
            )
        }
        Commands::Deploy => {
            let runner = start(cli.config, cli.verbose, "deploy")?;
            commands::deploy::run(&runner)
        }
    }
}

/// Load configuration, then install logging and the interrupt handler.
fn start(config: Option<PathBuf>, verbose: bool, command: &str) -> Result<CliRunner, CliError> {
    // Logging first: it reads the local UTC offset, which needs a single thread.
    let runner = CliRunner::new(config, verbose)?;
    install_interrupt_handler()?;
    runner.log_startup(command);
    Ok(runner)
}

/// Exit immediately on Ctrl-C. Partial downloads are kept and resumed later.
fn install_interrupt_handler() -> Result<(), CliError> {
    ctrlc::set_handler(|| {
        eprintln!();
        eprintln!(
            "{} Interrupted. Partial downloads are kept and will resume on the next run.",
            style("!").yellow().bold()
        );
        process::exit(INTERRUPTED_EXIT_CODE);
    })
    .map_err(|e| CliError::Interaction(format!("Failed to set signal handler: {}", e)))
}
