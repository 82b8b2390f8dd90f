mod cli;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use waypoint_core::kernel::constants::{APP_VERSION, DEFAULT_CHECKPOINT_FILE, DEFAULT_CONFIG_FILE};

use crate::cli::Session;

/// Waypoint: a resumable Arch Linux installer
#[derive(Parser, Debug)]
#[command(author, version = APP_VERSION, about, long_about = None)]
struct CliArgs {
    /// Log debug messages
    #[arg(long, global = true)]
    debug: bool,

    /// Installation configuration (YAML, TOML or JSON)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Where installation progress is recorded
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CHECKPOINT_FILE)]
    checkpoint_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the installation, resuming after the last successful step
    Run,
    /// Show installer state
    Info {
        #[command(subcommand)]
        topic: InfoTopic,
    },
}

#[derive(Subcommand, Debug)]
enum InfoTopic {
    /// Print the progress of every stage and step
    Checkpoints,
    /// Print the loaded configuration
    Config,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Err(e) = logging::init(args.debug) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let outcome = Session::open(&args.config, &args.checkpoint_file).and_then(|mut session| {
        match args.command {
            Commands::Run => session.run(),
            Commands::Info { topic: InfoTopic::Checkpoints } => {
                session.checkpoints_json().map(|json| println!("{}", json))
            }
            Commands::Info { topic: InfoTopic::Config } => {
                session.config_json().map(|json| println!("{}", json))
            }
        }
    });

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            cli::report_failure(&e);
            ExitCode::FAILURE
        }
    }
}
