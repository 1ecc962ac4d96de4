//! # meshbed
//!
//! Runs multi-device Thread/Matter integration-test scenarios on a Cirque virtual-home
//! service.
//!
//! ## Commands
//!
//! - `list`: List built-in scenarios
//! - `topology`: Show a scenario's devices and steps
//! - `run`: Run a scenario; the exit code is 0 (ok), 1 (test failure) or 2 (system failure)
//!
//! ## Example
//!
//! ```bash
//! # See what is available
//! meshbed list
//!
//! # Inspect the create_home body for a scenario
//! meshbed topology service-discovery --json
//!
//! # Run against a remote Cirque service and keep device logs
//! DEVICE_LOG_DIR=/tmp/logs meshbed run basic-cluster-attrs --cirque-url http://cirque:5000
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod logging;

use commands::{list, run, topology};

/// Multi-device Thread/Matter integration-test runner.
#[derive(Parser, Debug)]
#[command(name = "meshbed")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log full command output
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List built-in scenarios
    List,

    /// Show a scenario's devices and steps
    Topology {
        /// Scenario name
        name: String,

        /// Print the create_home request body instead
        #[arg(long)]
        json: bool,
    },

    /// Run a scenario
    Run {
        /// Scenario name
        name: String,

        /// Config file (default: ./meshbed.toml if present)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Cirque service URL
        #[arg(long)]
        cirque_url: Option<String>,

        /// Directory to archive device logs into
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Do not archive device logs
        #[arg(long)]
        no_save_logs: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::List => list::run()?,
        Commands::Topology { name, json } => topology::run(&name, json)?,
        Commands::Run {
            name,
            config,
            cirque_url,
            log_dir,
            no_save_logs,
        } => {
            let options = run::RunOptions {
                config,
                cirque_url,
                log_dir,
                no_save_logs,
            };
            let result = run::run(&name, &options).await?;
            return Ok(exit_code(result));
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn exit_code(result: mesh_harness::TestResult) -> ExitCode {
    // codes are 0..=2
    ExitCode::from(result.exit_code() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "meshbed",
            "run",
            "service-discovery",
            "--cirque-url",
            "http://cirque:5000",
            "--no-save-logs",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                name,
                cirque_url,
                no_save_logs,
                config,
                ..
            } => {
                assert_eq!(name, "service-discovery");
                assert_eq!(cirque_url.as_deref(), Some("http://cirque:5000"));
                assert!(no_save_logs);
                assert!(config.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn run_requires_scenario_name() {
        assert!(Cli::try_parse_from(["meshbed", "run"]).is_err());
    }
}
