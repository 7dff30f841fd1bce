//! gravtime - simulate, analyze and graph time-dilation series

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use gravtime_core::GravtimeError;

use gravtime_cli::{analyze_command, graph_command, init_logging, run, Cli, Command};

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Run(args) => run(args).map(|summary| summary.to_string()),
        Command::Analyze(args) => analyze_command(args),
        Command::Graph(args) => graph_command(args),
    };

    match result {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e @ GravtimeError::Input(_)) => {
            error!("{}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
