//! qrbox command line.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;

use qrbox::logging::{init_logging, LogConfig};

mod cli;
mod commands;
mod repl;

use crate::cli::{Cli, Command};
use crate::commands::{load_config, run_import, run_pack, run_render, run_session};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        return ExitCode::FAILURE;
    }

    let result = load_config(cli.config.as_deref()).and_then(|config| match &cli.command {
        Command::Pack(args) => run_pack(args, config),
        Command::Import(args) => run_import(args, config),
        Command::Session(args) => run_session(args, config),
        Command::Render(args) => run_render(args, config),
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig::from_flags(cli.verbose, cli.quiet)
        .with_format(cli.log_format.into())
        .with_log_file(cli.log_file.clone())
        .with_ansi(cli.log_file.is_none() && io::stderr().is_terminal());
    // Explicit flags win over RUST_LOG
    config.use_env_filter = cli.verbose == 0 && cli.quiet == 0;
    config
}
