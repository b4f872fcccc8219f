mod args;
mod commands;
mod error;
mod shared;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

use args::{AppCommand, Cli, ParseFailure, classify_parse_error, render_help};
use commands::{LaunchMode, run_install, run_launch};
use error::LauncherError;
use shared::console;
use shared::process::SystemExecutor;
use shared::signal::install_interrupt_flag;

// Top-level entrypoint: parse CLI args, dispatch to a command module, map failures to exit 1.
fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return report_parse_error(&err),
    };

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            console::error(format!("{err:#}"));
            if let Some(usage) = err
                .downcast_ref::<LauncherError>()
                .and_then(LauncherError::usage)
            {
                eprintln!("Usage: {usage}");
            }
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        print!("{}", render_help());
        return Ok(());
    };

    let mut executor = SystemExecutor;
    match command {
        AppCommand::Install(install) => {
            run_install(&cli.launcher, &install, &mut executor)?;
        }
        command => {
            // Validate the mode argument before touching the toolchain or filesystem.
            let mode = LaunchMode::from_command(command)?;
            let interrupted = install_interrupt_flag()?;
            run_launch(&cli.launcher, &mode, &mut executor, &interrupted)?;
        }
    }
    Ok(())
}

fn report_parse_error(err: &clap::Error) -> ExitCode {
    let failure = classify_parse_error(err);
    match &failure {
        ParseFailure::Informational | ParseFailure::Invalid => {
            let _ = err.print();
        }
        ParseFailure::UnknownMode(mode) => {
            console::error(format!("Unknown mode: {mode}"));
            eprintln!();
            eprint!("{}", render_help());
        }
    }
    ExitCode::from(exit_status(&failure))
}

// Help and version requests succeed; every other parse failure exits 1, never clap's 2.
fn exit_status(failure: &ParseFailure) -> u8 {
    match failure {
        ParseFailure::Informational => 0,
        ParseFailure::UnknownMode(_) | ParseFailure::Invalid => 1,
    }
}
