//! Binary entrypoint for the `rewind` CLI.

use std::ffi::OsString;
use std::process::ExitCode;

use clap::Parser;
use rewind::cli::Cli;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args: Vec<OsString> = std::env::args_os().collect();
    // Parsed up front only to pick the log level; help and usage errors exit here.
    let verbose = Cli::parse_from(&args).verbose;

    let log_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match rewind::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
