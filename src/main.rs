//! bundlecheck - provision a clean environment and smoke-test a release bundle
//!
//! Installs system packages, a Rust toolchain and a helper package in a fixed
//! order, then runs the helper's setup command against the bundle under test.
//! The process exit code is the verdict.

use clap::Parser;
use miette::Diagnostic;
use tracing_subscriber::EnvFilter;

mod archive;
mod cli;
mod commands;
mod config;
mod environment;
mod error;
mod hash;
mod package;
mod pipeline;
mod process;
mod report;
mod setup;
mod temp;
mod toolchain;
mod ui;

#[cfg(test)]
mod test_fixtures;

use cli::{Cli, Commands};
use error::ProvisionError;

/// Default log filter when RUST_LOG is unset
fn default_filter(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "bundlecheck=debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, quiet)));
    // A second init (e.g. from a test harness) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn report_error(err: &ProvisionError) {
    eprintln!("Error: {}", err);
    if let Some(help) = err.help() {
        eprintln!("  help: {}", help);
    }
    if let Some(output) = err.tool_output().filter(|o| !o.trim().is_empty()) {
        eprintln!();
        eprintln!("{}", output.trim_end());
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(*args, cli.quiet),
        Commands::Resolve(args) => commands::resolve::run(args),
        Commands::Completions(args) => commands::completions::run(args),
        Commands::Version => commands::version::run(),
    };

    if let Err(e) = result {
        report_error(&e);
        std::process::exit(e.exit_code());
    }
}
