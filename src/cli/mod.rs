//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for each command's argument types:
//! - run: Run command arguments
//! - resolve: Resolve command arguments
//! - completions: Completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};

pub mod completions;
pub mod resolve;
pub mod run;

pub use completions::CompletionsArgs;
pub use resolve::ResolveArgs;
pub use run::RunArgs;

/// bundlecheck - provision a build environment and smoke-test a bundle
#[derive(Parser, Debug)]
#[command(
    name = "bundlecheck",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Provision a clean environment and smoke-test a release bundle",
    long_about = "bundlecheck installs system packages, a Rust toolchain and a helper package, \
                  then hands a pre-built release bundle to the helper's setup command. \
                  The setup command's exit code is the verdict.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  bundlecheck run --helper-archive kani-verifier.crate \\\n     \
                  --bundle-archive kani-0.39.0-x86_64-unknown-linux-gnu.tar.gz\n   \
                  bundlecheck run --config bundlecheck.yaml --dry-run  \x1b[90m# Print the plan\x1b[0m\n   \
                  bundlecheck resolve kani-verifier.crate --pattern 'kani-verifier-*'\n\n\
                  "
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the provisioning pipeline
    Run(Box<RunArgs>),

    /// Extract an archive and resolve its single versioned directory
    Resolve(ResolveArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Show version information
    #[command(hide = true)]
    Version,
}
