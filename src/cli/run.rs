use clap::Parser;
use std::path::PathBuf;

use crate::config::ConfigOverrides;

/// Arguments for the run command
///
/// Every option can also be given through its `BUNDLECHECK_*` variable.
/// Values given here replace what the config file says.
#[derive(Parser, Debug, Default)]
#[command(after_help = "EXAMPLES:\n  \
                   Smoke-test a kani release bundle:\n    \
                   bundlecheck run --helper-archive kani-verifier.crate \\\n      \
                   --bundle-archive kani-0.39.0-x86_64-unknown-linux-gnu.tar.gz \\\n      \
                   --installer-sha256 <sha256 of https://sh.rustup.rs>\n\n\
                   Show every command without running anything:\n    \
                   bundlecheck run --config bundlecheck.yaml --dry-run\n\n\
                   Write a JSON report of the run:\n    \
                   bundlecheck run --report report.json")]
pub struct RunArgs {
    /// Configuration file (defaults to ./bundlecheck.yaml when present)
    #[arg(long, short = 'c', env = "BUNDLECHECK_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Helper package source archive (e.g. kani-verifier.crate)
    #[arg(long, env = "BUNDLECHECK_HELPER_ARCHIVE", value_name = "PATH")]
    pub helper_archive: Option<PathBuf>,

    /// Release bundle under test
    #[arg(long, env = "BUNDLECHECK_BUNDLE_ARCHIVE", value_name = "PATH")]
    pub bundle_archive: Option<PathBuf>,

    /// Test assets copied into the work directory before setup
    #[arg(long, env = "BUNDLECHECK_ASSETS", value_name = "DIR")]
    pub assets: Option<PathBuf>,

    /// Scratch directory for the installer and the extracted package
    #[arg(long, env = "BUNDLECHECK_WORK_DIR", value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Expected base image as name[:tag], or "any" to skip the check
    #[arg(long, env = "BUNDLECHECK_BASE_IMAGE", value_name = "IMAGE")]
    pub base_image: Option<String>,

    /// System package to install (repeatable; replaces the configured list)
    #[arg(
        long = "package",
        env = "BUNDLECHECK_PACKAGES",
        value_name = "NAME",
        value_delimiter = ','
    )]
    pub packages: Vec<String>,

    /// Toolchain installer script URL (https only)
    #[arg(long, env = "BUNDLECHECK_INSTALLER_URL", value_name = "URL")]
    pub installer_url: Option<String>,

    /// Expected SHA-256 of the installer script
    #[arg(long, env = "BUNDLECHECK_INSTALLER_SHA256", value_name = "HEX")]
    pub installer_sha256: Option<String>,

    /// Run the installer even though no checksum is configured
    #[arg(
        long,
        env = "BUNDLECHECK_ALLOW_UNVERIFIED_INSTALLER",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub allow_unverified_installer: bool,

    /// Directory the helper archive unpacks to; {version} matches any version
    #[arg(long, env = "BUNDLECHECK_DIR_PATTERN", value_name = "TEMPLATE")]
    pub dir_pattern: Option<String>,

    /// Binary the helper package installs
    #[arg(long, env = "BUNDLECHECK_BINARY", value_name = "NAME")]
    pub binary: Option<String>,

    /// Write a JSON report of the run here
    #[arg(long, env = "BUNDLECHECK_REPORT", value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Print the commands that would run without running them
    #[arg(long)]
    pub dry_run: bool,
}

impl From<&RunArgs> for ConfigOverrides {
    fn from(args: &RunArgs) -> Self {
        Self {
            helper_archive: args.helper_archive.clone(),
            bundle_archive: args.bundle_archive.clone(),
            assets: args.assets.clone(),
            work_dir: args.work_dir.clone(),
            base_image: args.base_image.clone(),
            packages: args.packages.clone(),
            installer_url: args.installer_url.clone(),
            installer_sha256: args.installer_sha256.clone(),
            allow_unverified_installer: args.allow_unverified_installer,
            dir_pattern: args.dir_pattern.clone(),
            binary: args.binary.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use serial_test::serial;

    fn parse_run(args: &[&str]) -> RunArgs {
        let mut argv = vec!["bundlecheck", "run"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap_or_else(|e| {
            panic!("Failed to parse CLI arguments: {}", e);
        });
        match cli.command {
            Commands::Run(args) => *args,
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    #[serial]
    fn test_cli_parsing_run_defaults() {
        let args = parse_run(&[]);
        assert_eq!(args.helper_archive, None);
        assert!(args.packages.is_empty());
        assert!(!args.dry_run);
        assert_eq!(ConfigOverrides::from(&args), ConfigOverrides::default());
    }

    #[test]
    #[serial]
    fn test_cli_parsing_run_with_options() {
        let args = parse_run(&[
            "--helper-archive",
            "kani-verifier.crate",
            "--bundle-archive",
            "kani-0.39.0-x86_64-unknown-linux-gnu.tar.gz",
            "--package",
            "python3",
            "--package",
            "curl,ctags",
            "--allow-unverified-installer",
            "--dry-run",
        ]);
        assert_eq!(args.packages, vec!["python3", "curl", "ctags"]);
        assert!(args.dry_run);

        let overrides = ConfigOverrides::from(&args);
        assert_eq!(
            overrides.helper_archive,
            Some(PathBuf::from("kani-verifier.crate"))
        );
        assert!(overrides.allow_unverified_installer);
    }

    #[test]
    #[serial]
    fn test_cli_run_reads_environment() {
        unsafe {
            std::env::set_var("BUNDLECHECK_BINARY", "cargo-tool");
            std::env::set_var("BUNDLECHECK_PACKAGES", "curl,git");
        }
        let args = parse_run(&[]);
        unsafe {
            std::env::remove_var("BUNDLECHECK_BINARY");
            std::env::remove_var("BUNDLECHECK_PACKAGES");
        }
        assert_eq!(args.binary.as_deref(), Some("cargo-tool"));
        assert_eq!(args.packages, vec!["curl", "git"]);
    }

    #[test]
    #[serial]
    fn test_cli_allow_unverified_accepts_boolish_environment() {
        unsafe {
            std::env::set_var("BUNDLECHECK_ALLOW_UNVERIFIED_INSTALLER", "1");
        }
        let enabled = parse_run(&[]);
        unsafe {
            std::env::set_var("BUNDLECHECK_ALLOW_UNVERIFIED_INSTALLER", "no");
        }
        let disabled = parse_run(&[]);
        unsafe {
            std::env::remove_var("BUNDLECHECK_ALLOW_UNVERIFIED_INSTALLER");
        }
        assert!(enabled.allow_unverified_installer);
        assert!(!disabled.allow_unverified_installer);
    }

    #[test]
    #[serial]
    fn test_cli_flag_overrides_environment() {
        unsafe {
            std::env::set_var("BUNDLECHECK_BINARY", "from-env");
        }
        let args = parse_run(&["--binary", "from-flag"]);
        unsafe {
            std::env::remove_var("BUNDLECHECK_BINARY");
        }
        assert_eq!(args.binary.as_deref(), Some("from-flag"));
    }
}
