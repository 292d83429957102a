//! Error types and handling for bundlecheck
//!
//! Uses `thiserror` for error definitions and `miette` for diagnostic codes and help text.
//!
//! This module is organized into sub-modules by error domain:
//! - [`environment`]: Environment Builder errors
//! - [`toolchain`]: Toolchain Installer errors
//! - [`extraction`]: Archive extraction and directory resolution errors
//! - [`package`]: Package Installer errors
//! - [`setup`]: Bundle Setup Runner errors
//! - [`config`]: Configuration errors
//! - [`cli`]: Command-line usage errors
//! - [`fs`]: File system errors
//!
//! Every pipeline error knows the [`Step`] it came from and, when an external
//! tool produced one, the exit code that should become the process exit code.

pub mod cli;
pub mod config;
pub mod environment;
pub mod extraction;
pub mod fs;
pub mod package;
pub mod setup;
pub mod toolchain;

use miette::Diagnostic;
use thiserror::Error;

use crate::pipeline::Step;

/// Main error type for bundlecheck operations
#[derive(Error, Diagnostic, Debug)]
pub enum ProvisionError {
    // Environment errors
    #[error("Base image mismatch: expected '{expected}', found '{actual}'")]
    #[diagnostic(
        code(bundlecheck::environment::base_image_mismatch),
        help("Run inside the configured base image or change `environment.base_image`")
    )]
    BaseImageMismatch { expected: String, actual: String },

    #[error("Invalid system package name: '{name}'")]
    #[diagnostic(
        code(bundlecheck::environment::invalid_package_name),
        help("Package names use lowercase letters, digits and '+', '-', '.'")
    )]
    InvalidPackageName { name: String },

    #[error("System packages unavailable in the package index: {packages}")]
    #[diagnostic(code(bundlecheck::environment::packages_unavailable))]
    PackagesUnavailable {
        packages: String,
        /// Exit code of the first failing probe
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Environment setup failed: {command}{}", exit_suffix(.exit_code))]
    #[diagnostic(code(bundlecheck::environment::command_failed))]
    EnvironmentCommandFailed {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    // Toolchain errors
    #[error("Refusing to download installer over an unauthenticated transport: {url}")]
    #[diagnostic(
        code(bundlecheck::toolchain::insecure_transport),
        help("The installer URL must use https")
    )]
    InsecureTransport { url: String },

    #[error("Failed to download toolchain installer from {url}: {reason}")]
    #[diagnostic(code(bundlecheck::toolchain::download_failed))]
    InstallerDownloadFailed { url: String, reason: String },

    #[error("No checksum configured for toolchain installer {url}")]
    #[diagnostic(
        code(bundlecheck::toolchain::checksum_missing),
        help(
            "Set `toolchain.installer_sha256` (or --installer-sha256), or pass \
             --allow-unverified-installer to accept an unverified script"
        )
    )]
    InstallerChecksumMissing { url: String },

    #[error("Checksum mismatch for toolchain installer {url}: expected {expected}, got {actual}")]
    #[diagnostic(code(bundlecheck::toolchain::checksum_mismatch))]
    InstallerChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Toolchain installation failed: {command}{}", exit_suffix(.exit_code))]
    #[diagnostic(code(bundlecheck::toolchain::command_failed))]
    ToolchainCommandFailed {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    // Extraction errors
    #[error("Failed to extract archive '{archive}': {reason}")]
    #[diagnostic(code(bundlecheck::extraction::failed))]
    ExtractionFailed { archive: String, reason: String },

    #[error("Invalid directory pattern '{pattern}': {reason}")]
    #[diagnostic(code(bundlecheck::extraction::invalid_pattern))]
    InvalidDirectoryPattern { pattern: String, reason: String },

    #[error("No directory matching '{pattern}' in {dir}")]
    #[diagnostic(
        code(bundlecheck::extraction::no_match),
        help("Check that the archive is the expected package and the pattern names its directory")
    )]
    NoMatchingDirectory { pattern: String, dir: String },

    #[error("Ambiguous install target: {count} directories match '{pattern}': {matches}")]
    #[diagnostic(
        code(bundlecheck::extraction::ambiguous_match),
        help("Exactly one extracted directory must match the pattern")
    )]
    AmbiguousDirectoryMatch {
        pattern: String,
        count: usize,
        matches: String,
    },

    // Package errors
    #[error("Failed to install package from '{path}'{}", exit_suffix(.exit_code))]
    #[diagnostic(code(bundlecheck::package::install_failed))]
    PackageInstallFailed {
        path: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Installed binary not found: {path}")]
    #[diagnostic(
        code(bundlecheck::package::binary_not_found),
        help("Check that `package.binary` names a binary the package installs")
    )]
    BinaryNotFound { path: String },

    // Setup errors
    #[error("Bundle archive not found: {path}")]
    #[diagnostic(code(bundlecheck::setup::bundle_missing))]
    BundleArchiveMissing { path: String },

    #[error("Bundle setup failed: {command}{}", exit_suffix(.exit_code))]
    #[diagnostic(code(bundlecheck::setup::invocation_failed))]
    SetupInvocationFailed {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    #[diagnostic(code(bundlecheck::config::not_found))]
    ConfigNotFound { path: String },

    #[error("Failed to parse configuration file: {path}: {reason}")]
    #[diagnostic(code(bundlecheck::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(bundlecheck::config::invalid))]
    ConfigInvalid { message: String },

    // Command-line errors
    #[error("Unsupported shell: {shell}")]
    #[diagnostic(
        code(bundlecheck::cli::unsupported_shell),
        help("Supported shells: bash, elvish, fish, powershell, zsh")
    )]
    UnsupportedShell { shell: String },

    // File system errors
    #[error("Failed to read file: {path}: {reason}")]
    #[diagnostic(code(bundlecheck::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}: {reason}")]
    #[diagnostic(code(bundlecheck::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(bundlecheck::fs::io_error))]
    IoError { message: String },
}

fn exit_suffix(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!(" (exit code {code})"),
        None => " (terminated by signal)".to_string(),
    }
}

impl ProvisionError {
    /// Pipeline step this error originates from, if any
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::BaseImageMismatch { .. }
            | Self::InvalidPackageName { .. }
            | Self::PackagesUnavailable { .. }
            | Self::EnvironmentCommandFailed { .. } => Some(Step::Environment),
            Self::InsecureTransport { .. }
            | Self::InstallerDownloadFailed { .. }
            | Self::InstallerChecksumMissing { .. }
            | Self::InstallerChecksumMismatch { .. }
            | Self::ToolchainCommandFailed { .. } => Some(Step::Toolchain),
            Self::ExtractionFailed { .. }
            | Self::InvalidDirectoryPattern { .. }
            | Self::NoMatchingDirectory { .. }
            | Self::AmbiguousDirectoryMatch { .. }
            | Self::PackageInstallFailed { .. }
            | Self::BinaryNotFound { .. } => Some(Step::Package),
            Self::BundleArchiveMissing { .. } | Self::SetupInvocationFailed { .. } => {
                Some(Step::Setup)
            }
            Self::ConfigNotFound { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigInvalid { .. }
            | Self::UnsupportedShell { .. }
            | Self::FileReadFailed { .. }
            | Self::FileWriteFailed { .. }
            | Self::IoError { .. } => None,
        }
    }

    /// True for the extraction family (archive unpacking and directory resolution)
    pub fn is_extraction_error(&self) -> bool {
        matches!(
            self,
            Self::ExtractionFailed { .. }
                | Self::InvalidDirectoryPattern { .. }
                | Self::NoMatchingDirectory { .. }
                | Self::AmbiguousDirectoryMatch { .. }
        )
    }

    /// Error family name, as recorded in run reports
    pub fn category(&self) -> &'static str {
        if self.is_extraction_error() {
            return "extraction";
        }
        match self.step() {
            Some(Step::Environment) => "environment_setup",
            Some(Step::Toolchain) => "toolchain_install",
            Some(Step::Package) => "package_install",
            Some(Step::Setup) => "setup_invocation",
            None => match self {
                Self::ConfigNotFound { .. }
                | Self::ConfigParseFailed { .. }
                | Self::ConfigInvalid { .. } => "config",
                Self::UnsupportedShell { .. } => "usage",
                _ => "io",
            },
        }
    }

    /// Captured output of the external tool that failed, verbatim
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::PackagesUnavailable { output, .. }
            | Self::EnvironmentCommandFailed { output, .. }
            | Self::ToolchainCommandFailed { output, .. }
            | Self::PackageInstallFailed { output, .. }
            | Self::SetupInvocationFailed { output, .. } => Some(output.as_str()),
            _ => None,
        }
    }

    /// Process exit code to surface for this error
    ///
    /// The exit code of the failing tool is propagated unchanged; everything
    /// else (including tools killed by a signal) maps to 1.
    pub fn exit_code(&self) -> i32 {
        let code = match self {
            Self::PackagesUnavailable { exit_code, .. }
            | Self::EnvironmentCommandFailed { exit_code, .. }
            | Self::ToolchainCommandFailed { exit_code, .. }
            | Self::PackageInstallFailed { exit_code, .. }
            | Self::SetupInvocationFailed { exit_code, .. } => *exit_code,
            _ => None,
        };
        match code {
            Some(code) if code != 0 => code,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for ProvisionError {
    fn from(err: std::io::Error) -> Self {
        ProvisionError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for ProvisionError {
    fn from(err: serde_yaml::Error) -> Self {
        ProvisionError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ProvisionError {
    fn from(err: serde_json::Error) -> Self {
        ProvisionError::IoError {
            message: format!("JSON serialization failed: {err}"),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, ProvisionError>;
