//! Pipeline configuration (bundlecheck.yaml)
//!
//! The file is optional: every section has defaults reproducing the kani
//! bundle test recipe, and every field the command line exposes can be
//! overridden through [`ConfigOverrides`]. Relative paths in the file are
//! resolved against the file's directory; relative paths on the command line
//! against the current directory.

pub mod overrides;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, config as config_error};

pub use overrides::ConfigOverrides;

/// Default config file name looked up in the current directory
pub const CONFIG_FILE_NAME: &str = "bundlecheck.yaml";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionConfig {
    /// Scratch directory for the installer script and the extracted package
    pub work_dir: PathBuf,

    /// Test assets copied verbatim into the work directory before setup
    pub assets: Option<PathBuf>,

    pub environment: EnvironmentConfig,
    pub toolchain: ToolchainConfig,
    pub package: PackageConfig,
    pub bundle: BundleConfig,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            work_dir: crate::temp::default_work_dir(),
            assets: None,
            environment: EnvironmentConfig::default(),
            toolchain: ToolchainConfig::default(),
            package: PackageConfig::default(),
            bundle: BundleConfig::default(),
        }
    }
}

/// Environment Builder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Expected base image as `name[:tag]`; `None` accepts any system
    pub base_image: Option<String>,
    /// System packages to install
    pub packages: Vec<String>,
    /// Suppress package-manager prompts
    pub non_interactive: bool,
    /// Extra variables for package-manager invocations
    pub env: BTreeMap<String, String>,
    /// Where to read the running system's identity from
    pub os_release: PathBuf,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            base_image: Some("ubuntu:18.04".to_string()),
            packages: ["python3", "python3-pip", "curl", "ctags"]
                .into_iter()
                .map(String::from)
                .collect(),
            non_interactive: true,
            env: BTreeMap::new(),
            os_release: PathBuf::from("/etc/os-release"),
        }
    }
}

/// Toolchain Installer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    pub installer_url: String,
    /// Expected SHA-256 of the installer script (hex)
    pub installer_sha256: Option<String>,
    /// Run the installer even when no checksum is configured
    pub allow_unverified_installer: bool,
    pub default_toolchain: String,
    pub profile: String,
    /// Defaults to `$CARGO_HOME`, then `~/.cargo`
    pub cargo_home: Option<PathBuf>,
    /// Defaults to `$RUSTUP_HOME`; left to the installer when unset
    pub rustup_home: Option<PathBuf>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            installer_url: "https://sh.rustup.rs".to_string(),
            installer_sha256: None,
            allow_unverified_installer: false,
            default_toolchain: "stable".to_string(),
            profile: "minimal".to_string(),
            cargo_home: None,
            rustup_home: None,
        }
    }
}

/// Package Installer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageConfig {
    /// Helper package source archive
    pub archive: Option<PathBuf>,
    /// Directory the archive unpacks to; `{version}` stands for the unknown version
    pub dir_pattern: String,
    /// Binary the package installs
    pub binary: String,
    /// Extra arguments for `cargo install`
    pub install_args: Vec<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            archive: None,
            dir_pattern: "kani-verifier-{version}".to_string(),
            binary: "cargo-kani".to_string(),
            install_args: Vec::new(),
        }
    }
}

/// Bundle Setup Runner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    /// Artifact under test
    pub archive: Option<PathBuf>,
    /// Arguments placed before the bundle path
    pub setup_args: Vec<String>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            archive: None,
            setup_args: vec!["setup".to_string(), "--use-local-bundle".to_string()],
        }
    }
}

impl ProvisionConfig {
    /// Parse configuration from a YAML string (no path resolution)
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Load a configuration file and resolve its relative paths
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(config_error::not_found(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| config_error::parse_failed(path.display().to_string(), e.to_string()))?;
        let mut loaded: Self = serde_yaml::from_str(&content)
            .map_err(|e| config_error::parse_failed(path.display().to_string(), e.to_string()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        loaded.resolve_paths(base);
        Ok(loaded)
    }

    /// Load `explicit` if given, else `bundlecheck.yaml` in `cwd` if present, else defaults
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = cwd.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "using discovered config file");
            return Self::load(&candidate);
        }
        Ok(Self::default())
    }

    /// Make every relative path absolute against `base`
    fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.work_dir);
        join(&mut self.environment.os_release);
        for path in [
            &mut self.assets,
            &mut self.package.archive,
            &mut self.bundle.archive,
            &mut self.toolchain.cargo_home,
            &mut self.toolchain.rustup_home,
        ]
        .into_iter()
        .flatten()
        {
            join(path);
        }
    }

    /// Check the configuration is complete and well-formed
    ///
    /// Package names and the installer URL scheme are checked by their steps,
    /// so those failures are attributed to the step that owns them.
    pub fn validate(&self) -> Result<()> {
        if self.package.archive.is_none() {
            return Err(config_error::invalid(
                "package.archive is required (--helper-archive)",
            ));
        }
        if self.bundle.archive.is_none() {
            return Err(config_error::invalid(
                "bundle.archive is required (--bundle-archive)",
            ));
        }
        if self.package.dir_pattern.trim().is_empty() {
            return Err(config_error::invalid("package.dir_pattern must not be empty"));
        }
        let binary = &self.package.binary;
        if binary.is_empty() || binary.contains('/') || binary.contains('\\') {
            return Err(config_error::invalid(format!(
                "package.binary must be a bare binary name, got '{binary}'"
            )));
        }
        Url::parse(&self.toolchain.installer_url).map_err(|e| {
            config_error::invalid(format!(
                "toolchain.installer_url '{}' is not a URL: {e}",
                self.toolchain.installer_url
            ))
        })?;
        if let Some(ref sha) = self.toolchain.installer_sha256 {
            if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(config_error::invalid(
                    "toolchain.installer_sha256 must be 64 hex characters",
                ));
            }
        }
        if self.toolchain.default_toolchain.trim().is_empty() {
            return Err(config_error::invalid(
                "toolchain.default_toolchain must not be empty",
            ));
        }
        if let Some(ref assets) = self.assets {
            // Assets are copied into <work_dir>/tests; overlapping trees never terminate
            let assets_real = canonicalize_lenient(assets);
            let work_real = canonicalize_lenient(&self.work_dir);
            if work_real.starts_with(&assets_real) || assets_real.starts_with(&work_real) {
                return Err(config_error::invalid(format!(
                    "assets '{}' and work_dir '{}' must not contain one another",
                    assets.display(),
                    self.work_dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Apply command-line / environment overrides on top of the file
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        overrides.apply_to(self);
    }
}

/// Canonicalize the longest existing prefix of `path` and append the rest
///
/// `work_dir` usually does not exist before the first run.
fn canonicalize_lenient(path: &Path) -> PathBuf {
    for ancestor in path.ancestors() {
        if let Ok(real) = dunce::canonicalize(ancestor) {
            return match path.strip_prefix(ancestor) {
                Ok(rest) => real.join(rest),
                Err(_) => real,
            };
        }
    }
    path.to_path_buf()
}
