//! Toolchain Installer
//!
//! Downloads the toolchain installer script, verifies it, and runs it
//! without prompts. The result is a [`ToolchainEnv`]: the search path and
//! toolchain homes later steps need, passed along explicitly instead of
//! being written into this process's environment.

pub mod fetch;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::ToolchainConfig;
use crate::error::{Result, config as config_error, fs as fs_error, toolchain as toolchain_error};
use crate::process::{CommandRunner, CommandSpec};

pub use fetch::{HttpsSource, InstallerSource, ensure_trusted_url, sha256_hex, verify_checksum};

/// File name the downloaded installer is saved under
pub const INSTALLER_FILE_NAME: &str = "rustup-init.sh";

/// Resolve where the toolchain lives: config, then `$CARGO_HOME`, then `~/.cargo`
pub fn resolve_cargo_home(config: &ToolchainConfig) -> Result<PathBuf> {
    if let Some(ref home) = config.cargo_home {
        return Ok(home.clone());
    }
    if let Some(home) = std::env::var_os("CARGO_HOME").filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|home| home.join(".cargo"))
        .ok_or_else(|| {
            config_error::invalid("cannot determine CARGO_HOME; set toolchain.cargo_home")
        })
}

fn resolve_rustup_home(config: &ToolchainConfig) -> Option<PathBuf> {
    config.rustup_home.clone().or_else(|| {
        std::env::var_os("RUSTUP_HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
    })
}

/// Installed toolchain, as seen by the steps that use it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainEnv {
    pub cargo_home: PathBuf,
    pub rustup_home: Option<PathBuf>,
    pub bin_dir: PathBuf,
    /// `bin_dir` followed by the inherited `PATH`
    pub search_path: OsString,
    /// `cargo --version` output, once the toolchain is verified
    pub version: Option<String>,
}

impl ToolchainEnv {
    /// Layout for a toolchain in `cargo_home`, prepending its bin dir to `inherited_path`
    pub fn new(
        cargo_home: PathBuf,
        rustup_home: Option<PathBuf>,
        inherited_path: Option<OsString>,
    ) -> Result<Self> {
        let bin_dir = cargo_home.join("bin");
        let mut entries = vec![bin_dir.clone()];
        if let Some(ref path) = inherited_path {
            entries.extend(std::env::split_paths(path).filter(|p| *p != bin_dir));
        }
        let search_path = std::env::join_paths(entries)
            .map_err(|e| config_error::invalid(format!("invalid search path: {e}")))?;
        Ok(Self {
            cargo_home,
            rustup_home,
            bin_dir,
            search_path,
            version: None,
        })
    }

    /// Layout for the configured toolchain, based on this process's `PATH`
    pub fn from_config(config: &ToolchainConfig) -> Result<Self> {
        Self::new(
            resolve_cargo_home(config)?,
            resolve_rustup_home(config),
            std::env::var_os("PATH"),
        )
    }

    pub fn cargo(&self) -> PathBuf {
        self.binary("cargo")
    }

    pub fn binary(&self, name: &str) -> PathBuf {
        self.bin_dir.join(name)
    }

    /// Point a command at this toolchain
    pub fn apply(&self, spec: CommandSpec) -> CommandSpec {
        let spec = spec
            .env("PATH", &self.search_path)
            .env("CARGO_HOME", &self.cargo_home);
        match self.rustup_home {
            Some(ref home) => spec.env("RUSTUP_HOME", home),
            None => spec,
        }
    }
}

/// Installs the toolchain through an [`InstallerSource`] and a [`CommandRunner`]
pub struct ToolchainInstaller<'a> {
    runner: &'a dyn CommandRunner,
    source: &'a dyn InstallerSource,
    config: &'a ToolchainConfig,
    work_dir: &'a Path,
}

impl<'a> ToolchainInstaller<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        source: &'a dyn InstallerSource,
        config: &'a ToolchainConfig,
        work_dir: &'a Path,
    ) -> Self {
        Self {
            runner,
            source,
            config,
            work_dir,
        }
    }

    fn script_path(&self) -> PathBuf {
        self.work_dir.join("toolchain").join(INSTALLER_FILE_NAME)
    }

    fn installer_command(&self, env: &ToolchainEnv) -> CommandSpec {
        let spec = CommandSpec::new("sh")
            .arg(self.script_path())
            .args(["-y", "--no-modify-path", "--profile"])
            .arg(&self.config.profile)
            .arg("--default-toolchain")
            .arg(&self.config.default_toolchain)
            .env("RUSTUP_INIT_SKIP_PATH_CHECK", "yes")
            .env("CARGO_HOME", &env.cargo_home);
        match env.rustup_home {
            Some(ref home) => spec.env("RUSTUP_HOME", home),
            None => spec,
        }
    }

    fn verify_command(env: &ToolchainEnv) -> CommandSpec {
        env.apply(CommandSpec::new(env.cargo()).arg("--version"))
    }

    /// Commands [`install`](Self::install) runs after the download
    pub fn plan(&self, env: &ToolchainEnv) -> Vec<CommandSpec> {
        vec![self.installer_command(env), Self::verify_command(env)]
    }

    /// Fetch, verify and run the installer, then check the toolchain works
    pub fn install(&self, env: ToolchainEnv) -> Result<ToolchainEnv> {
        let url = ensure_trusted_url(&self.config.installer_url)?;
        if self.config.installer_sha256.is_none() && !self.config.allow_unverified_installer {
            return Err(toolchain_error::checksum_missing(url.as_str()));
        }

        let script = self.source.fetch(&url)?;
        match self.config.installer_sha256 {
            Some(ref expected) => {
                verify_checksum(&url, &script, expected)?;
                tracing::debug!(url = %url, "installer checksum verified");
            }
            None => tracing::warn!(
                url = %url,
                sha256 = %sha256_hex(&script),
                "running unverified toolchain installer"
            ),
        }

        let script_path = self.script_path();
        if let Some(parent) = script_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| fs_error::write_failed(parent, e))?;
        }
        std::fs::write(&script_path, &script)
            .map_err(|e| fs_error::write_failed(&script_path, e))?;

        self.run_checked(&self.installer_command(&env))?;
        let version = self.run_checked(&Self::verify_command(&env))?;
        let version = version.trim().to_string();
        tracing::info!(version = %version, cargo_home = %env.cargo_home.display(), "toolchain ready");

        Ok(ToolchainEnv {
            version: Some(version),
            ..env
        })
    }

    fn run_checked(&self, spec: &CommandSpec) -> Result<String> {
        let output = self
            .runner
            .run(spec)
            .map_err(|e| toolchain_error::command_failed(spec.display_line(), None, e.to_string()))?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(toolchain_error::command_failed(
                spec.display_line(),
                output.exit_code,
                output.combined(),
            ))
        }
    }
}
