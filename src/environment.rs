//! Environment Builder
//!
//! Confirms the running system is the expected base image and installs the
//! required system packages without prompting. Every package is probed
//! before anything is installed, so a missing package fails the step with
//! the complete list of what is missing and leaves the system untouched.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::EnvironmentConfig;
use crate::error::{Result, environment as environment_error};
use crate::process::{CommandRunner, CommandSpec};

const APT_GET: &str = "apt-get";

/// Identity of the running system, from os-release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub version_id: Option<String>,
}

impl OsRelease {
    /// Parse the `KEY=value` lines of an os-release file
    pub fn parse(content: &str) -> Option<Self> {
        let mut id = None;
        let mut version_id = None;
        for line in content.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
            match key {
                "ID" => id = Some(value),
                "VERSION_ID" => version_id = Some(value),
                _ => {}
            }
        }
        Some(Self {
            id: id?,
            version_id,
        })
    }

    pub fn load(path: &Path) -> Option<Self> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|content| Self::parse(&content))
    }

    fn describe(&self) -> String {
        match self.version_id {
            Some(ref version) => format!("{}:{}", self.id, version),
            None => self.id.clone(),
        }
    }
}

/// A `name[:tag]` base image reference
///
/// Registry hosts, ports and repository paths (`localhost:5000/library/ubuntu:18.04`)
/// are accepted; only the last path segment is compared with the os-release `ID`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseImage {
    pub name: String,
    /// `None` for a bare name or `latest`
    pub tag: Option<String>,
}

impl BaseImage {
    pub fn parse(image: &str) -> Self {
        let reference = image.split_once('@').map_or(image, |(reference, _)| reference);
        // A colon before the last '/' belongs to a registry port, not a tag
        let (path, tag) = match reference.rsplit_once(':') {
            Some((path, tag)) if !tag.contains('/') => (path, Some(tag)),
            _ => (reference, None),
        };
        let name = path.rsplit_once('/').map_or(path, |(_, name)| name);
        Self {
            name: name.to_string(),
            tag: tag
                .filter(|tag| !tag.is_empty() && *tag != "latest")
                .map(str::to_string),
        }
    }

    pub fn matches(&self, os: &OsRelease) -> bool {
        if !self.name.eq_ignore_ascii_case(&os.id) {
            return false;
        }
        match self.tag {
            Some(ref tag) => os.version_id.as_deref() == Some(tag.as_str()),
            None => true,
        }
    }
}

/// Check a name against the Debian package-name grammar
///
/// Also keeps anything that looks like an option away from the package manager.
pub fn validate_package_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    let valid_rest =
        chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+-.".contains(c));
    if valid_first && valid_rest {
        Ok(())
    } else {
        Err(environment_error::invalid_package_name(name))
    }
}

/// Outcome of a successful environment build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyEnvironment {
    /// Detected system, when a base image was checked
    pub os: Option<OsRelease>,
    pub packages: Vec<String>,
}

/// Builds the system environment through a [`CommandRunner`]
pub struct EnvironmentBuilder<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a EnvironmentConfig,
}

impl<'a> EnvironmentBuilder<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a EnvironmentConfig) -> Self {
        Self { runner, config }
    }

    /// Variables set on every package-manager invocation
    pub fn package_manager_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        if self.config.non_interactive {
            env.insert("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string());
            env.insert("DEBCONF_NONINTERACTIVE_SEEN".to_string(), "true".to_string());
        }
        env.extend(self.config.env.clone());
        env
    }

    fn apt(&self) -> CommandSpec {
        CommandSpec::new(APT_GET).envs(&self.package_manager_env())
    }

    fn update_command(&self) -> CommandSpec {
        self.apt().arg("update")
    }

    fn probe_command(&self, package: &str) -> CommandSpec {
        self.apt().args(["install", "--simulate"]).arg(package)
    }

    fn install_command(&self) -> CommandSpec {
        self.apt()
            .args(["install", "-y"])
            .args(&self.config.packages)
    }

    /// Commands [`build`](Self::build) runs when every probe succeeds
    pub fn plan(&self) -> Vec<CommandSpec> {
        if self.config.packages.is_empty() {
            return Vec::new();
        }
        let mut commands = vec![self.update_command()];
        commands.extend(self.config.packages.iter().map(|p| self.probe_command(p)));
        commands.push(self.install_command());
        commands
    }

    /// Verify the base image, then probe and install all packages
    pub fn build(&self) -> Result<ReadyEnvironment> {
        let os = self.check_base_image()?;

        for package in &self.config.packages {
            validate_package_name(package)?;
        }
        if self.config.packages.is_empty() {
            tracing::info!("no system packages requested");
            return Ok(ReadyEnvironment {
                os,
                packages: Vec::new(),
            });
        }

        self.run_checked(&self.update_command())?;
        self.probe_packages()?;
        self.run_checked(&self.install_command())?;

        tracing::info!(packages = ?self.config.packages, "system packages installed");
        Ok(ReadyEnvironment {
            os,
            packages: self.config.packages.clone(),
        })
    }

    fn check_base_image(&self) -> Result<Option<OsRelease>> {
        let Some(ref image) = self.config.base_image else {
            return Ok(None);
        };
        let expected = BaseImage::parse(image);
        let Some(os) = OsRelease::load(&self.config.os_release) else {
            return Err(environment_error::base_image_mismatch(
                image,
                format!("unknown ({} unreadable)", self.config.os_release.display()),
            ));
        };
        if !expected.matches(&os) {
            return Err(environment_error::base_image_mismatch(image, os.describe()));
        }
        tracing::debug!(image = %image, "base image verified");
        Ok(Some(os))
    }

    fn probe_packages(&self) -> Result<()> {
        let mut missing = Vec::new();
        let mut exit_code = None;
        let mut output = String::new();
        for package in &self.config.packages {
            let spec = self.probe_command(package);
            let result = self.runner.run(&spec).map_err(|e| {
                environment_error::command_failed(spec.display_line(), None, e.to_string())
            })?;
            if !result.success() {
                tracing::warn!(package = %package, "package not available");
                missing.push(package.clone());
                exit_code = exit_code.or(result.exit_code);
                output.push_str(&result.combined());
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(environment_error::packages_unavailable(&missing, exit_code, output))
        }
    }

    fn run_checked(&self, spec: &CommandSpec) -> Result<()> {
        let output = self
            .runner
            .run(spec)
            .map_err(|e| environment_error::command_failed(spec.display_line(), None, e.to_string()))?;
        if output.success() {
            Ok(())
        } else {
            Err(environment_error::command_failed(
                spec.display_line(),
                output.exit_code,
                output.combined(),
            ))
        }
    }
}
