//! Package Installer
//!
//! Unpacks the helper package archive, resolves its single versioned source
//! directory and installs it with the toolchain's `cargo install`.

use std::path::{Path, PathBuf};

use crate::archive::{Archive, split_name_version};
use crate::config::PackageConfig;
use crate::error::{Result, config as config_error, fs as fs_error, package as package_error};
use crate::process::{CommandRunner, CommandSpec};
use crate::toolchain::ToolchainEnv;

/// Directory under the work dir the helper archive is unpacked into
pub const PACKAGE_DIR_NAME: &str = "package";

/// A helper package installed into the toolchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    /// Source directory the package was installed from
    pub source_dir: PathBuf,
    pub name: Option<String>,
    pub version: Option<String>,
    pub binary: String,
    /// Absolute path of the installed binary
    pub install_path: PathBuf,
}

pub struct PackageInstaller<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a PackageConfig,
    work_dir: &'a Path,
}

impl<'a> PackageInstaller<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        config: &'a PackageConfig,
        work_dir: &'a Path,
    ) -> Self {
        Self {
            runner,
            config,
            work_dir,
        }
    }

    fn extract_dir(&self) -> PathBuf {
        self.work_dir.join(PACKAGE_DIR_NAME)
    }

    fn archive(&self) -> Result<Archive> {
        let path = self
            .config
            .archive
            .as_ref()
            .ok_or_else(|| config_error::invalid("package.archive is required (--helper-archive)"))?;
        Ok(Archive::new(path, &self.config.dir_pattern))
    }

    fn install_command(&self, env: &ToolchainEnv, source_dir: &Path) -> CommandSpec {
        env.apply(
            CommandSpec::new(env.cargo())
                .args(["install", "--path"])
                .arg(source_dir)
                .args(&self.config.install_args),
        )
    }

    /// Command [`install`](Self::install) runs, with the unresolved directory as a glob
    pub fn plan(&self, env: &ToolchainEnv) -> Vec<CommandSpec> {
        let glob = crate::archive::template_to_glob(&self.config.dir_pattern);
        vec![self.install_command(env, &self.extract_dir().join(glob))]
    }

    /// Extract the archive, resolve the package directory and install it
    ///
    /// Nothing is installed unless exactly one extracted directory matches.
    pub fn install(&self, env: &ToolchainEnv) -> Result<InstalledPackage> {
        let archive = self.archive()?;
        let dest = self.extract_dir();
        // Leftovers from an earlier run would make the match ambiguous
        if dest.exists() {
            std::fs::remove_dir_all(&dest).map_err(|e| fs_error::write_failed(&dest, e))?;
        }

        let source_dir = archive.extract_and_resolve(&dest)?;
        tracing::info!(dir = %source_dir.display(), "resolved package directory");

        let spec = self.install_command(env, &source_dir);
        let output = self.runner.run(&spec).map_err(|e| {
            package_error::install_failed(source_dir.display().to_string(), None, e.to_string())
        })?;
        if !output.success() {
            return Err(package_error::install_failed(
                source_dir.display().to_string(),
                output.exit_code,
                output.combined(),
            ));
        }

        let install_path = env.binary(&self.config.binary);
        if !install_path.is_file() {
            return Err(package_error::binary_not_found(
                install_path.display().to_string(),
            ));
        }

        let dir_name = source_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (name, version) = match split_name_version(&dir_name) {
            Some((name, version)) => (Some(name.to_string()), Some(version.to_string())),
            None => (None, None),
        };
        tracing::info!(
            binary = %install_path.display(),
            version = version.as_deref().unwrap_or("unknown"),
            "package installed"
        );

        Ok(InstalledPackage {
            source_dir,
            name,
            version,
            binary: self.config.binary.clone(),
            install_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProvisionError;
    use crate::test_fixtures::{FakeRunner, create_temp_dir, write_tar_gz};

    fn env_in(dir: &Path) -> ToolchainEnv {
        ToolchainEnv::new(dir.join("cargo"), None, None).unwrap()
    }

    fn config_for(archive: PathBuf) -> PackageConfig {
        PackageConfig {
            archive: Some(archive),
            ..PackageConfig::default()
        }
    }

    fn helper_archive(dir: &Path, top_dirs: &[&str]) -> PathBuf {
        let path = dir.join("kani-verifier.crate");
        let manifests: Vec<String> = top_dirs.iter().map(|d| format!("{d}/Cargo.toml")).collect();
        let files: Vec<(&str, &str)> = manifests
            .iter()
            .map(|m| (m.as_str(), "[package]\n"))
            .collect();
        write_tar_gz(&path, &files);
        path
    }

    #[test]
    fn test_install_resolved_directory() {
        let temp = create_temp_dir();
        let work = temp.path().join("work");
        let env = env_in(temp.path());
        let config = config_for(helper_archive(temp.path(), &["kani-verifier-0.39.0"]));
        let runner = FakeRunner::new().on_creates("install --path", env.binary("cargo-kani"));

        let installed = PackageInstaller::new(&runner, &config, &work)
            .install(&env)
            .unwrap();

        let source_dir = work.join(PACKAGE_DIR_NAME).join("kani-verifier-0.39.0");
        assert_eq!(installed.source_dir, source_dir);
        assert_eq!(installed.name.as_deref(), Some("kani-verifier"));
        assert_eq!(installed.version.as_deref(), Some("0.39.0"));
        assert_eq!(installed.install_path, env.binary("cargo-kani"));

        let call = runner.call("install --path").unwrap();
        assert_eq!(call.program, env.cargo().into_os_string());
        assert_eq!(call.args.last(), Some(&source_dir.into_os_string()));
        assert_eq!(call.env.get("CARGO_HOME"), Some(&env.cargo_home.clone().into_os_string()));
    }

    #[test]
    fn test_ambiguous_archive_installs_nothing() {
        let temp = create_temp_dir();
        let env = env_in(temp.path());
        let config = config_for(helper_archive(
            temp.path(),
            &["kani-verifier-0.38.0", "kani-verifier-0.39.0"],
        ));
        let runner = FakeRunner::new();

        let err = PackageInstaller::new(&runner, &config, temp.path())
            .install(&env)
            .unwrap_err();
        assert!(matches!(err, ProvisionError::AmbiguousDirectoryMatch { count: 2, .. }));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_no_match_installs_nothing() {
        let temp = create_temp_dir();
        let env = env_in(temp.path());
        let config = config_for(helper_archive(temp.path(), &["other-tool-1.0.0"]));
        let runner = FakeRunner::new();

        let err = PackageInstaller::new(&runner, &config, temp.path())
            .install(&env)
            .unwrap_err();
        assert!(matches!(err, ProvisionError::NoMatchingDirectory { .. }));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_stale_extraction_is_cleared() {
        let temp = create_temp_dir();
        let env = env_in(temp.path());
        std::fs::create_dir_all(temp.path().join(PACKAGE_DIR_NAME).join("kani-verifier-0.38.0"))
            .unwrap();
        let config = config_for(helper_archive(temp.path(), &["kani-verifier-0.39.0"]));
        let runner = FakeRunner::new().on_creates("install --path", env.binary("cargo-kani"));

        let installed = PackageInstaller::new(&runner, &config, temp.path())
            .install(&env)
            .unwrap();
        assert_eq!(installed.version.as_deref(), Some("0.39.0"));
    }

    #[test]
    fn test_cargo_failure_propagates_exit_code() {
        let temp = create_temp_dir();
        let env = env_in(temp.path());
        let config = config_for(helper_archive(temp.path(), &["kani-verifier-0.39.0"]));
        let runner = FakeRunner::new().on("install --path", 101, "error: failed to compile");

        let err = PackageInstaller::new(&runner, &config, temp.path())
            .install(&env)
            .unwrap_err();
        assert!(matches!(err, ProvisionError::PackageInstallFailed { .. }));
        assert_eq!(err.exit_code(), 101);
        assert_eq!(err.tool_output(), Some("error: failed to compile"));
    }

    #[test]
    fn test_missing_binary_after_install() {
        let temp = create_temp_dir();
        let env = env_in(temp.path());
        let config = config_for(helper_archive(temp.path(), &["kani-verifier-0.39.0"]));
        let runner = FakeRunner::new();

        let err = PackageInstaller::new(&runner, &config, temp.path())
            .install(&env)
            .unwrap_err();
        assert!(matches!(err, ProvisionError::BinaryNotFound { .. }));
    }

    #[test]
    fn test_install_args_are_appended() {
        let temp = create_temp_dir();
        let env = env_in(temp.path());
        let config = PackageConfig {
            install_args: vec!["--locked".to_string()],
            ..config_for(helper_archive(temp.path(), &["kani-verifier-0.39.0"]))
        };
        let runner = FakeRunner::new().on_creates("install --path", env.binary("cargo-kani"));

        PackageInstaller::new(&runner, &config, temp.path())
            .install(&env)
            .unwrap();
        assert!(runner.calls()[0].ends_with("kani-verifier-0.39.0 --locked"));
    }

    #[test]
    fn test_plan_shows_directory_glob() {
        let temp = create_temp_dir();
        let env = env_in(temp.path());
        let config = config_for(temp.path().join("kani-verifier.crate"));

        let plan = PackageInstaller::new(&FakeRunner::new(), &config, temp.path()).plan(&env);
        assert_eq!(plan.len(), 1);
        assert!(plan[0].display_line().ends_with("package/kani-verifier-*"));
    }
}
