//! Bundle Setup Runner
//!
//! Hands the bundle under test to the installed helper's setup command and
//! reports the result. The helper's exit code is the verdict.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::BundleConfig;
use crate::error::{Result, config as config_error, fs as fs_error, setup as setup_error};
use crate::package::InstalledPackage;
use crate::process::{CommandRunner, CommandSpec};
use crate::toolchain::ToolchainEnv;

/// Directory under the work dir test assets are copied to
pub const ASSETS_DIR_NAME: &str = "tests";

/// Outcome of a setup invocation that exited successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupResult {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl SetupResult {
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// Copy `src` into `dst`, creating directories as needed
///
/// Symlinks are followed; existing files in `dst` are overwritten.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| fs_error::read_failed(src, e))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| fs_error::read_failed(entry.path(), e))?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| fs_error::write_failed(&target, e))?;
        } else {
            std::fs::copy(entry.path(), &target)
                .map_err(|e| fs_error::write_failed(&target, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

pub struct BundleSetupRunner<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a BundleConfig,
    assets: Option<&'a Path>,
    work_dir: &'a Path,
}

impl<'a> BundleSetupRunner<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        config: &'a BundleConfig,
        assets: Option<&'a Path>,
        work_dir: &'a Path,
    ) -> Self {
        Self {
            runner,
            config,
            assets,
            work_dir,
        }
    }

    fn bundle(&self) -> Result<&PathBuf> {
        self.config
            .archive
            .as_ref()
            .ok_or_else(|| config_error::invalid("bundle.archive is required (--bundle-archive)"))
    }

    fn setup_command(&self, env: &ToolchainEnv, binary: &Path, bundle: &Path) -> CommandSpec {
        env.apply(
            CommandSpec::new(binary)
                .args(&self.config.setup_args)
                .arg(bundle)
                .current_dir(self.work_dir),
        )
    }

    /// Command [`run`](Self::run) executes for a binary at `binary`
    pub fn plan(&self, env: &ToolchainEnv, binary: &Path) -> Vec<CommandSpec> {
        match self.config.archive {
            Some(ref bundle) => vec![self.setup_command(env, binary, bundle)],
            None => Vec::new(),
        }
    }

    /// Stage the assets and run the setup command against the bundle
    pub fn run(&self, env: &ToolchainEnv, package: &InstalledPackage) -> Result<SetupResult> {
        let bundle = self.bundle()?;
        if !bundle.is_file() {
            return Err(setup_error::bundle_missing(bundle.display().to_string()));
        }

        std::fs::create_dir_all(self.work_dir)
            .map_err(|e| fs_error::write_failed(self.work_dir, e))?;
        if let Some(assets) = self.assets {
            let target = self.work_dir.join(ASSETS_DIR_NAME);
            let copied = copy_tree(assets, &target)?;
            tracing::debug!(from = %assets.display(), files = copied, "test assets staged");
        }

        let spec = self.setup_command(env, &package.install_path, bundle);
        let command = spec.display_line();
        tracing::info!(command = %command, "running bundle setup");

        let output = self
            .runner
            .run(&spec)
            .map_err(|e| setup_error::invocation_failed(&command, None, e.to_string()))?;
        match output.exit_code {
            Some(0) => Ok(SetupResult {
                command,
                exit_code: 0,
                stdout: output.stdout,
                stderr: output.stderr,
            }),
            code => Err(setup_error::invocation_failed(
                command,
                code,
                output.combined(),
            )),
        }
    }
}
