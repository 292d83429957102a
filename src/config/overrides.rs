//! Command-line and environment overrides for [`ProvisionConfig`]

use std::path::{Path, PathBuf};

use super::ProvisionConfig;

/// Values given on the command line (or via `BUNDLECHECK_*` variables)
///
/// `None` / empty means "keep what the file or the defaults say".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub helper_archive: Option<PathBuf>,
    pub bundle_archive: Option<PathBuf>,
    pub assets: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub base_image: Option<String>,
    pub packages: Vec<String>,
    pub installer_url: Option<String>,
    pub installer_sha256: Option<String>,
    pub allow_unverified_installer: bool,
    pub dir_pattern: Option<String>,
    pub binary: Option<String>,
}

impl ConfigOverrides {
    /// Make relative paths absolute against `base` (normally the current directory)
    pub fn relative_to(mut self, base: &Path) -> Self {
        for path in [
            &mut self.helper_archive,
            &mut self.bundle_archive,
            &mut self.assets,
            &mut self.work_dir,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = dunce::simplified(&base.join(&*path)).to_path_buf();
            }
        }
        self
    }

    pub(super) fn apply_to(self, config: &mut ProvisionConfig) {
        if let Some(path) = self.helper_archive {
            config.package.archive = Some(path);
        }
        if let Some(path) = self.bundle_archive {
            config.bundle.archive = Some(path);
        }
        if let Some(path) = self.assets {
            config.assets = Some(path);
        }
        if let Some(path) = self.work_dir {
            config.work_dir = path;
        }
        if let Some(image) = self.base_image {
            // "any" disables the base image check from the command line
            config.environment.base_image = (image != "any").then_some(image);
        }
        if !self.packages.is_empty() {
            config.environment.packages = self.packages;
        }
        if let Some(url) = self.installer_url {
            config.toolchain.installer_url = url;
        }
        if let Some(sha) = self.installer_sha256 {
            config.toolchain.installer_sha256 = Some(sha.to_ascii_lowercase());
        }
        if self.allow_unverified_installer {
            config.toolchain.allow_unverified_installer = true;
        }
        if let Some(pattern) = self.dir_pattern {
            config.package.dir_pattern = pattern;
        }
        if let Some(binary) = self.binary {
            config.package.binary = binary;
        }
    }
}
