//! Common test utilities for bundlecheck integration tests

use std::fs::File;
use std::path::PathBuf;

use assert_cmd::Command;
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

/// os-release of the reference base image
#[allow(dead_code)]
pub const UBUNTU_1804: &str =
    "NAME=\"Ubuntu\"\nID=ubuntu\nID_LIKE=debian\nVERSION_ID=\"18.04\"\n";

/// The real bundlecheck binary, isolated from the caller's BUNDLECHECK_* variables
// Temporary fix for deprecated cargo_bin - will be updated when build-dir issues are resolved
#[allow(deprecated)]
pub fn bundlecheck_cmd() -> Command {
    let mut cmd = Command::cargo_bin("bundlecheck").unwrap();
    for (key, _) in std::env::vars() {
        if key.starts_with("BUNDLECHECK_") {
            cmd.env_remove(key);
        }
    }
    cmd.env_remove("RUST_LOG");
    cmd
}

/// A scratch directory holding a run's inputs
pub struct TestWorkspace {
    /// Temporary directory
    #[allow(dead_code)]
    pub temp: TempDir,
    /// Path to workspace root
    pub path: PathBuf,
}

#[allow(dead_code)]
impl TestWorkspace {
    /// Create a new test workspace
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        Self { temp, path }
    }

    /// Write a file in workspace
    pub fn write_file(&self, path: &str, content: &str) -> PathBuf {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    /// Read a file from workspace
    pub fn read_file(&self, path: &str) -> String {
        let file_path = self.path.join(path);
        std::fs::read_to_string(&file_path).expect("Failed to read file")
    }

    /// Check if a file exists in workspace
    pub fn file_exists(&self, path: &str) -> bool {
        self.path.join(path).exists()
    }

    /// Write a gzip-compressed tarball with the given `(path, contents)` entries
    pub fn write_tar_gz(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let archive_path = self.path.join(name);
        let file = File::create(&archive_path).expect("Failed to create archive");
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (entry, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, entry, contents.as_bytes())
                .expect("Failed to append archive entry");
        }
        builder
            .into_inner()
            .and_then(GzEncoder::finish)
            .expect("Failed to finish archive");
        archive_path
    }

    /// Helper crate archive unpacking to the given top-level directories
    pub fn helper_archive(&self, dirs: &[&str]) -> PathBuf {
        let manifests: Vec<String> = dirs.iter().map(|d| format!("{d}/Cargo.toml")).collect();
        let files: Vec<(&str, &str)> = manifests
            .iter()
            .map(|m| (m.as_str(), "[package]\nname = \"kani-verifier\"\n"))
            .collect();
        self.write_tar_gz("kani-verifier.crate", &files)
    }

    /// Release bundle archive
    pub fn bundle_archive(&self) -> PathBuf {
        self.write_tar_gz(
            "kani-0.39.0-x86_64-unknown-linux-gnu.tar.gz",
            &[("kani-0.39.0/bin/kani-driver", "")],
        )
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
