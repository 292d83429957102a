//! Test fixtures and utilities for reducing test setup duplication.
//!
//! Provides a scripted [`FakeRunner`] standing in for real processes, a
//! [`FakeSource`] standing in for the installer download, and helpers that
//! build the archives the pipeline consumes.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_fixtures::{FakeRunner, create_temp_dir};
//!
//! let runner = FakeRunner::new().on("apt-get install --simulate ctags", 100, "E: Unable to locate package ctags");
//! assert!(runner.ran("apt-get update"));
//! ```

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;
use url::Url;

use crate::error::{Result, toolchain as toolchain_error};
use crate::process::{CommandOutput, CommandRunner, CommandSpec};
use crate::toolchain::InstallerSource;

/// Create a temp directory in the system temp location.
///
/// Uses `crate::temp::temp_dir_base()` to ensure temp dirs are never
/// created under the current working directory.
///
/// # Panics
///
/// Panics if the temp directory cannot be created.
#[must_use]
pub fn create_temp_dir() -> TempDir {
    TempDir::new_in(crate::temp::temp_dir_base()).expect("Failed to create temp directory")
}

/// Write a gzip-compressed tarball containing the given `(path, contents)` files.
///
/// # Panics
///
/// Panics if the archive cannot be written.
pub fn write_tar_gz(path: &Path, files: &[(&str, &str)]) {
    let file = File::create(path).expect("Failed to create archive");
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .expect("Failed to append archive entry");
    }
    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .expect("Failed to finish archive");
}

struct Rule {
    needle: String,
    output: CommandOutput,
    creates: Option<PathBuf>,
    spawn_error: bool,
}

/// Scripted stand-in for real processes
///
/// Commands succeed with empty output unless a rule whose needle is a
/// substring of the rendered command line says otherwise. Later rules win.
#[derive(Default)]
pub struct FakeRunner {
    rules: Vec<Rule>,
    calls: RefCell<Vec<CommandSpec>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to matching commands with `exit_code` and `stdout`
    pub fn on(mut self, needle: &str, exit_code: i32, stdout: &str) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            output: CommandOutput {
                exit_code: Some(exit_code),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
            creates: None,
            spawn_error: false,
        });
        self
    }

    /// Respond with a full output (stderr, signal termination)
    pub fn on_output(mut self, needle: &str, output: CommandOutput) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            output,
            creates: None,
            spawn_error: false,
        });
        self
    }

    /// Succeed and create `path` as a side effect (e.g. an installed binary)
    pub fn on_creates(mut self, needle: &str, path: impl Into<PathBuf>) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            output: CommandOutput {
                exit_code: Some(0),
                ..CommandOutput::default()
            },
            creates: Some(path.into()),
            spawn_error: false,
        });
        self
    }

    /// Fail to spawn matching commands
    pub fn on_spawn_error(mut self, needle: &str) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            output: CommandOutput::default(),
            creates: None,
            spawn_error: true,
        });
        self
    }

    /// Every command line run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(CommandSpec::display_line).collect()
    }

    /// The full spec of the first command containing `needle`
    pub fn call(&self, needle: &str) -> Option<CommandSpec> {
        self.calls
            .borrow()
            .iter()
            .find(|spec| spec.display_line().contains(needle))
            .cloned()
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.call(needle).is_some()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput> {
        self.calls.borrow_mut().push(spec.clone());
        let line = spec.display_line();
        let Some(rule) = self.rules.iter().rev().find(|r| line.contains(&r.needle)) else {
            return Ok(CommandOutput {
                exit_code: Some(0),
                ..CommandOutput::default()
            });
        };
        if rule.spawn_error {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{}: not found", spec.program.to_string_lossy()),
            ));
        }
        if let Some(ref path) = rule.creates {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, b"")?;
        }
        Ok(rule.output.clone())
    }
}

/// Stand-in for the installer download
pub struct FakeSource {
    body: Option<Vec<u8>>,
    fetches: Cell<usize>,
}

impl FakeSource {
    /// Serve `body` for every request
    pub fn serving(body: &[u8]) -> Self {
        Self {
            body: Some(body.to_vec()),
            fetches: Cell::new(0),
        }
    }

    /// Fail every request as a network error would
    pub fn failing() -> Self {
        Self {
            body: None,
            fetches: Cell::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }
}

impl InstallerSource for FakeSource {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        self.fetches.set(self.fetches.get() + 1);
        self.body
            .clone()
            .ok_or_else(|| toolchain_error::download_failed(url.as_str(), "connection refused"))
    }
}
