//! Machine-readable record of one pipeline run

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Serialize;

use crate::config::ProvisionConfig;
use crate::error::{Result, fs as fs_error};
use crate::hash;
use crate::pipeline::{PipelineRun, PipelineState, Step};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputDigest {
    pub path: PathBuf,
    /// `None` when the input could not be read
    pub blake3: Option<String>,
}

impl InputDigest {
    fn of_file(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            blake3: hash::hash_file(path).ok(),
        }
    }

    fn of_dir(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            blake3: hash::hash_directory(path).ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inputs {
    pub helper_archive: Option<InputDigest>,
    pub bundle_archive: Option<InputDigest>,
    pub assets: Option<InputDigest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub category: &'static str,
    /// Step the error belongs to; `None` for configuration and I/O errors
    pub step: Option<Step>,
    pub code: Option<String>,
    pub message: String,
    pub help: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainReport {
    pub cargo_home: PathBuf,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    pub name: Option<String>,
    pub version: Option<String>,
    pub binary: String,
    pub install_path: PathBuf,
}

/// JSON document written by `run --report`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub bundlecheck_version: String,
    pub state: PipelineState,
    pub history: Vec<PipelineState>,
    pub failed_step: Option<Step>,
    pub exit_code: i32,
    pub error: Option<ErrorReport>,
    pub inputs: Inputs,
    pub system_packages: Vec<String>,
    pub toolchain: Option<ToolchainReport>,
    pub package: Option<PackageReport>,
}

impl RunReport {
    pub fn new(config: &ProvisionConfig, run: &PipelineRun) -> Self {
        let error = run.error().map(|err| ErrorReport {
            category: err.category(),
            step: err.step(),
            code: err.code().map(|c| c.to_string()),
            message: err.to_string(),
            help: err.help().map(|h| h.to_string()),
        });

        Self {
            bundlecheck_version: env!("CARGO_PKG_VERSION").to_string(),
            state: run.state(),
            history: run.history.clone(),
            failed_step: run.failed_step(),
            exit_code: run.exit_code(),
            error,
            inputs: Inputs {
                helper_archive: config.package.archive.as_deref().map(InputDigest::of_file),
                bundle_archive: config.bundle.archive.as_deref().map(InputDigest::of_file),
                assets: config.assets.as_deref().map(InputDigest::of_dir),
            },
            system_packages: run
                .environment
                .as_ref()
                .map(|env| env.packages.clone())
                .unwrap_or_default(),
            toolchain: run.toolchain.as_ref().map(|env| ToolchainReport {
                cargo_home: env.cargo_home.clone(),
                version: env.version.clone(),
            }),
            package: run.package.as_ref().map(|pkg| PackageReport {
                name: pkg.name.clone(),
                version: pkg.version.clone(),
                binary: pkg.binary.clone(),
                install_path: pkg.install_path.clone(),
            }),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report, creating parent directories as needed
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| fs_error::write_failed(parent, e))?;
        }
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| fs_error::write_failed(path, e))?;
        tracing::info!(path = %path.display(), "run report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::ReadyEnvironment;
    use crate::error::{extraction, setup};
    use crate::setup::SetupResult;
    use crate::test_fixtures::create_temp_dir;

    fn failed_run() -> PipelineRun {
        PipelineRun {
            history: vec![
                PipelineState::Init,
                PipelineState::EnvironmentReady,
                PipelineState::ToolchainReady,
                PipelineState::Failed(Step::Package),
            ],
            environment: Some(ReadyEnvironment {
                os: None,
                packages: vec!["curl".to_string()],
            }),
            toolchain: None,
            package: None,
            outcome: Err(extraction::ambiguous_match(
                "kani-verifier-*",
                &["kani-verifier-0.38.0".to_string(), "kani-verifier-0.39.0".to_string()],
            )),
        }
    }

    #[test]
    fn test_report_of_failed_run() {
        let temp = create_temp_dir();
        let helper = temp.path().join("kani-verifier.crate");
        std::fs::write(&helper, b"crate bytes").unwrap();
        let mut config = ProvisionConfig::default();
        config.package.archive = Some(helper.clone());
        config.bundle.archive = Some(temp.path().join("missing.tar.gz"));

        let report = RunReport::new(&config, &failed_run());

        assert_eq!(report.state, PipelineState::Failed(Step::Package));
        assert_eq!(report.failed_step, Some(Step::Package));
        assert_eq!(report.exit_code, 1);
        let error = report.error.as_ref().unwrap();
        assert_eq!(
            error.code.as_deref(),
            Some("bundlecheck::extraction::ambiguous_match")
        );
        assert_eq!(error.category, "extraction");
        assert_eq!(error.step, Some(Step::Package));
        assert_eq!(report.system_packages, vec!["curl"]);

        let helper_digest = report.inputs.helper_archive.as_ref().unwrap();
        assert_eq!(
            helper_digest.blake3.as_deref(),
            Some(format!("blake3:{}", blake3::hash(b"crate bytes").to_hex()).as_str())
        );
        assert_eq!(report.inputs.bundle_archive.as_ref().unwrap().blake3, None);
        assert_eq!(report.inputs.assets, None);
    }

    #[test]
    fn test_report_json_shape() {
        let run = PipelineRun {
            history: vec![PipelineState::Init, PipelineState::Failed(Step::Setup)],
            environment: None,
            toolchain: None,
            package: None,
            outcome: Err(setup::invocation_failed("cargo-kani setup", Some(4), "")),
        };
        let report = RunReport::new(&ProvisionConfig::default(), &run);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["exit_code"], 4);
        assert_eq!(value["failed_step"], "setup");
        assert_eq!(value["state"]["state"], "failed");
        assert_eq!(value["history"][0]["state"], "init");
    }

    #[test]
    fn test_successful_run_has_no_error() {
        let run = PipelineRun {
            history: vec![PipelineState::Init, PipelineState::SetupComplete],
            environment: None,
            toolchain: None,
            package: None,
            outcome: Ok(SetupResult {
                command: "cargo-kani setup".to_string(),
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            }),
        };
        let report = RunReport::new(&ProvisionConfig::default(), &run);
        assert_eq!(report.exit_code, 0);
        assert!(report.error.is_none());
        assert!(report.failed_step.is_none());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp = create_temp_dir();
        let path = temp.path().join("reports/run.json");
        let report = RunReport::new(&ProvisionConfig::default(), &failed_run());

        report.write(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"failed_step\": \"package\""));
    }
}
