//! Provisioning pipeline
//!
//! Runs the four steps in a fixed order (environment, toolchain, package,
//! setup), stopping at the first failure. Each step's output is the next
//! step's input; nothing is shared through the process environment.

mod state;


use std::path::Path;

pub use state::{PipelineState, Step};

use crate::config::ProvisionConfig;
use crate::environment::{EnvironmentBuilder, ReadyEnvironment};
use crate::error::{ProvisionError, Result};
use crate::package::{InstalledPackage, PackageInstaller};
use crate::process::{CommandRunner, CommandSpec};
use crate::setup::{BundleSetupRunner, SetupResult};
use crate::toolchain::{InstallerSource, ToolchainEnv, ToolchainInstaller};
use crate::ui::StepReporter;

/// Commands one step would run
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub step: Step,
    /// Remote resource fetched before the commands run
    pub download: Option<String>,
    pub commands: Vec<CommandSpec>,
}

/// Everything one pipeline run produced
#[derive(Debug)]
pub struct PipelineRun {
    pub history: Vec<PipelineState>,
    pub environment: Option<ReadyEnvironment>,
    pub toolchain: Option<ToolchainEnv>,
    pub package: Option<InstalledPackage>,
    pub outcome: Result<SetupResult>,
}

/// What a run has produced so far
#[derive(Default)]
struct Trace {
    history: Vec<PipelineState>,
    environment: Option<ReadyEnvironment>,
    toolchain: Option<ToolchainEnv>,
    package: Option<InstalledPackage>,
}

impl Trace {
    fn transition(&mut self, next: PipelineState) {
        let from = self.history.last().copied().unwrap_or(PipelineState::Init);
        debug_assert!(!from.is_terminal(), "transition out of terminal state {from}");
        tracing::debug!(from = %from, to = %next, "pipeline transition");
        self.history.push(next);
    }
}

impl PipelineRun {
    /// Current (after a run: final) state
    pub fn state(&self) -> PipelineState {
        self.history
            .last()
            .copied()
            .unwrap_or(PipelineState::Init)
    }

    pub fn failed_step(&self) -> Option<Step> {
        match self.state() {
            PipelineState::Failed(step) => Some(step),
            _ => None,
        }
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            Ok(ref result) => result.exit_code,
            Err(ref err) => err.exit_code(),
        }
    }

    pub fn error(&self) -> Option<&ProvisionError> {
        self.outcome.as_ref().err()
    }
}

/// The provisioning pipeline for one configuration
pub struct Pipeline<'a> {
    runner: &'a dyn CommandRunner,
    source: &'a dyn InstallerSource,
    config: &'a ProvisionConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        source: &'a dyn InstallerSource,
        config: &'a ProvisionConfig,
    ) -> Self {
        Self {
            runner,
            source,
            config,
        }
    }

    fn work_dir(&self) -> &Path {
        &self.config.work_dir
    }

    /// Every command a successful run would execute, in order
    pub fn plan(&self) -> Result<Vec<PlannedStep>> {
        let toolchain_env = ToolchainEnv::from_config(&self.config.toolchain)?;
        let environment = EnvironmentBuilder::new(self.runner, &self.config.environment);
        let toolchain = ToolchainInstaller::new(
            self.runner,
            self.source,
            &self.config.toolchain,
            self.work_dir(),
        );
        let package = PackageInstaller::new(self.runner, &self.config.package, self.work_dir());
        let setup = BundleSetupRunner::new(
            self.runner,
            &self.config.bundle,
            self.config.assets.as_deref(),
            self.work_dir(),
        );
        let binary = toolchain_env.binary(&self.config.package.binary);

        Ok(vec![
            PlannedStep {
                step: Step::Environment,
                download: None,
                commands: environment.plan(),
            },
            PlannedStep {
                step: Step::Toolchain,
                download: Some(self.config.toolchain.installer_url.clone()),
                commands: toolchain.plan(&toolchain_env),
            },
            PlannedStep {
                step: Step::Package,
                download: None,
                commands: package.plan(&toolchain_env),
            },
            PlannedStep {
                step: Step::Setup,
                download: None,
                commands: setup.plan(&toolchain_env, &binary),
            },
        ])
    }

    /// Run all steps, stopping at the first failure
    pub fn run(&self, reporter: &mut dyn StepReporter) -> PipelineRun {
        let mut trace = Trace {
            history: vec![PipelineState::Init],
            ..Trace::default()
        };
        let outcome = self.drive(&mut trace, reporter);
        reporter.finish();

        let run = PipelineRun {
            history: trace.history,
            environment: trace.environment,
            toolchain: trace.toolchain,
            package: trace.package,
            outcome,
        };
        match run.outcome {
            Ok(_) => tracing::info!("pipeline complete"),
            Err(ref err) => tracing::error!(state = %run.state(), error = %err, "pipeline failed"),
        }
        run
    }

    fn drive(&self, trace: &mut Trace, reporter: &mut dyn StepReporter) -> Result<SetupResult> {
        let environment = run_step(trace, reporter, Step::Environment, || {
            EnvironmentBuilder::new(self.runner, &self.config.environment).build()
        })?;
        trace.environment = Some(environment);

        let toolchain = run_step(trace, reporter, Step::Toolchain, || {
            let env = ToolchainEnv::from_config(&self.config.toolchain)?;
            ToolchainInstaller::new(
                self.runner,
                self.source,
                &self.config.toolchain,
                self.work_dir(),
            )
            .install(env)
        })?;
        trace.toolchain = Some(toolchain.clone());

        let package = run_step(trace, reporter, Step::Package, || {
            PackageInstaller::new(self.runner, &self.config.package, self.work_dir())
                .install(&toolchain)
        })?;
        trace.package = Some(package.clone());

        run_step(trace, reporter, Step::Setup, || {
            BundleSetupRunner::new(
                self.runner,
                &self.config.bundle,
                self.config.assets.as_deref(),
                self.work_dir(),
            )
            .run(&toolchain, &package)
        })
    }
}

/// Run one step and record the transition it causes
fn run_step<T>(
    trace: &mut Trace,
    reporter: &mut dyn StepReporter,
    step: Step,
    body: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let _span = tracing::info_span!("step", step = %step).entered();
    reporter.start_step(step);
    match body() {
        Ok(value) => {
            reporter.finish_step(step);
            trace.transition(step.completed_state());
            Ok(value)
        }
        Err(err) => {
            reporter.fail_step(step, &err.to_string());
            trace.transition(PipelineState::Failed(step));
            Err(err)
        }
    }
}
