//! Pipeline steps and states

use std::fmt;

use serde::Serialize;

/// One of the four pipeline components, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Environment,
    Toolchain,
    Package,
    Setup,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Environment, Step::Toolchain, Step::Package, Step::Setup];

    pub fn description(self) -> &'static str {
        match self {
            Step::Environment => "Building environment",
            Step::Toolchain => "Installing toolchain",
            Step::Package => "Installing helper package",
            Step::Setup => "Running bundle setup",
        }
    }

    /// State reached when this step succeeds
    pub fn completed_state(self) -> PipelineState {
        match self {
            Step::Environment => PipelineState::EnvironmentReady,
            Step::Toolchain => PipelineState::ToolchainReady,
            Step::Package => PipelineState::PackageInstalled,
            Step::Setup => PipelineState::SetupComplete,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Environment => "environment",
            Step::Toolchain => "toolchain",
            Step::Package => "package",
            Step::Setup => "setup",
        };
        f.write_str(name)
    }
}

/// Where a pipeline run is
///
/// `SetupComplete` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    EnvironmentReady,
    ToolchainReady,
    PackageInstalled,
    SetupComplete,
    Failed(Step),
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::SetupComplete | PipelineState::Failed(_))
    }

    /// Step that runs from this state, if any
    pub fn next_step(self) -> Option<Step> {
        match self {
            PipelineState::Init => Some(Step::Environment),
            PipelineState::EnvironmentReady => Some(Step::Toolchain),
            PipelineState::ToolchainReady => Some(Step::Package),
            PipelineState::PackageInstalled => Some(Step::Setup),
            PipelineState::SetupComplete | PipelineState::Failed(_) => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Init => f.write_str("Init"),
            PipelineState::EnvironmentReady => f.write_str("EnvironmentReady"),
            PipelineState::ToolchainReady => f.write_str("ToolchainReady"),
            PipelineState::PackageInstalled => f.write_str("PackageInstalled"),
            PipelineState::SetupComplete => f.write_str("SetupComplete"),
            PipelineState::Failed(step) => write!(f, "Failed({step})"),
        }
    }
}
