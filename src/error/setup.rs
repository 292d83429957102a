//! Bundle Setup Runner errors

use super::ProvisionError;

/// Creates a missing bundle archive error
pub fn bundle_missing(path: impl Into<String>) -> ProvisionError {
    ProvisionError::BundleArchiveMissing { path: path.into() }
}

/// Creates a setup invocation failure carrying the tool's exit code and output
pub fn invocation_failed(
    command: impl Into<String>,
    exit_code: Option<i32>,
    output: impl Into<String>,
) -> ProvisionError {
    ProvisionError::SetupInvocationFailed {
        command: command.into(),
        exit_code,
        output: output.into(),
    }
}
