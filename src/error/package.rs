//! Package Installer errors

use super::ProvisionError;

/// Creates a package install failure
pub fn install_failed(
    path: impl Into<String>,
    exit_code: Option<i32>,
    output: impl Into<String>,
) -> ProvisionError {
    ProvisionError::PackageInstallFailed {
        path: path.into(),
        exit_code,
        output: output.into(),
    }
}

/// Creates a missing binary error
pub fn binary_not_found(path: impl Into<String>) -> ProvisionError {
    ProvisionError::BinaryNotFound { path: path.into() }
}
