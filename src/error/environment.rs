//! Environment Builder errors

use super::ProvisionError;

/// Creates a base image mismatch error
pub fn base_image_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> ProvisionError {
    ProvisionError::BaseImageMismatch {
        expected: expected.into(),
        actual: actual.into(),
    }
}

/// Creates an invalid package name error
pub fn invalid_package_name(name: impl Into<String>) -> ProvisionError {
    ProvisionError::InvalidPackageName { name: name.into() }
}

/// Creates an error naming every package missing from the index
pub fn packages_unavailable(
    packages: &[String],
    exit_code: Option<i32>,
    output: impl Into<String>,
) -> ProvisionError {
    ProvisionError::PackagesUnavailable {
        packages: packages.join(", "),
        exit_code,
        output: output.into(),
    }
}

/// Creates a package-manager command failure
pub fn command_failed(
    command: impl Into<String>,
    exit_code: Option<i32>,
    output: impl Into<String>,
) -> ProvisionError {
    ProvisionError::EnvironmentCommandFailed {
        command: command.into(),
        exit_code,
        output: output.into(),
    }
}
