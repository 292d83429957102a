//! Toolchain Installer errors

use super::ProvisionError;

/// Creates an insecure transport error
pub fn insecure_transport(url: impl Into<String>) -> ProvisionError {
    ProvisionError::InsecureTransport { url: url.into() }
}

/// Creates an installer download error
pub fn download_failed(url: impl Into<String>, reason: impl Into<String>) -> ProvisionError {
    ProvisionError::InstallerDownloadFailed {
        url: url.into(),
        reason: reason.into(),
    }
}

/// Creates a missing checksum error
pub fn checksum_missing(url: impl Into<String>) -> ProvisionError {
    ProvisionError::InstallerChecksumMissing { url: url.into() }
}

/// Creates a checksum mismatch error
pub fn checksum_mismatch(
    url: impl Into<String>,
    expected: impl Into<String>,
    actual: impl Into<String>,
) -> ProvisionError {
    ProvisionError::InstallerChecksumMismatch {
        url: url.into(),
        expected: expected.into(),
        actual: actual.into(),
    }
}

/// Creates a toolchain command failure
pub fn command_failed(
    command: impl Into<String>,
    exit_code: Option<i32>,
    output: impl Into<String>,
) -> ProvisionError {
    ProvisionError::ToolchainCommandFailed {
        command: command.into(),
        exit_code,
        output: output.into(),
    }
}
