//! Command-line usage errors

use super::ProvisionError;

/// Creates an unsupported shell error
pub fn unsupported_shell(shell: impl Into<String>) -> ProvisionError {
    ProvisionError::UnsupportedShell {
        shell: shell.into(),
    }
}
