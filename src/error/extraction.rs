//! Archive extraction and directory resolution errors

use super::ProvisionError;

/// Creates an extraction failure
pub fn failed(archive: impl Into<String>, reason: impl Into<String>) -> ProvisionError {
    ProvisionError::ExtractionFailed {
        archive: archive.into(),
        reason: reason.into(),
    }
}

/// Creates an invalid glob pattern error
pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> ProvisionError {
    ProvisionError::InvalidDirectoryPattern {
        pattern: pattern.into(),
        reason: reason.into(),
    }
}

/// Creates a "nothing matched" error
pub fn no_match(pattern: impl Into<String>, dir: impl Into<String>) -> ProvisionError {
    ProvisionError::NoMatchingDirectory {
        pattern: pattern.into(),
        dir: dir.into(),
    }
}

/// Creates an ambiguous install target error listing every candidate
pub fn ambiguous_match(pattern: impl Into<String>, matches: &[String]) -> ProvisionError {
    ProvisionError::AmbiguousDirectoryMatch {
        pattern: pattern.into(),
        count: matches.len(),
        matches: matches.join(", "),
    }
}
