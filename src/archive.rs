//! Archive extraction and versioned directory resolution
//!
//! Helper packages ship as gzip-compressed tarballs (a `.crate` file is one)
//! that unpack to a single `name-version/` directory whose version is not
//! known in advance. [`resolve_single_match`] turns "find that directory"
//! into a checked precondition: exactly one match or an error.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive as TarArchive;
use wax::{CandidatePath, Glob, Pattern};

use crate::error::{Result, extraction as extraction_error, fs as fs_error};

/// Placeholder for the unknown version in a directory template
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// A compressed bundle on disk plus the directory it is expected to unpack to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub path: PathBuf,
    /// Directory name template, e.g. `kani-verifier-{version}`, or a plain glob
    pub dir_pattern: String,
}

impl Archive {
    pub fn new(path: impl Into<PathBuf>, dir_pattern: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            dir_pattern: dir_pattern.into(),
        }
    }

    /// Glob derived from the directory template
    pub fn glob(&self) -> String {
        template_to_glob(&self.dir_pattern)
    }

    /// Extract into `dest` and resolve the one directory matching the template
    pub fn extract_and_resolve(&self, dest: &Path) -> Result<PathBuf> {
        extract(&self.path, dest)?;
        resolve_single_match(dest, &self.glob())
    }
}

/// Convert a version template into a glob
///
/// `kani-verifier-{version}` becomes `kani-verifier-*`. Strings without the
/// placeholder are returned unchanged and treated as globs already.
pub fn template_to_glob(template: &str) -> String {
    template.replace(VERSION_PLACEHOLDER, "*")
}

/// Unpack a gzip-compressed tar archive into `dest`
///
/// `dest` is created if missing. Ownership is not restored, and entries that
/// would land outside `dest` make the extraction fail.
pub fn extract(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)
        .map_err(|e| extraction_error::failed(archive.display().to_string(), e.to_string()))?;
    fs::create_dir_all(dest).map_err(|e| fs_error::write_failed(dest, e))?;

    let mut tar = TarArchive::new(GzDecoder::new(file));
    tar.set_preserve_ownerships(false);
    tar.set_overwrite(true);

    tracing::debug!(archive = %archive.display(), dest = %dest.display(), "extracting");

    let entries = tar
        .entries()
        .map_err(|e| extraction_error::failed(archive.display().to_string(), e.to_string()))?;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| extraction_error::failed(archive.display().to_string(), e.to_string()))?;
        // unpack_in reports false for entries with `..` components
        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| extraction_error::failed(archive.display().to_string(), e.to_string()))?;
        if !unpacked {
            let name = entry
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "<unreadable path>".to_string());
            return Err(extraction_error::failed(
                archive.display().to_string(),
                format!("entry escapes the destination directory: {name}"),
            ));
        }
    }

    Ok(())
}

/// Resolve exactly one top-level directory in `dir` whose name matches `pattern`
///
/// Zero matches and more than one match are both errors. Plain files never
/// match.
pub fn resolve_single_match(dir: &Path, pattern: &str) -> Result<PathBuf> {
    let glob =
        Glob::new(pattern).map_err(|e| extraction_error::invalid_pattern(pattern, e.to_string()))?;

    let entries = fs::read_dir(dir).map_err(|e| fs_error::read_failed(dir, e))?;
    let mut matches: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| fs_error::read_failed(dir, e))?;
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if glob.matched(&CandidatePath::from(name.as_ref())).is_some() {
            matches.push(entry.path());
        }
    }
    matches.sort();

    match matches.len() {
        0 => Err(extraction_error::no_match(pattern, dir.display().to_string())),
        1 => Ok(matches.remove(0)),
        _ => {
            let names: Vec<String> = matches
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            Err(extraction_error::ambiguous_match(pattern, &names))
        }
    }
}

/// Split a `name-version` directory name at its last `-`
///
/// Returns `None` when there is no dash or the version part does not start
/// with a digit.
pub fn split_name_version(dir_name: &str) -> Option<(&str, &str)> {
    let (name, version) = dir_name.rsplit_once('-')?;
    if name.is_empty() || !version.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some((name, version))
}
