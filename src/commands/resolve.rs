//! Resolve command implementation
//!
//! Runs only the extraction and single-directory resolution of the package
//! step, so an archive can be checked without provisioning anything.

use std::path::PathBuf;

use crate::archive::{Archive, split_name_version};
use crate::cli::ResolveArgs;
use crate::error::{Result, fs as fs_error};

/// Run resolve command
pub fn run(args: ResolveArgs) -> Result<()> {
    let resolved = resolve(&args)?;
    println!("{}", resolved.display());
    Ok(())
}

/// Extract and resolve, returning the directory name (or full path with `--into`)
pub fn resolve(args: &ResolveArgs) -> Result<PathBuf> {
    let archive = Archive::new(&args.archive, &args.pattern);

    let resolved = match args.into {
        Some(ref dest) => archive.extract_and_resolve(dest)?,
        None => {
            let scratch = tempfile::TempDir::new_in(crate::temp::temp_dir_base())
                .map_err(|e| fs_error::io_error(format!("Failed to create temp directory: {e}")))?;
            let dir = archive.extract_and_resolve(scratch.path())?;
            // The scratch directory goes away, so only the name is meaningful
            dir.file_name().map(PathBuf::from).unwrap_or(dir)
        }
    };

    if let Some((name, version)) = resolved
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(split_name_version)
    {
        tracing::info!(name, version, "resolved package directory");
    }
    Ok(resolved)
}
