//! Default working locations
//!
//! The pipeline unpacks archives and writes the installer script into a work
//! directory. It must never end up relative to the current working directory
//! (e.g. when TMPDIR=tmp), so everything here is rooted at an absolute path.

use std::env;
use std::path::PathBuf;

/// Name of the work directory created under the temp base
const WORK_DIR_NAME: &str = "bundlecheck";

/// Returns a directory path suitable for creating temporary directories.
/// Never returns a relative path.
pub fn temp_dir_base() -> PathBuf {
    let t = env::temp_dir();
    if t.is_absolute() {
        t
    } else {
        PathBuf::from("/tmp")
    }
}

/// Default pipeline work directory
pub fn default_work_dir() -> PathBuf {
    temp_dir_base().join(WORK_DIR_NAME)
}
