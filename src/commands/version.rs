//! Version command implementation

use crate::error::Result;

/// Run version command
pub fn run() -> Result<()> {
    println!("bundlecheck {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Build info:");
    println!("  Rust version: {}", rustc_version());
    println!("  Profile: {}", build_profile());
    println!(
        "  Target: {}-{}",
        std::env::consts::ARCH,
        std::env::consts::OS
    );

    Ok(())
}

fn rustc_version() -> &'static str {
    // Minimum supported version declared in the manifest
    env!("CARGO_PKG_RUST_VERSION")
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}
