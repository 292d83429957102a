//! Command implementations for the bundlecheck CLI

pub mod completions;
pub mod resolve;
pub mod run;
pub mod version;
