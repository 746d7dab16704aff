//! CLI commands for mkdist
//!
//! - **dist**: resolve, build, stage, substitute and pack a release tarball
//! - **plan**: report what a run would package without touching anything
//! - **version_bin**: print the packed `0xMMmmpp` version literal

pub mod dist;
pub mod plan;
pub mod version_bin;

pub use dist::{DistOptions, run_dist};
pub use plan::run_plan;
pub use version_bin::run_version_bin;
