//! Core engine for mkdist
//!
//! - **config**: dist.toml parsing and validation
//! - **context**: checkout state and the immutable run context
//! - **error**: error types with contextual help messages
//! - **vcs**: git and mercurial adapters
//! - **version**: version resolution and release policy
//! - **files**: source set and distribution file resolution
//! - **hooks**: lifecycle hooks
//! - **build**: clean-then-build orchestration
//! - **stage**: staging tree assembly
//! - **substitute**: tag substitution over the staged tree
//! - **archive**: changelog expansion, test marker, tarball

pub mod archive;
pub mod build;
pub mod config;
pub mod context;
pub mod error;
pub mod files;
pub mod hooks;
pub mod stage;
pub mod substitute;
pub mod vcs;
pub mod version;
