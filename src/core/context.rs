//! Run context - resolve once, pass everywhere
//!
//! ```text
//! main.rs:
//!   Checkout::open(root)            vcs + dist.toml + file lists + repo ref
//!   version::resolve(..)            effective version, policy enforced
//!   RunContext::new(checkout, v)    immutable for the rest of the run
//!   |
//!   v
//! build / stage / substitute / archive:
//!   fn step(ctx: &RunContext, ..)
//! ```

use crate::core::config::DistConfig;
use crate::core::error::DistResult;
use crate::core::files::{self, StagedFile};
use crate::core::vcs::{self, RepositoryRef, Vcs};
use crate::core::version::{DEFAULT_VERSION_BIN, ResolvedVersion, version_bin};
use std::path::{Path, PathBuf};

/// Suffix appended to the tarball name of test builds
pub const TEST_SUFFIX: &str = "-test";

/// Repository state gathered before the version is known
pub struct Checkout {
  /// Repository root (absolute)
  pub root: PathBuf,
  pub vcs: Box<dyn Vcs>,
  pub config: DistConfig,
  pub package: String,
  /// Tracked files, in VCS order
  pub tracked: Vec<String>,
  /// Configured or auto-discovered source directories
  pub srcdirs: Vec<String>,
  pub distfiles: Vec<StagedFile>,
  pub changelog: StagedFile,
  pub repo: RepositoryRef,
}

impl Checkout {
  /// Detect the VCS, load dist.toml and resolve the distribution file list
  ///
  /// Fails when there is no repository, no config or no Changelog among the
  /// distribution files.
  pub fn open(root: &Path) -> DistResult<Self> {
    let vcs = vcs::detect(root)?;
    let config = DistConfig::load(root)?;
    let package = config.package_name(root)?;
    let tracked = vcs.tracked_files()?;

    let srcdirs = config
      .srcdirs
      .clone()
      .unwrap_or_else(|| files::discover_srcdirs(&tracked));

    let distfiles = match config.distfiles {
      Some(ref patterns) => files::resolve_explicit_distfiles(root, patterns)?,
      None => {
        let exclude = files::compile_exclude("excludedist", config.excludedist.as_deref())?;
        files::discover_distfiles(&tracked, exclude.as_ref())?
      }
    };
    let changelog = files::find_changelog(&distfiles)?.clone();

    let repo = RepositoryRef::resolve(vcs.as_ref())?;

    Ok(Self {
      root: vcs.root().to_path_buf(),
      vcs,
      config,
      package,
      tracked,
      srcdirs,
      distfiles,
      changelog,
      repo,
    })
  }

  /// Changelog path in the checkout
  pub fn changelog_path(&self) -> PathBuf {
    self.root.join(&self.changelog.origin)
  }

  /// Resolve the source set (including generated companions and aux sources)
  ///
  /// Call after the build so generated files are on disk.
  pub fn resolve_sources(&self) -> DistResult<Vec<StagedFile>> {
    let exclude = files::compile_exclude("excludesrc", self.config.excludesrc.as_deref())?;
    let mut sources = files::resolve_sources(&self.root, &self.tracked, &self.srcdirs, exclude.as_ref());
    sources.extend(files::resolve_aux_sources(&self.root, &self.config.auxsources)?);
    Ok(sources)
  }
}

/// Immutable facts about one packaging run
#[derive(Debug, Clone)]
pub struct RunContext {
  /// Repository root; also where the tarball is written
  pub root: PathBuf,
  pub config: DistConfig,
  pub package: String,
  pub repo: RepositoryRef,
  pub version: ResolvedVersion,
  pub version_bin: String,
}

impl RunContext {
  pub fn new(checkout: &Checkout, version: ResolvedVersion) -> Self {
    let version_bin = version_bin(&version.version, DEFAULT_VERSION_BIN);
    Self {
      root: checkout.root.clone(),
      config: checkout.config.clone(),
      package: checkout.package.clone(),
      repo: checkout.repo.clone(),
      version,
      version_bin,
    }
  }

  /// Test builds get a disclaimer file and a `-test` tarball suffix
  pub fn is_test_build(&self) -> bool {
    self.version.is_test_build()
  }

  /// `<package>-<version>`: staging root and top-level tarball directory
  pub fn dist_name(&self) -> String {
    format!("{}-{}", self.package, self.version.version)
  }

  /// `<package>-<version>[-test].tar.bz2`
  pub fn archive_name(&self) -> String {
    let suffix = if self.is_test_build() { TEST_SUFFIX } else { "" };
    format!("{}{}.tar.bz2", self.dist_name(), suffix)
  }

  /// Substitute `{package}`, `{version}` and `{version_bin}` in `text`
  ///
  /// Single pass: `{{` and `}}` stand for literal braces, unknown names are
  /// kept as written, and substituted values are never expanded again.
  pub fn expand_placeholders(&self, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find(['{', '}']) {
      out.push_str(&rest[..idx]);
      rest = &rest[idx..];

      if let Some(tail) = rest.strip_prefix("{{") {
        out.push('{');
        rest = tail;
        continue;
      }
      if let Some(tail) = rest.strip_prefix("}}") {
        out.push('}');
        rest = tail;
        continue;
      }

      let value = [
        ("{package}", self.package.as_str()),
        ("{version}", self.version.version.as_str()),
        ("{version_bin}", self.version_bin.as_str()),
      ]
      .into_iter()
      .find(|(name, _)| rest.starts_with(*name));
      match value {
        Some((name, value)) => {
          out.push_str(value);
          rest = &rest[name.len()..];
        }
        None => {
          out.push_str(&rest[..1]);
          rest = &rest[1..];
        }
      }
    }
    out.push_str(rest);
    out
  }

  /// Environment handed to shell hooks
  pub fn hook_env(&self, topdir: Option<&Path>) -> Vec<(&'static str, String)> {
    let mut env = vec![
      ("MKDIST_PACKAGE", self.package.clone()),
      ("MKDIST_VERSION", self.version.version.clone()),
      ("MKDIST_VERSION_BIN", self.version_bin.clone()),
      ("MKDIST_REVISION", self.repo.revision.clone()),
      ("MKDIST_TEST_BUILD", if self.is_test_build() { "1" } else { "0" }.to_string()),
    ];
    if let Some(topdir) = topdir {
      env.push(("MKDIST_TOPDIR", topdir.to_string_lossy().to_string()));
    }
    env
  }
}
