//! Version-control abstraction
//!
//! Two backends sit behind the [`Vcs`] trait: [`SystemGit`] and [`SystemHg`].
//! Both shell out to the installed command-line tool and only consume its
//! output. The backend is chosen once per run by [`detect`], based on which
//! marker directory exists in the repository root.

pub mod system_git;
pub mod system_hg;

pub use system_git::SystemGit;
pub use system_hg::SystemHg;

use crate::core::error::{ConfigError, DistResult, VcsError};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::process::Command;

/// Tag prefix marking a release version
pub const VERSION_TAG_PREFIX: &str = "version-";

/// Which backend a repository uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
  Git,
  Mercurial,
}

impl fmt::Display for VcsKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VcsKind::Git => write!(f, "git"),
      VcsKind::Mercurial => write!(f, "mercurial"),
    }
  }
}

/// Operations the packaging pipeline needs from a version-control backend
pub trait Vcs {
  /// Backend kind
  fn kind(&self) -> VcsKind;

  /// Repository root (the directory holding the marker directory)
  fn root(&self) -> &Path;

  /// Repository-relative paths of all tracked files, in backend order
  fn tracked_files(&self) -> DistResult<Vec<String>>;

  /// Identifier of the revision the working tree is based on
  fn current_revision(&self) -> DistResult<String>;

  /// Release version from a `version-*` tag on `revision`, prefix stripped
  fn tag_version(&self, revision: &str) -> DistResult<Option<String>>;

  /// Commit timestamp of `revision` in the committer's timezone
  fn commit_date(&self, revision: &str) -> DistResult<DateTime<FixedOffset>>;

  /// True iff the working tree has no differences against `revision`
  fn is_clean(&self, revision: &str) -> DistResult<bool>;
}

/// Pick the backend by marker directory
///
/// Mercurial is checked first. `.git` may also be a file (worktrees).
pub fn detect(root: &Path) -> DistResult<Box<dyn Vcs>> {
  if root.join(".hg").is_dir() {
    return Ok(Box::new(SystemHg::open(root)));
  }
  if root.join(".git").exists() {
    return Ok(Box::new(SystemGit::open(root)));
  }
  Err(
    ConfigError::NoRepository {
      root: root.to_path_buf(),
    }
    .into(),
  )
}

/// Everything the run needs to know about the checked-out revision
///
/// Resolved once per invocation and never refreshed.
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryRef {
  pub kind: VcsKind,
  pub revision: String,
  pub date: DateTime<FixedOffset>,
  pub tag_version: Option<String>,
}

impl RepositoryRef {
  /// Query the backend for the current revision, its date and its version tag
  pub fn resolve(vcs: &dyn Vcs) -> DistResult<Self> {
    let revision = vcs.current_revision()?;
    let tag_version = vcs.tag_version(&revision)?;
    let date = vcs.commit_date(&revision)?;

    Ok(Self {
      kind: vcs.kind(),
      revision,
      date,
      tag_version,
    })
  }
}

/// Choose the release version from a set of tag names
///
/// Only tags starting with [`VERSION_TAG_PREFIX`] count. When several match,
/// the lexicographically smallest tag wins so the choice never depends on
/// backend output order.
pub fn pick_version_tag<'a>(tags: impl IntoIterator<Item = &'a str>) -> Option<String> {
  tags
    .into_iter()
    .map(str::trim)
    .filter_map(|tag| tag.strip_prefix(VERSION_TAG_PREFIX))
    .filter(|version| !version.is_empty())
    .min()
    .map(str::to_string)
}

/// Parse `YYYY-MM-DD HH:MM:SS +ZZZZ` as printed by `git show --format=%ci`
/// and `hg log --template '{date|isodatesec}'`
pub(crate) fn parse_commit_date(command: &str, raw: &str) -> DistResult<DateTime<FixedOffset>> {
  DateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S %z").map_err(|_| {
    VcsError::UnexpectedOutput {
      command: command.to_string(),
      output: raw.to_string(),
    }
    .into()
  })
}

/// Run a VCS command and return its stdout
///
/// Non-zero exit and spawn failures both become `VcsError::CommandFailed`
/// naming the command line.
pub(crate) fn capture(mut cmd: Command, label: &str) -> DistResult<String> {
  let output = cmd.output().map_err(|e| VcsError::CommandFailed {
    command: label.to_string(),
    stderr: e.to_string(),
  })?;

  if !output.status.success() {
    return Err(
      VcsError::CommandFailed {
        command: label.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }
      .into(),
    );
  }

  Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Split newline-delimited command output, dropping empty lines
pub(crate) fn non_empty_lines(output: &str) -> Vec<String> {
  output
    .lines()
    .map(|line| line.trim_end_matches('\r'))
    .filter(|line| !line.is_empty())
    .map(str::to_string)
    .collect()
}

/// Check that a revision id is a run of hex digits
pub(crate) fn is_hex_id(id: &str) -> bool {
  !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit())
}
