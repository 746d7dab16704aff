//! System mercurial backend
//!
//! Mirrors [`super::SystemGit`]: one `hg` subprocess per query, run with
//! `HGPLAIN=1` so localized or user-customized output never reaches the parser.

use super::{Vcs, VcsKind, capture, is_hex_id, non_empty_lines, parse_commit_date, pick_version_tag};
use crate::core::error::{DistResult, VcsError};
use chrono::{DateTime, FixedOffset};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Mercurial backend using system hg
pub struct SystemHg {
  pub(crate) work_tree: PathBuf,
}

impl SystemHg {
  /// Open a mercurial checkout rooted at `path`
  pub fn open(path: &Path) -> Self {
    Self {
      work_tree: path.to_path_buf(),
    }
  }

  pub(crate) fn hg_cmd(&self) -> Command {
    let mut cmd = Command::new("hg");

    cmd.arg("--cwd").arg(&self.work_tree);

    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }
    cmd.env("HGPLAIN", "1");

    cmd
  }
}

/// Extract the changeset id from `hg identify --id` output
///
/// A trailing `+` marks uncommitted changes and is not part of the id.
fn parse_identify(raw: &str) -> Option<String> {
  let id = raw.split_whitespace().next()?.trim_end_matches('+');
  is_hex_id(id).then(|| id.to_string())
}

impl Vcs for SystemHg {
  fn kind(&self) -> VcsKind {
    VcsKind::Mercurial
  }

  fn root(&self) -> &Path {
    &self.work_tree
  }

  fn tracked_files(&self) -> DistResult<Vec<String>> {
    let mut cmd = self.hg_cmd();
    cmd.arg("manifest");
    let stdout = capture(cmd, "hg manifest")?;
    Ok(non_empty_lines(&stdout))
  }

  fn current_revision(&self) -> DistResult<String> {
    let mut cmd = self.hg_cmd();
    cmd.args(["identify", "--id"]);
    let stdout = capture(cmd, "hg identify --id")?;

    parse_identify(&stdout).ok_or_else(|| {
      VcsError::UnexpectedOutput {
        command: "hg identify --id".to_string(),
        output: stdout,
      }
      .into()
    })
  }

  fn tag_version(&self, revision: &str) -> DistResult<Option<String>> {
    // `hg tag` commits .hgtags on top of the tagged changeset, so a clean
    // checkout of a release sits one commit above the tag.
    let revset = format!("{} or parents({})", revision, revision);
    let mut cmd = self.hg_cmd();
    cmd.args(["log", "-r", &revset, "--template", "{join(tags, '\\n')}\\n"]);
    let stdout = capture(cmd, &format!("hg log -r '{}'", revset))?;

    Ok(pick_version_tag(stdout.lines()))
  }

  fn commit_date(&self, revision: &str) -> DistResult<DateTime<FixedOffset>> {
    let label = format!("hg log -r {} --template {{date|isodatesec}}", revision);
    let mut cmd = self.hg_cmd();
    cmd.args(["log", "-r", revision, "--template", "{date|isodatesec}"]);
    let stdout = capture(cmd, &label)?;

    parse_commit_date(&label, &stdout)
  }

  fn is_clean(&self, revision: &str) -> DistResult<bool> {
    let mut cmd = self.hg_cmd();
    cmd.args(["diff", "-r", revision]);
    let stdout = capture(cmd, &format!("hg diff -r {}", revision))?;

    Ok(non_empty_lines(&stdout).is_empty())
  }
}
