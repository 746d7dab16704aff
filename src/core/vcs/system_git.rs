//! System git backend
//!
//! Every query is one `git` subprocess run against the repository root with
//! an isolated environment, so user configuration cannot change the output
//! format we parse.

use super::{Vcs, VcsKind, capture, is_hex_id, non_empty_lines, parse_commit_date, pick_version_tag};
use crate::core::error::{DistResult, VcsError};
use chrono::{DateTime, FixedOffset};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git backend using system git
pub struct SystemGit {
  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git checkout rooted at `path`
  ///
  /// No subprocess runs here; the marker directory was already checked by
  /// [`super::detect`].
  pub fn open(path: &Path) -> Self {
    Self {
      work_tree: path.to_path_buf(),
    }
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables
  /// - Whitelists only PATH and HOME
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.work_tree);

    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }

    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII
    cmd.arg("-c").arg("color.ui=false");

    cmd
  }
}

impl Vcs for SystemGit {
  fn kind(&self) -> VcsKind {
    VcsKind::Git
  }

  fn root(&self) -> &Path {
    &self.work_tree
  }

  fn tracked_files(&self) -> DistResult<Vec<String>> {
    let mut cmd = self.git_cmd();
    cmd.arg("ls-files");
    let stdout = capture(cmd, "git ls-files")?;
    Ok(non_empty_lines(&stdout))
  }

  fn current_revision(&self) -> DistResult<String> {
    let mut cmd = self.git_cmd();
    cmd.args(["rev-parse", "HEAD"]);
    let stdout = capture(cmd, "git rev-parse HEAD")?;

    let sha = stdout.trim();
    if !is_hex_id(sha) {
      return Err(
        VcsError::UnexpectedOutput {
          command: "git rev-parse HEAD".to_string(),
          output: stdout,
        }
        .into(),
      );
    }

    Ok(sha.to_string())
  }

  fn tag_version(&self, revision: &str) -> DistResult<Option<String>> {
    // --points-at peels annotated tags, so both tag kinds are found
    let mut cmd = self.git_cmd();
    cmd.args(["tag", "--points-at", revision]);
    let stdout = capture(cmd, &format!("git tag --points-at {}", revision))?;

    Ok(pick_version_tag(stdout.lines()))
  }

  fn commit_date(&self, revision: &str) -> DistResult<DateTime<FixedOffset>> {
    let label = format!("git show -s --format=%ci {}", revision);
    let mut cmd = self.git_cmd();
    cmd.args(["show", "-s", "--format=%ci", revision]);
    let stdout = capture(cmd, &label)?;

    parse_commit_date(&label, &stdout)
  }

  fn is_clean(&self, revision: &str) -> DistResult<bool> {
    let label = format!("git diff {} --quiet", revision);
    let output = self
      .git_cmd()
      .args(["diff", revision, "--quiet"])
      .output()
      .map_err(|e| VcsError::CommandFailed {
        command: label.clone(),
        stderr: e.to_string(),
      })?;

    // --quiet: 0 = no differences, 1 = differences, anything else = failure
    match output.status.code() {
      Some(0) => Ok(true),
      Some(1) => Ok(false),
      _ => Err(
        VcsError::CommandFailed {
          command: label,
          stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
        .into(),
      ),
    }
  }
}
