//! Archive finalization
//!
//! The staged changelog gets its tabs expanded, test builds get a disclaimer
//! file, then the staging topdir is packed with the system `tar` as a
//! bzip2-compressed tarball in the repository root.

use crate::core::context::RunContext;
use crate::core::error::{BuildError, DistResult, ResultExt};
use crate::core::stage::StagingTree;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Disclaimer file added to test builds
pub const TEST_NOTE_FILE: &str = "00README.testversion";

pub const TEST_NOTE: &str = "This is a test version, which is NOT intended for distribution.\n";

/// Tab stop width used for the changelog
pub const CHANGELOG_TAB_WIDTH: usize = 4;

/// Replace tabs with spaces up to the next multiple of `width`
///
/// Columns count bytes, so non-UTF-8 changelogs pass through.
pub fn expand_tabs(text: &[u8], width: usize) -> Vec<u8> {
  let mut out = Vec::with_capacity(text.len());
  let mut column = 0;
  for &byte in text {
    match byte {
      b'\t' => {
        let pad = width - column % width;
        out.extend(std::iter::repeat_n(b' ', pad));
        column += pad;
      }
      b'\n' => {
        out.push(byte);
        column = 0;
      }
      _ => {
        out.push(byte);
        column += 1;
      }
    }
  }
  out
}

/// Expand tabs in the staged changelog in place
pub fn expand_changelog(path: &Path) -> DistResult<()> {
  let content = fs::read(path).with_context(|| format!("Failed to read staged changelog {}", path.display()))?;
  if !content.contains(&b'\t') {
    return Ok(());
  }
  fs::write(path, expand_tabs(&content, CHANGELOG_TAB_WIDTH))
    .with_context(|| format!("Failed to write staged changelog {}", path.display()))
}

/// Drop the test-build disclaimer into the staging root
pub fn write_test_note(topdir: &Path) -> DistResult<()> {
  let path = topdir.join(TEST_NOTE_FILE);
  fs::write(&path, TEST_NOTE).with_context(|| format!("Failed to write {}", path.display()))
}

/// Pack `<tmp>/<dist_name>` into `output` with `tar -cjf`
pub fn create_tarball(staging: &StagingTree, dist_name: &str, output: &Path) -> DistResult<()> {
  let result = Command::new("tar")
    .arg("-cjf")
    .arg(output)
    .arg("-C")
    .arg(staging.tmpdir())
    .arg(dist_name)
    .output()
    .map_err(|e| BuildError::ToolFailed {
      tool: "tar".to_string(),
      reason: e.to_string(),
    })?;

  if !result.status.success() {
    // never leave a truncated tarball behind
    if output.exists() {
      fs::remove_file(output).with_context(|| format!("Failed to remove partial {}", output.display()))?;
    }
    return Err(
      BuildError::ToolFailed {
        tool: "tar".to_string(),
        reason: String::from_utf8_lossy(&result.stderr).trim().to_string(),
      }
      .into(),
    );
  }
  Ok(())
}

/// Test note, changelog expansion, tarball; returns the tarball path
///
/// `changelog` is the changelog's path relative to the staging root.
pub fn finalize(ctx: &RunContext, staging: &StagingTree, changelog: &str) -> DistResult<PathBuf> {
  if ctx.is_test_build() {
    write_test_note(staging.topdir())?;
  }
  expand_changelog(&staging.topdir().join(changelog))?;

  let output = ctx.root.join(ctx.archive_name());
  create_tarball(staging, &ctx.dist_name(), &output)?;
  Ok(output)
}
