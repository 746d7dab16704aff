//! Release version resolution
//!
//! The effective version comes from exactly one of three places, in order:
//! an explicit override (test builds), a `version-*` tag on the current
//! revision, or the commit date as `YYYYMMDD`. Override and tag versions must
//! have a `Version <v>:` line in the changelog.

use crate::core::error::{DistResult, PolicyError, ResultExt};
use crate::core::vcs::{RepositoryRef, Vcs};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Literal used by [`version_bin`] when the version is not `major.minor[.patch]`
pub const DEFAULT_VERSION_BIN: &str = "1";

/// Where the effective version came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionSource {
  Override,
  Tag,
  CommitDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVersion {
  pub version: String,
  pub source: VersionSource,
}

impl ResolvedVersion {
  /// Test builds are the ones packaged under an explicit override
  pub fn is_test_build(&self) -> bool {
    self.source == VersionSource::Override
  }
}

/// Resolve the version and enforce the clean-tree policy
///
/// Without an override the working tree must match `repo.revision`; the
/// check runs before the tag is even looked at.
pub fn resolve(
  vcs: &dyn Vcs,
  repo: &RepositoryRef,
  changelog: &Path,
  override_version: Option<&str>,
) -> DistResult<ResolvedVersion> {
  if override_version.is_none() {
    ensure_clean(vcs, &repo.revision)?;
  }
  derive_version(repo, changelog, override_version)
}

/// Fail unless the working tree matches `revision`
pub fn ensure_clean(vcs: &dyn Vcs, revision: &str) -> DistResult<()> {
  if vcs.is_clean(revision)? {
    Ok(())
  } else {
    Err(
      PolicyError::ModifiedTree {
        revision: revision.to_string(),
      }
      .into(),
    )
  }
}

/// Pick the version without looking at the working tree
pub fn derive_version(
  repo: &RepositoryRef,
  changelog: &Path,
  override_version: Option<&str>,
) -> DistResult<ResolvedVersion> {
  if let Some(version) = override_version {
    require_changelog_entry(changelog, version)?;
    return Ok(ResolvedVersion {
      version: version.to_string(),
      source: VersionSource::Override,
    });
  }

  if let Some(ref version) = repo.tag_version {
    require_changelog_entry(changelog, version)?;
    return Ok(ResolvedVersion {
      version: version.clone(),
      source: VersionSource::Tag,
    });
  }

  eprintln!("⚠️  Could not get a version number; using date of commit");
  Ok(ResolvedVersion {
    version: repo.date.format("%Y%m%d").to_string(),
    source: VersionSource::CommitDate,
  })
}

/// Fail unless the changelog has a line starting with `Version <version>:`
pub fn require_changelog_entry(changelog: &Path, version: &str) -> DistResult<()> {
  if changelog_has_version(changelog, version)? {
    Ok(())
  } else {
    Err(
      PolicyError::NoChangelogEntry {
        version: version.to_string(),
        changelog: changelog.to_path_buf(),
      }
      .into(),
    )
  }
}

/// Check the changelog for a `Version <version>:` line
pub fn changelog_has_version(changelog: &Path, version: &str) -> DistResult<bool> {
  let content = fs::read(changelog).with_context(|| format!("Failed to read changelog {}", changelog.display()))?;
  let needle = format!("Version {}:", version);
  Ok(
    content
      .split(|b| *b == b'\n')
      .any(|line| line.starts_with(needle.as_bytes())),
  )
}

/// Pack `major.minor[.patch]` into a `0xMMmmpp` literal
///
/// Missing patch counts as 0. Anything else, including components above 255,
/// yields `default`.
pub fn version_bin(version: &str, default: &str) -> String {
  let parts: Vec<&str> = version.split('.').collect();
  if !(2..=3).contains(&parts.len()) || !parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit())) {
    return default.to_string();
  }

  let packed: Option<Vec<u8>> = parts.iter().map(|p| p.parse::<u8>().ok()).collect();
  match packed.as_deref() {
    Some([major, minor]) => format!("0x{:02x}{:02x}00", major, minor),
    Some([major, minor, patch]) => format!("0x{:02x}{:02x}{:02x}", major, minor, patch),
    _ => default.to_string(),
  }
}
