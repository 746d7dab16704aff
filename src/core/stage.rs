//! Staging tree assembly
//!
//! ```text
//! $TMPDIR/mkdistXXXXXX/            temporary directory (owned)
//!   <package>-<version>/           topdir, becomes the tarball's only entry
//!     src/...                      sources, `.objects/` stripped
//!     Changelog, man/tool.1 ...    distribution files, `dist/` stripped
//!     config.pkg ...               auxiliary files and directories
//!     configure, install.sh        when create_configure is set
//! ```

use crate::core::error::{BuildError, DistError, DistResult, ResultExt};
use crate::core::files::StagedFile;
use crate::ui::progress::FileProgress;
use crate::utils::glob_expand;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Prefix of the temporary staging directory
pub const STAGING_PREFIX: &str = "mkdist";

/// Temporary directory holding `<package>-<version>/`
pub struct StagingTree {
  tmp: TempDir,
  topdir: PathBuf,
}

impl StagingTree {
  /// Create a fresh temporary directory with an empty `dist_name` inside
  pub fn create(dist_name: &str) -> DistResult<Self> {
    let tmp = tempfile::Builder::new()
      .prefix(STAGING_PREFIX)
      .tempdir()
      .context("Failed to create staging directory")?;
    let topdir = tmp.path().join(dist_name);
    fs::create_dir(&topdir).with_context(|| format!("Failed to create {}", topdir.display()))?;
    Ok(Self { tmp, topdir })
  }

  /// `<tmp>/<package>-<version>`
  pub fn topdir(&self) -> &Path {
    &self.topdir
  }

  /// The temporary directory containing the topdir
  pub fn tmpdir(&self) -> &Path {
    self.tmp.path()
  }

  /// Copy resolved files from `root` into the topdir, keeping permissions
  pub fn copy_files(&self, root: &Path, files: &[StagedFile], label: &str) -> DistResult<()> {
    let mut progress = FileProgress::interactive(files.len(), label);

    for file in files {
      let from = root.join(&file.origin);
      let to = self.topdir.join(&file.target);
      if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
      }
      fs::copy(&from, &to).with_context(|| format!("Failed to copy {}", file.origin))?;

      if let Some(ref mut progress) = progress {
        progress.inc();
      }
    }
    Ok(())
  }

  /// Copy auxiliary files and whole directories, resolved as globs against `root`
  pub fn copy_aux(&self, root: &Path, patterns: &[String]) -> DistResult<()> {
    for entry in glob_expand(patterns, root)? {
      let from = root.join(&entry);
      let to = self.topdir.join(&entry);
      if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
      }

      if from.is_dir() {
        copy_tree(&from, &to)?;
      } else {
        fs::copy(&from, &to).with_context(|| format!("Failed to copy auxiliary file {}", entry))?;
      }
    }
    Ok(())
  }

  /// Produce `configure` with `merge_config` and add `install.sh`
  ///
  /// `merge_config` runs inside the topdir; a non-zero exit is fatal.
  pub fn create_configure(&self, config_dir: &Path) -> DistResult<()> {
    let merge = config_dir.join("merge_config");
    if !merge.is_file() {
      return Err(DistError::with_help(
        format!("merge_config not found in {}", config_dir.display()),
        "Set `config_dir` in dist.toml, or `create_configure = false` to skip configure generation.",
      ));
    }

    let status = Command::new(&merge)
      .current_dir(&self.topdir)
      .status()
      .map_err(|e| BuildError::ToolFailed {
        tool: merge.display().to_string(),
        reason: e.to_string(),
      })?;
    if !status.success() {
      return Err(
        BuildError::ToolFailed {
          tool: "merge_config".to_string(),
          reason: format!("exited with {}", status),
        }
        .into(),
      );
    }

    let install = config_dir.join("install.sh");
    fs::copy(&install, self.topdir.join("install.sh"))
      .with_context(|| format!("Failed to copy {}", install.display()))?;
    Ok(())
  }

  /// Delete the staging directory, surfacing any error
  pub fn remove(self) -> DistResult<()> {
    self.tmp.close().context("Failed to remove staging directory")
  }

  /// Leave the staging directory on disk and return its path
  pub fn keep(self) -> PathBuf {
    self.tmp.keep()
  }
}

/// Recursive copy; symlinks are recreated rather than followed
fn copy_tree(from: &Path, to: &Path) -> DistResult<()> {
  for entry in WalkDir::new(from).sort_by_file_name() {
    let entry = entry?;
    let relative = entry.path().strip_prefix(from)?;
    let dest = to.join(relative);
    let file_type = entry.file_type();

    if file_type.is_dir() {
      fs::create_dir_all(&dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    } else if file_type.is_symlink() {
      let link = fs::read_link(entry.path())?;
      std::os::unix::fs::symlink(&link, &dest)
        .with_context(|| format!("Failed to link {}", dest.display()))?;
    } else {
      fs::copy(entry.path(), &dest).with_context(|| format!("Failed to copy {}", entry.path().display()))?;
    }
  }
  Ok(())
}

/// Fail if `path` escapes the staging tree
///
/// `..` components are rejected outright since they can climb out after the
/// prefix matches.
pub fn ensure_inside(topdir: &Path, path: &Path) -> DistResult<()> {
  let inside = path
    .strip_prefix(topdir)
    .is_ok_and(|rest| rest.components().all(|c| !matches!(c, Component::ParentDir)));
  if inside {
    Ok(())
  } else {
    Err(DistError::message(format!(
      "{} is outside the staging tree {}",
      path.display(),
      topdir.display()
    )))
  }
}
