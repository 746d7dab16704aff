//! Build orchestration
//!
//! Every build directory is cleaned first, then every directory is built, so
//! the tarball never picks up stale generated files. The first failing
//! directory aborts the run.

use crate::core::config::DistConfig;
use crate::core::context::RunContext;
use crate::core::error::{BuildError, DistError, DistResult};
use crate::core::files::MAN_ROOT;
use crate::core::hooks::{HookContext, HookPoint, Hooks};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Build phases, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTarget {
  Clean,
  All,
}

impl BuildTarget {
  pub fn as_str(self) -> &'static str {
    match self {
      BuildTarget::Clean => "clean",
      BuildTarget::All => "all",
    }
  }
}

/// Something that can run a target in a directory
pub trait BuildTool {
  /// Run `target` in `dir`; `Ok(false)` means the tool ran and failed
  fn run(&self, dir: &Path, target: BuildTarget) -> DistResult<bool>;
}

/// External tool invoked as `<program> [args] -C <dir> <target>`
pub struct ExternalTool {
  program: String,
  args: Vec<String>,
  root: PathBuf,
}

impl ExternalTool {
  /// Parse a `build_tool` value such as `make` or `gmake -j4`
  pub fn from_command_line(command: &str, root: &Path) -> DistResult<Self> {
    let mut words = command.split_whitespace().map(str::to_string);
    let program = words
      .next()
      .ok_or_else(|| DistError::message("build_tool must name a program"))?;
    Ok(Self {
      program,
      args: words.collect(),
      root: root.to_path_buf(),
    })
  }
}

impl BuildTool for ExternalTool {
  fn run(&self, dir: &Path, target: BuildTarget) -> DistResult<bool> {
    let status = Command::new(&self.program)
      .args(&self.args)
      .arg("-C")
      .arg(dir)
      .arg(target.as_str())
      .current_dir(&self.root)
      .status()
      .map_err(|e| BuildError::ToolFailed {
        tool: self.program.clone(),
        reason: e.to_string(),
      })?;
    Ok(status.success())
  }
}

/// Directories to build: source dirs, then extra dirs, then `man` if it has a Makefile
pub fn build_dirs(root: &Path, config: &DistConfig, srcdirs: &[String]) -> Vec<String> {
  let mut dirs: Vec<String> = srcdirs.iter().chain(&config.extrabuilddirs).cloned().collect();
  if root.join(MAN_ROOT).join("Makefile").is_file() && !dirs.iter().any(|d| d == MAN_ROOT) {
    dirs.push(MAN_ROOT.to_string());
  }
  dirs
}

/// Test builds packaged with the no-build flag skip the build entirely
pub fn should_skip(no_build: bool, test_build: bool) -> bool {
  no_build && test_build
}

/// Clean every directory, then build every directory
pub fn clean_and_build(tool: &dyn BuildTool, dirs: &[String]) -> DistResult<()> {
  for dir in dirs {
    if !tool.run(Path::new(dir), BuildTarget::Clean)? {
      return Err(BuildError::CleanFailed { dir: PathBuf::from(dir) }.into());
    }
  }

  for dir in dirs {
    if !tool.run(Path::new(dir), BuildTarget::All)? {
      return Err(BuildError::BuildFailed { dir: PathBuf::from(dir) }.into());
    }
  }

  Ok(())
}

/// Prebuild hook, clean/all over `dirs`, postbuild hook
pub fn run_build(ctx: &RunContext, hooks: &Hooks, tool: &dyn BuildTool, dirs: &[String]) -> DistResult<()> {
  let hook_ctx = HookContext { run: ctx, topdir: None };
  hooks.run(HookPoint::Prebuild, &hook_ctx)?;

  println!("🔨 Building {} director{}", dirs.len(), if dirs.len() == 1 { "y" } else { "ies" });
  clean_and_build(tool, dirs)?;

  hooks.run(HookPoint::Postbuild, &hook_ctx)
}
