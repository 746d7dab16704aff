//! Lifecycle hooks
//!
//! Four fixed points in the pipeline accept a user action:
//!
//! ```text
//! prebuild -> clean/all -> postbuild -> stage files -> copy
//!          -> substitutions -> configure -> finalize -> tarball
//! ```
//!
//! Hooks from dist.toml are shell commands run with `sh -c` from the
//! repository root. Code embedding the pipeline can install closures instead.

use crate::core::config::HookConfig;
use crate::core::context::RunContext;
use crate::core::error::{BuildError, DistResult};
use std::fmt;
use std::path::Path;
use std::process::Command;

/// Pipeline point a hook is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
  Prebuild,
  Postbuild,
  Copy,
  Finalize,
}

impl fmt::Display for HookPoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      HookPoint::Prebuild => "prebuild",
      HookPoint::Postbuild => "postbuild",
      HookPoint::Copy => "copy",
      HookPoint::Finalize => "finalize",
    };
    f.write_str(name)
  }
}

/// What a hook gets to see
pub struct HookContext<'a> {
  pub run: &'a RunContext,
  /// Staging root; `None` for the build hooks, which run before staging
  pub topdir: Option<&'a Path>,
}

pub type Hook = Box<dyn Fn(&HookContext<'_>) -> DistResult<()>>;

/// Optional action per hook point
#[derive(Default)]
pub struct Hooks {
  pub prebuild: Option<Hook>,
  pub postbuild: Option<Hook>,
  pub copy: Option<Hook>,
  pub finalize: Option<Hook>,
}

impl Hooks {
  /// Turn the `[hooks]` table into shell hooks
  pub fn from_config(config: &HookConfig) -> Self {
    let shell = |point: HookPoint, command: &Option<String>| command.clone().map(|cmd| shell_hook(point, cmd));
    Self {
      prebuild: shell(HookPoint::Prebuild, &config.prebuild),
      postbuild: shell(HookPoint::Postbuild, &config.postbuild),
      copy: shell(HookPoint::Copy, &config.copy),
      finalize: shell(HookPoint::Finalize, &config.finalize),
    }
  }

  fn get(&self, point: HookPoint) -> Option<&Hook> {
    match point {
      HookPoint::Prebuild => self.prebuild.as_ref(),
      HookPoint::Postbuild => self.postbuild.as_ref(),
      HookPoint::Copy => self.copy.as_ref(),
      HookPoint::Finalize => self.finalize.as_ref(),
    }
  }

  /// Run the hook at `point`, if any
  ///
  /// A failing hook aborts the run.
  pub fn run(&self, point: HookPoint, ctx: &HookContext<'_>) -> DistResult<()> {
    match self.get(point) {
      Some(hook) => hook(ctx),
      None => Ok(()),
    }
  }
}

/// Hook running `command` through `sh -c` in the repository root
pub fn shell_hook(point: HookPoint, command: String) -> Hook {
  Box::new(move |ctx: &HookContext<'_>| {
    let status = Command::new("sh")
      .arg("-c")
      .arg(&command)
      .current_dir(&ctx.run.root)
      .envs(ctx.run.hook_env(ctx.topdir))
      .status()
      .map_err(|e| BuildError::HookFailed {
        hook: point.to_string(),
        reason: format!("could not run sh: {}", e),
      })?;

    if !status.success() {
      return Err(
        BuildError::HookFailed {
          hook: point.to_string(),
          reason: format!("`{}` exited with {}", command, status),
        }
        .into(),
      );
    }
    Ok(())
  })
}
