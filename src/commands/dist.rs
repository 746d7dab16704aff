//! `mkdist dist`: the full packaging run

use crate::core::archive;
use crate::core::build::{self, BuildTool, ExternalTool};
use crate::core::context::{Checkout, RunContext};
use crate::core::error::DistResult;
use crate::core::files::StagedFile;
use crate::core::hooks::{HookContext, HookPoint, Hooks};
use crate::core::stage::StagingTree;
use crate::core::substitute;
use crate::core::version;
use std::path::{Path, PathBuf};

/// Command-line switches of a packaging run
#[derive(Debug, Clone, Default)]
pub struct DistOptions {
  /// Package this version as a test build, bypassing the clean-tree check
  pub test_version: Option<String>,
  /// Skip clean/build; honored only for test builds
  pub no_build: bool,
  /// Leave the staging directory behind after a successful run
  pub keep_staging: bool,
}

/// Run the dist command
pub fn run_dist(root: &Path, options: &DistOptions) -> DistResult<()> {
  let checkout = Checkout::open(root)?;
  let hooks = Hooks::from_config(&checkout.config.hooks);
  let tool = ExternalTool::from_command_line(&checkout.config.build_tool, root)?;

  let archive = create_distribution(&checkout, options, &hooks, &tool)?;
  let name = archive
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_else(|| archive.display().to_string());
  println!("Created {}", name);
  Ok(())
}

/// Resolve the version, build, stage and pack; returns the tarball path
///
/// On failure after staging began, the staging directory stays on disk and
/// its location is printed.
pub fn create_distribution(
  checkout: &Checkout,
  options: &DistOptions,
  hooks: &Hooks,
  tool: &dyn BuildTool,
) -> DistResult<PathBuf> {
  let resolved = version::resolve(
    checkout.vcs.as_ref(),
    &checkout.repo,
    &checkout.changelog_path(),
    options.test_version.as_deref(),
  )?;
  let ctx = RunContext::new(checkout, resolved);

  println!(
    "📦 Packaging {} {} ({} {})",
    ctx.package,
    ctx.version.version,
    ctx.repo.kind,
    short_revision(&ctx.repo.revision)
  );

  if build::should_skip(options.no_build, ctx.is_test_build()) {
    println!("⏭️  Skipping build");
  } else {
    let dirs = build::build_dirs(&ctx.root, &ctx.config, &checkout.srcdirs);
    build::run_build(&ctx, hooks, tool, &dirs)?;
  }

  let sources = checkout.resolve_sources()?;
  let staging = StagingTree::create(&ctx.dist_name())?;

  match assemble(&ctx, checkout, hooks, &sources, &staging) {
    Ok(archive) => {
      if options.keep_staging {
        let kept = staging.keep();
        println!("📁 Staging tree kept at {}", kept.display());
      } else {
        staging.remove()?;
      }
      Ok(archive)
    }
    Err(err) => {
      let kept = staging.keep();
      eprintln!("📁 Staging tree left at {}", kept.display());
      Err(err)
    }
  }
}

fn assemble(
  ctx: &RunContext,
  checkout: &Checkout,
  hooks: &Hooks,
  sources: &[StagedFile],
  staging: &StagingTree,
) -> DistResult<PathBuf> {
  let topdir = staging.topdir();
  let hook_ctx = HookContext {
    run: ctx,
    topdir: Some(topdir),
  };

  staging.copy_files(&ctx.root, sources, "Sources")?;
  staging.copy_files(&ctx.root, &checkout.distfiles, "Distribution files")?;
  staging.copy_aux(&ctx.root, &ctx.config.auxfiles)?;
  println!(
    "📋 Staged {} source and {} distribution files",
    sources.len(),
    checkout.distfiles.len()
  );
  hooks.run(HookPoint::Copy, &hook_ctx)?;

  let rules = substitute::rules_from_config(ctx)?;
  substitute::apply_rules(topdir, &rules)?;

  if ctx.config.create_configure {
    staging.create_configure(&ctx.config.config_dir()?)?;
  }

  hooks.run(HookPoint::Finalize, &hook_ctx)?;
  archive::finalize(ctx, staging, &checkout.changelog.target)
}

/// First 12 characters of a revision id
pub fn short_revision(revision: &str) -> &str {
  revision.get(..12).unwrap_or(revision)
}
