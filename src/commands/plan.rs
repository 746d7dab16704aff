//! `mkdist plan`: show what a packaging run would do
//!
//! Nothing is built, staged or written. The clean-tree check is reported,
//! not enforced, so a plan works on a dirty checkout too.

use crate::core::build;
use crate::core::context::{Checkout, RunContext};
use crate::core::error::DistResult;
use crate::core::files::StagedFile;
use crate::core::vcs::RepositoryRef;
use crate::core::version::{self, ResolvedVersion};
use crate::utils::glob_expand;
use serde::Serialize;
use std::path::Path;

/// Everything a packaging run would resolve
#[derive(Debug, Serialize)]
pub struct PlanReport {
  pub package: String,
  pub repository: RepositoryRef,
  pub clean: bool,
  pub version: ResolvedVersion,
  pub version_bin: String,
  pub test_build: bool,
  pub archive: String,
  pub build_dirs: Vec<String>,
  pub changelog: String,
  /// Sources as currently on disk; generated companions appear only once built
  pub sources: Vec<StagedFile>,
  pub distfiles: Vec<StagedFile>,
  pub auxfiles: Vec<String>,
}

/// Resolve a plan for the checkout
pub fn build_plan(checkout: &Checkout, test_version: Option<&str>) -> DistResult<PlanReport> {
  let clean = checkout.vcs.is_clean(&checkout.repo.revision)?;
  let resolved = version::derive_version(&checkout.repo, &checkout.changelog_path(), test_version)?;
  let ctx = RunContext::new(checkout, resolved);

  Ok(PlanReport {
    package: ctx.package.clone(),
    repository: ctx.repo.clone(),
    clean,
    version_bin: ctx.version_bin.clone(),
    test_build: ctx.is_test_build(),
    archive: ctx.archive_name(),
    build_dirs: build::build_dirs(&ctx.root, &ctx.config, &checkout.srcdirs),
    changelog: checkout.changelog.origin.clone(),
    sources: checkout.resolve_sources()?,
    distfiles: checkout.distfiles.clone(),
    auxfiles: glob_expand(&ctx.config.auxfiles, &ctx.root)?,
    version: ctx.version,
  })
}

/// Run the plan command
pub fn run_plan(root: &Path, test_version: Option<&str>, json: bool) -> DistResult<()> {
  let checkout = Checkout::open(root)?;
  let report = build_plan(&checkout, test_version)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print_plan(&report);
  }
  Ok(())
}

fn print_plan(report: &PlanReport) {
  println!("📦 {} → {}", report.package, report.archive);
  println!(
    "   {} {} ({})",
    report.repository.kind,
    report.repository.revision,
    report.repository.date.format("%Y-%m-%d %H:%M:%S %z")
  );
  println!("   version {} ({:?}), bin {}", report.version.version, report.version.source, report.version_bin);

  if report.clean {
    println!("✅ Working tree is clean");
  } else if report.test_build {
    println!("⚠️  Working tree is modified (allowed for test builds)");
  } else {
    println!("❌ Working tree is modified; a release run would abort");
  }

  println!("\n🔨 Build directories: {}", report.build_dirs.join(", "));
  println!("📝 Changelog: {}", report.changelog);

  print_files("Sources", &report.sources);
  print_files("Distribution files", &report.distfiles);
  if !report.auxfiles.is_empty() {
    println!("\n📁 Auxiliary files ({}):", report.auxfiles.len());
    for entry in &report.auxfiles {
      println!("   {}", entry);
    }
  }
}

fn print_files(title: &str, files: &[StagedFile]) {
  println!("\n📁 {} ({}):", title, files.len());
  for file in files {
    if file.origin == file.target {
      println!("   {}", file.origin);
    } else {
      println!("   {} → {}", file.origin, file.target);
    }
  }
}
