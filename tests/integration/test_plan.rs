//! Integration tests for `mkdist plan` and `mkdist version-bin`

use crate::helpers::{TestRepo, run_mkdist, run_mkdist_raw};
use anyhow::Result;

#[test]
fn test_plan_json_reports_resolution() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.tag("1.2.0")?;

  let output = run_mkdist(&repo.path, &["plan", "--json"], &[])?;
  let plan: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(plan["package"], "demo");
  assert_eq!(plan["version"]["version"], "1.2.0");
  assert_eq!(plan["version"]["source"], "tag");
  assert_eq!(plan["version_bin"], "0x010200");
  assert_eq!(plan["archive"], "demo-1.2.0.tar.bz2");
  assert_eq!(plan["clean"], true);
  assert_eq!(plan["test_build"], false);
  assert_eq!(plan["repository"]["kind"], "git");
  assert_eq!(plan["changelog"], "dist/Changelog");
  assert_eq!(plan["build_dirs"], serde_json::json!(["src", "man"]));

  let distfiles: Vec<(String, String)> = plan["distfiles"]
    .as_array()
    .unwrap()
    .iter()
    .map(|f| {
      (
        f["origin"].as_str().unwrap().to_string(),
        f["target"].as_str().unwrap().to_string(),
      )
    })
    .collect();
  assert_eq!(
    distfiles,
    vec![
      ("man/output/tool.1".to_string(), "man/tool.1".to_string()),
      ("dist/Changelog".to_string(), "Changelog".to_string()),
      ("dist/README".to_string(), "README".to_string()),
    ]
  );

  let sources: Vec<&str> = plan["sources"]
    .as_array()
    .unwrap()
    .iter()
    .map(|f| f["target"].as_str().unwrap())
    .collect();
  assert_eq!(sources, vec!["src/lexer.l", "src/main.c"]);

  // Planning never builds or packs
  assert!(repo.build_calls().is_empty());
  assert!(!repo.path.join("demo-1.2.0.tar.bz2").exists());
  Ok(())
}

#[test]
fn test_plan_reports_dirty_tree_without_failing() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.tag("1.2.0")?;
  repo.write("src/main.c", "/* local edit */\n")?;

  let output = run_mkdist(&repo.path, &["plan"], &[])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("demo-1.2.0.tar.bz2"), "stdout: {}", stdout);
  assert!(stdout.contains("a release run would abort"), "stdout: {}", stdout);
  Ok(())
}

#[test]
fn test_plan_with_test_version() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write("dist/Changelog", "Version 0.9:\n")?;

  let output = run_mkdist(&repo.path, &["plan", "--json", "--test-version", "0.9"], &[])?;
  let plan: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(plan["version"]["source"], "override");
  assert_eq!(plan["test_build"], true);
  assert_eq!(plan["clean"], false);
  assert_eq!(plan["archive"], "demo-0.9-test.tar.bz2");
  Ok(())
}

#[test]
fn test_version_bin_for_tag() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.tag("1.2.0")?;

  let output = run_mkdist(&repo.path, &["version-bin"], &[])?;
  assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "0x010200");
  Ok(())
}

#[test]
fn test_version_bin_default_for_date_versions() -> Result<()> {
  let repo = TestRepo::new()?;

  let output = run_mkdist(&repo.path, &["version-bin"], &[])?;
  assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1");

  let output = run_mkdist(&repo.path, &["version-bin", "--default", "0"], &[])?;
  assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "0");
  Ok(())
}

#[test]
fn test_missing_config() -> Result<()> {
  let repo = TestRepo::new()?;
  crate::helpers::git(&repo.path, &["rm", "-q", "dist.toml"])?;
  repo.commit("Drop config")?;

  let output = run_mkdist_raw(&repo.path, &["plan"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  Ok(())
}
