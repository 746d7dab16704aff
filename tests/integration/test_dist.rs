//! Integration tests for `mkdist dist`

use crate::helpers::{
  TestRepo, archiver_available, list_tarball, read_from_tarball, run_mkdist, run_mkdist_raw,
};
use anyhow::Result;

fn entries(prefix: &str, names: &[&str]) -> Vec<String> {
  let mut all: Vec<String> = std::iter::once(prefix.to_string())
    .chain(names.iter().map(|n| format!("{}/{}", prefix, n)))
    .collect();
  all.sort();
  all
}

#[test]
fn test_dist_tagged_release() -> Result<()> {
  if !archiver_available() {
    eprintln!("tar/bzip2 not available, skipping");
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.tag("1.2.0")?;

  let output = run_mkdist(&repo.path, &["dist"], &[])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Created demo-1.2.0.tar.bz2"), "stdout: {}", stdout);

  let archive = repo.path.join("demo-1.2.0.tar.bz2");
  assert_eq!(
    list_tarball(&archive)?,
    entries(
      "demo-1.2.0",
      &[
        "Changelog",
        "README",
        "man",
        "man/tool.1",
        "src",
        "src/lexer.c",
        "src/lexer.l",
        "src/main.c",
      ]
    )
  );

  assert_eq!(
    read_from_tarball(&archive, "demo-1.2.0/src/main.c")?,
    "const char *version = \"1.2.0\";\n"
  );
  assert_eq!(read_from_tarball(&archive, "demo-1.2.0/README")?, "demo 1.2.0\n");
  assert_eq!(
    read_from_tarball(&archive, "demo-1.2.0/Changelog")?,
    "Version 1.2.0:\n    * First release.\n"
  );

  assert_eq!(repo.build_calls(), vec!["clean src", "clean man", "all src", "all man"]);

  // The checkout itself is never rewritten
  assert_eq!(
    std::fs::read_to_string(repo.path.join("src/main.c"))?,
    "const char *version = \"@VERSION@\";\n"
  );
  Ok(())
}

#[test]
fn test_dist_is_the_default_command() -> Result<()> {
  if !archiver_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.tag("1.2.0")?;

  run_mkdist(&repo.path, &[], &[])?;
  assert!(repo.path.join("demo-1.2.0.tar.bz2").is_file());
  Ok(())
}

#[test]
fn test_dist_directory_flag() -> Result<()> {
  if !archiver_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.tag("1.2.0")?;

  let elsewhere = tempfile::TempDir::new()?;
  let dir = repo.path.to_string_lossy().to_string();
  run_mkdist(elsewhere.path(), &["-C", &dir, "dist"], &[])?;
  assert!(repo.path.join("demo-1.2.0.tar.bz2").is_file());
  Ok(())
}

#[test]
fn test_dirty_tree_aborts_before_build() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.tag("1.2.0")?;
  repo.write("src/main.c", "/* local edit */\n")?;

  let output = run_mkdist_raw(&repo.path, &["dist"], &[])?;
  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("modified working tree"), "stderr: {}", stderr);

  assert!(repo.build_calls().is_empty());
  assert!(!repo.path.join("demo-1.2.0.tar.bz2").exists());
  Ok(())
}

#[test]
fn test_untracked_files_do_not_make_tree_dirty() -> Result<()> {
  if !archiver_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.tag("1.2.0")?;
  repo.write("notes.txt", "scratch\n")?;

  run_mkdist(&repo.path, &["dist"], &[])?;
  assert!(repo.path.join("demo-1.2.0.tar.bz2").is_file());
  Ok(())
}

#[test]
fn test_test_version_on_dirty_tree() -> Result<()> {
  if !archiver_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.write("dist/Changelog", "Version 1.3.0-rc1:\n\t* Preview.\n")?;

  let output = run_mkdist(&repo.path, &["dist"], &[("TESTVERSION", "1.3.0-rc1")])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Created demo-1.3.0-rc1-test.tar.bz2"), "stdout: {}", stdout);

  let archive = repo.path.join("demo-1.3.0-rc1-test.tar.bz2");
  let listing = list_tarball(&archive)?;
  assert!(listing.contains(&"demo-1.3.0-rc1/00README.testversion".to_string()));
  assert_eq!(
    read_from_tarball(&archive, "demo-1.3.0-rc1/00README.testversion")?,
    "This is a test version, which is NOT intended for distribution.\n"
  );
  assert_eq!(repo.build_calls().len(), 4);
  Ok(())
}

#[test]
fn test_test_version_flag_and_no_build() -> Result<()> {
  if !archiver_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.write("dist/Changelog", "Version 9.0:\n")?;
  // Rendered man page left over from an earlier build; nothing regenerates it
  repo.write("man/output/tool.1", "TOOL(1)\n")?;

  run_mkdist(&repo.path, &["dist", "--test-version", "9.0", "--no-build"], &[])?;
  assert!(repo.path.join("demo-9.0-test.tar.bz2").is_file());
  assert!(repo.build_calls().is_empty());

  // Without a build the generated lexer is not there to ship
  let listing = list_tarball(&repo.path.join("demo-9.0-test.tar.bz2"))?;
  assert!(!listing.contains(&"demo-9.0/src/lexer.c".to_string()));
  Ok(())
}

#[test]
fn test_staging_removed_after_success() -> Result<()> {
  if !archiver_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.tag("1.2.0")?;
  let tmp = tempfile::TempDir::new()?;
  let tmpdir = tmp.path().to_string_lossy().to_string();

  run_mkdist(&repo.path, &["dist"], &[("TMPDIR", tmpdir.as_str())])?;
  assert!(repo.path.join("demo-1.2.0.tar.bz2").is_file());
  let leftovers: Vec<_> = std::fs::read_dir(tmp.path())?.collect::<Result<_, _>>()?;
  assert!(leftovers.is_empty(), "staging left behind: {:?}", leftovers);
  Ok(())
}

#[test]
fn test_keep_staging_leaves_tree() -> Result<()> {
  if !archiver_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.tag("1.2.0")?;
  let tmp = tempfile::TempDir::new()?;
  let tmpdir = tmp.path().to_string_lossy().to_string();

  run_mkdist(&repo.path, &["dist", "--keep-staging"], &[("TMPDIR", tmpdir.as_str())])?;
  let kept: Vec<_> = std::fs::read_dir(tmp.path())?.collect::<Result<_, _>>()?;
  assert_eq!(kept.len(), 1);
  assert!(kept[0].file_name().to_string_lossy().starts_with("mkdist"));
  assert!(kept[0].path().join("demo-1.2.0/Changelog").is_file());
  Ok(())
}

#[test]
fn test_no_build_ignored_without_override() -> Result<()> {
  if !archiver_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  repo.tag("1.2.0")?;

  run_mkdist(&repo.path, &["dist"], &[("NOBUILD", "1")])?;
  assert_eq!(repo.build_calls().len(), 4);
  Ok(())
}

#[test]
fn test_empty_testversion_counts_as_unset() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.tag("1.2.0")?;
  repo.write("src/main.c", "/* local edit */\n")?;

  let output = run_mkdist_raw(&repo.path, &["dist"], &[("TESTVERSION", "")])?;
  assert_eq!(output.status.code(), Some(3));
  Ok(())
}

#[test]
fn test_untagged_revision_uses_commit_date() -> Result<()> {
  if !archiver_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;

  let output = run_mkdist(&repo.path, &["dist"], &[])?;
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("using date of commit"), "stderr: {}", stderr);
  assert!(repo.path.join("demo-20240305.tar.bz2").is_file());
  Ok(())
}

#[test]
fn test_tag_without_changelog_entry() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.tag("2.0.0")?;

  let output = run_mkdist_raw(&repo.path, &["dist"], &[])?;
  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("no information for version 2.0.0"), "stderr: {}", stderr);
  assert!(repo.build_calls().is_empty());
  Ok(())
}

#[test]
fn test_missing_changelog_is_fatal() -> Result<()> {
  let repo = TestRepo::new()?;
  crate::helpers::git(&repo.path, &["rm", "-q", "dist/Changelog"])?;
  repo.commit("Drop changelog")?;

  let output = run_mkdist_raw(&repo.path, &["dist"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("No Changelog file found"));
  Ok(())
}

#[test]
fn test_outside_repository() -> Result<()> {
  let dir = tempfile::TempDir::new()?;
  std::fs::write(dir.path().join("dist.toml"), "package = \"x\"\n")?;

  let output = run_mkdist_raw(dir.path(), &["dist"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("Could not find git or mercurial repository"));
  Ok(())
}

#[test]
fn test_build_failure_aborts() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write("dist.toml", "package = \"demo\"\nbuild_tool = \"false\"\ncreate_configure = false\n")?;
  repo.commit("Broken build tool")?;
  repo.tag("1.2.0")?;

  let output = run_mkdist_raw(&repo.path, &["dist"], &[])?;
  assert_eq!(output.status.code(), Some(2));
  assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to clean directory src"));
  assert!(!repo.path.join("demo-1.2.0.tar.bz2").exists());
  Ok(())
}

#[test]
fn test_hooks_run_in_pipeline_order() -> Result<()> {
  if !archiver_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  let log = repo.tools.join("hooks.log");
  let build_tool = repo.tools.join("build.sh");
  repo.write(
    "dist.toml",
    &format!(
      r#"package = "demo"
excludesrc = "/tests/"
build_tool = "sh {build}"
create_configure = false

[hooks]
prebuild = "echo prebuild >> {log}"
postbuild = "echo postbuild >> {log}"
copy = "echo copy >> {log}; echo extra > \"$MKDIST_TOPDIR/EXTRA\""
finalize = "echo finalize $MKDIST_VERSION >> {log}"
"#,
      build = build_tool.display(),
      log = log.display()
    ),
  )?;
  repo.commit("Add hooks")?;
  repo.tag("1.2.0")?;

  run_mkdist(&repo.path, &["dist"], &[])?;

  let calls = std::fs::read_to_string(&log)?;
  assert_eq!(calls, "prebuild\npostbuild\ncopy\nfinalize 1.2.0\n");
  let archive = repo.path.join("demo-1.2.0.tar.bz2");
  assert_eq!(read_from_tarball(&archive, "demo-1.2.0/EXTRA")?, "extra\n");
  Ok(())
}

#[test]
fn test_failing_hook_keeps_staging_tree() -> Result<()> {
  let repo = TestRepo::new()?;
  let build_tool = repo.tools.join("build.sh");
  repo.write(
    "dist.toml",
    &format!(
      "package = \"demo\"\nbuild_tool = \"sh {}\"\ncreate_configure = false\n\n[hooks]\nfinalize = \"exit 1\"\n",
      build_tool.display()
    ),
  )?;
  repo.commit("Failing hook")?;
  repo.tag("1.2.0")?;

  let output = run_mkdist_raw(&repo.path, &["dist"], &[])?;
  assert_eq!(output.status.code(), Some(2));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("finalize hook failed"), "stderr: {}", stderr);

  let kept = stderr
    .lines()
    .find_map(|line| line.split("Staging tree left at ").nth(1))
    .map(|p| std::path::PathBuf::from(p.trim()))
    .expect("staging location reported");
  assert!(kept.join("demo-1.2.0/src/main.c").is_file());
  std::fs::remove_dir_all(kept)?;
  Ok(())
}

#[test]
fn test_auxfiles_and_configure() -> Result<()> {
  if !archiver_available() {
    return Ok(());
  }
  let repo = TestRepo::new()?;
  let build_tool = repo.tools.join("build.sh");

  let config_dir = repo.tools.join("config");
  std::fs::create_dir_all(&config_dir)?;
  std::fs::write(config_dir.join("merge_config"), "#!/bin/sh\ncat config.pkg > configure\n")?;
  std::fs::write(config_dir.join("install.sh"), "#!/bin/sh\n")?;
  {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(config_dir.join("merge_config"), std::fs::Permissions::from_mode(0o755))?;
  }

  repo.write("config.pkg", "PKG=@VERSION@\n")?;
  repo.write("extras/data/a.txt", "a\n")?;
  repo.write(
    "dist.toml",
    &format!(
      r#"package = "demo"
excludesrc = "/tests/"
build_tool = "sh {build}"
auxfiles = ["config.pkg", "extras"]
config_dir = "{config}"

[[replacements]]
tag = "@VERSION@"
replacement = "{{version}}"
files = ["config.pkg"]
"#,
      build = build_tool.display(),
      config = config_dir.display()
    ),
  )?;
  repo.commit("Add aux files")?;
  repo.tag("1.2.0")?;

  run_mkdist(&repo.path, &["dist"], &[])?;

  let archive = repo.path.join("demo-1.2.0.tar.bz2");
  let listing = list_tarball(&archive)?;
  for name in ["configure", "install.sh", "config.pkg", "extras/data/a.txt"] {
    assert!(listing.contains(&format!("demo-1.2.0/{}", name)), "missing {}", name);
  }
  // configure is produced after substitutions ran
  assert_eq!(read_from_tarball(&archive, "demo-1.2.0/configure")?, "PKG=1.2.0\n");
  // main.c is not among the rule's files
  assert!(read_from_tarball(&archive, "demo-1.2.0/src/main.c")?.contains("@VERSION@"));
  Ok(())
}
