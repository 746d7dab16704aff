//! Source and distribution file-set resolution
//!
//! Both resolvers work on the tracked-file list from the VCS and return
//! [`StagedFile`]s: the path to read in the checkout plus the path it takes
//! inside the staging root. Output keeps insertion order.

use crate::core::error::{ConfigError, DistError, DistResult};
use crate::utils::{glob_expand, in_dirs, strip_segment, unique_in_order};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// Hidden directory where generated lexer/parser outputs live
pub const OBJECTS_DIR: &str = ".objects";

/// Prefix shared by auto-discovered source directories
pub const SRCDIR_PREFIX: &str = "src";

/// Root of non-code distribution files; stripped when staging
pub const DIST_ROOT: &str = "dist";

/// Root of manual pages
pub const MAN_ROOT: &str = "man";

/// Subdirectory of [`MAN_ROOT`] holding rendered manual pages
pub const MAN_OUTPUT: &str = "man/output";

/// Lexer (`.l`, `.ll`) and parser (`.g`, `.gg`) generator inputs
const GENERATOR_EXTENSIONS: &[&str] = &["l", "ll", "g", "gg"];

/// Extensions a generator may produce
const GENERATED_EXTENSIONS: &[&str] = &["c", "cc", "h"];

/// A file to copy into the staging root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StagedFile {
  /// Path in the checkout, relative to the repository root
  pub origin: String,
  /// Path inside the staging root
  pub target: String,
}

impl StagedFile {
  /// Source file: the hidden objects segment disappears from the target
  pub fn source(origin: impl Into<String>) -> Self {
    let origin = origin.into();
    let target = strip_segment(&origin, OBJECTS_DIR);
    Self { origin, target }
  }

  /// Distribution file: `dist/` is stripped and `man/output/` collapses to `man/`
  pub fn dist(origin: impl Into<String>) -> Self {
    let origin = origin.into();
    let without_root = origin
      .strip_prefix(&format!("{}/", DIST_ROOT))
      .unwrap_or(&origin)
      .to_string();
    let target = match without_root.strip_prefix(&format!("{}/", MAN_OUTPUT)) {
      Some(rest) => format!("{}/{}", MAN_ROOT, rest),
      None => without_root.clone(),
    };
    Self { origin, target }
  }
}

/// Top-level directories starting with `src` that hold tracked files
///
/// Order follows the first tracked file seen in each directory.
pub fn discover_srcdirs(tracked: &[String]) -> Vec<String> {
  unique_in_order(
    tracked
      .iter()
      .filter_map(|name| name.rsplit_once('/').map(|(dir, _)| dir))
      .filter_map(|dir| dir.split('/').next())
      .filter(|top| top.starts_with(SRCDIR_PREFIX))
      .map(str::to_string),
  )
}

/// Compile an optional exclusion pattern
pub fn compile_exclude(field: &str, pattern: Option<&str>) -> DistResult<Option<Regex>> {
  pattern
    .map(|p| {
      Regex::new(p).map_err(|e| {
        DistError::Config(ConfigError::InvalidField {
          field: field.to_string(),
          reason: e.to_string(),
        })
      })
    })
    .transpose()
}

/// Resolve the tracked sources under `srcdirs`, plus generated companions
///
/// For every `.l`/`.ll`/`.g`/`.gg` file, `<stem>.c`, `<stem>.cc` and
/// `<stem>.h` are looked for next to it and in the sibling `.objects` directory;
/// each one present under `root` joins the set right after its input.
pub fn resolve_sources(
  root: &Path,
  tracked: &[String],
  srcdirs: &[String],
  exclude: Option<&Regex>,
) -> Vec<StagedFile> {
  let candidates = unique_in_order(
    tracked
      .iter()
      .filter(|name| in_dirs(name, srcdirs))
      .filter(|name| exclude.is_none_or(|re| !re.is_match(name)))
      .cloned(),
  );

  let mut seen = HashSet::new();
  let mut sources = Vec::new();
  let mut push = |file: StagedFile, sources: &mut Vec<StagedFile>| {
    if seen.insert(file.target.clone()) {
      sources.push(file);
    }
  };

  for name in candidates {
    let companions = generated_companions(&name);
    push(StagedFile::source(name), &mut sources);

    for companion in companions {
      if root.join(&companion).is_file() {
        push(StagedFile::source(companion), &mut sources);
      }
    }
  }

  sources
}

/// Candidate generated files for a generator input, in lookup order
fn generated_companions(name: &str) -> Vec<String> {
  let (dir, file) = match name.rsplit_once('/') {
    Some((dir, file)) => (Some(dir), file),
    None => (None, name),
  };
  let Some((stem, ext)) = file.rsplit_once('.') else {
    return Vec::new();
  };
  if stem.is_empty() || !GENERATOR_EXTENSIONS.contains(&ext) {
    return Vec::new();
  }

  let prefix = dir.map(|d| format!("{}/", d)).unwrap_or_default();

  let siblings = GENERATED_EXTENSIONS
    .iter()
    .map(|gen_ext| format!("{}{}.{}", prefix, stem, gen_ext));
  let hidden = GENERATED_EXTENSIONS
    .iter()
    .map(|gen_ext| format!("{}{}/{}.{}", prefix, OBJECTS_DIR, stem, gen_ext));

  siblings.chain(hidden).collect()
}

/// Expand configured extra sources (globs) into staged files
pub fn resolve_aux_sources(root: &Path, patterns: &[String]) -> DistResult<Vec<StagedFile>> {
  Ok(
    glob_expand(patterns, root)?
      .into_iter()
      .map(StagedFile::source)
      .collect(),
  )
}

/// Resolve an explicit distribution-file list
///
/// Globs expand in place; entries matching nothing pass through literally.
pub fn resolve_explicit_distfiles(root: &Path, patterns: &[String]) -> DistResult<Vec<StagedFile>> {
  Ok(
    glob_expand(patterns, root)?
      .into_iter()
      .map(StagedFile::dist)
      .collect(),
  )
}

/// Auto-discover distribution files under `dist/` and `man/`
///
/// Manual pages tracked as `man/<name>.<section>.txt` are replaced by their
/// rendered counterpart `man/output/<name>.<section>`; the `.txt` sources and
/// any `Makefile` under `man/` are not shipped. Rendered pages come first.
pub fn discover_distfiles(tracked: &[String], exclude: Option<&Regex>) -> DistResult<Vec<StagedFile>> {
  let man_page = Regex::new(r"^man/(.*\.\d)\.txt$")?;
  let man_makefile = Regex::new(r"^man/(?:.*/)?Makefile$")?;

  let dist_prefix = format!("{}/", DIST_ROOT);
  let man_prefix = format!("{}/", MAN_ROOT);
  let files: Vec<&String> = tracked
    .iter()
    .filter(|name| name.starts_with(&dist_prefix) || name.starts_with(&man_prefix))
    .filter(|name| exclude.is_none_or(|re| !re.is_match(name)))
    .collect();

  let rendered = files.iter().filter_map(|name| {
    man_page
      .captures(name)
      .map(|caps| format!("{}/{}", MAN_OUTPUT, &caps[1]))
  });
  let shipped = files
    .iter()
    .filter(|name| !man_page.is_match(name) && !man_makefile.is_match(name))
    .map(|name| name.to_string());

  Ok(rendered.chain(shipped).map(StagedFile::dist).collect())
}

/// The first distribution file named `Changelog`
pub fn find_changelog(distfiles: &[StagedFile]) -> DistResult<&StagedFile> {
  distfiles
    .iter()
    .find(|file| Path::new(&file.origin).file_name().is_some_and(|name| name == "Changelog"))
    .ok_or(DistError::Config(ConfigError::NoChangelog))
}
