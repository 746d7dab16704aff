//! Substitution engine
//!
//! Rules apply in declaration order over the staged tree, each one line by
//! line, so a later rule sees the output of earlier ones and no match can
//! span a newline. Files are handled as bytes; non-UTF-8 content passes
//! through untouched where nothing matches.

use crate::core::config::ReplacementConfig;
use crate::core::context::RunContext;
use crate::core::error::{DistResult, ResultExt};
use crate::core::stage::ensure_inside;
use crate::ui::progress::FileProgress;
use crate::utils::glob_expand;
use regex::bytes::{NoExpand, Regex};
use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One tag to replace, optionally restricted to some files
#[derive(Debug, Clone)]
pub struct SubstitutionRule {
  pattern: Regex,
  replacement: Vec<u8>,
  /// `$1`-style group references are honored only for regex rules
  expand_groups: bool,
  /// Staging-root relative globs; `None` means every file
  files: Option<Vec<String>>,
}

impl SubstitutionRule {
  /// Replace every occurrence of the literal `tag`
  pub fn literal(tag: &str, replacement: &str) -> DistResult<Self> {
    Ok(Self {
      pattern: Regex::new(&regex::escape(tag))?,
      replacement: replacement.as_bytes().to_vec(),
      expand_groups: false,
      files: None,
    })
  }

  /// Replace every match of the regular expression `tag`
  pub fn regex(tag: &str, replacement: &str) -> DistResult<Self> {
    Ok(Self {
      pattern: Regex::new(tag)?,
      replacement: replacement.as_bytes().to_vec(),
      expand_groups: true,
      files: None,
    })
  }

  /// Restrict the rule to files matching `patterns`
  pub fn with_files(mut self, patterns: Vec<String>) -> Self {
    self.files = Some(patterns);
    self
  }

  /// Build a rule from dist.toml, expanding `{package}`, `{version}` and `{version_bin}`
  pub fn from_config(config: &ReplacementConfig, ctx: &RunContext) -> DistResult<Self> {
    let replacement = ctx.expand_placeholders(&config.replacement);
    let rule = if config.regex {
      Self::regex(&config.tag, &replacement)?
    } else {
      Self::literal(&config.tag, &replacement)?
    };
    Ok(match config.files {
      Some(ref files) => rule.with_files(files.clone()),
      None => rule,
    })
  }

  /// Apply the rule to one line
  pub fn apply_line<'a>(&self, line: &'a [u8]) -> Cow<'a, [u8]> {
    if self.expand_groups {
      self.pattern.replace_all(line, self.replacement.as_slice())
    } else {
      self.pattern.replace_all(line, NoExpand(&self.replacement))
    }
  }

  /// Apply the rule to a whole buffer, line by line
  ///
  /// The line terminator is held back while matching, so `$` anchors at the
  /// end of the line text.
  pub fn apply(&self, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    for line in content.split_inclusive(|b| *b == b'\n') {
      let (body, terminator) = split_terminator(line);
      out.extend_from_slice(&self.apply_line(body));
      out.extend_from_slice(terminator);
    }
    out
  }

  /// Files under `topdir` this rule touches
  pub fn targets(&self, topdir: &Path) -> DistResult<Vec<PathBuf>> {
    match self.files {
      Some(ref patterns) => {
        let mut targets = Vec::new();
        for relative in glob_expand(patterns, topdir)? {
          let path = topdir.join(relative);
          ensure_inside(topdir, &path)?;
          targets.push(path);
        }
        Ok(targets)
      }
      None => {
        let mut targets = Vec::new();
        for entry in WalkDir::new(topdir).sort_by_file_name() {
          let entry = entry?;
          if entry.file_type().is_file() {
            targets.push(entry.into_path());
          }
        }
        Ok(targets)
      }
    }
  }
}

/// Build every configured rule for this run
pub fn rules_from_config(ctx: &RunContext) -> DistResult<Vec<SubstitutionRule>> {
  ctx
    .config
    .replacements
    .iter()
    .map(|config| SubstitutionRule::from_config(config, ctx))
    .collect()
}

/// Apply `rules` in order to the staged tree at `topdir`
pub fn apply_rules(topdir: &Path, rules: &[SubstitutionRule]) -> DistResult<()> {
  for (idx, rule) in rules.iter().enumerate() {
    let targets = rule.targets(topdir)?;
    let mut progress = FileProgress::interactive(targets.len(), format!("Substitution {}/{}", idx + 1, rules.len()));
    for path in targets {
      rewrite_file(&path, rule)?;
      if let Some(ref mut progress) = progress {
        progress.inc();
      }
    }
  }
  Ok(())
}

/// Rewrite `path` through a hidden temporary file next to it
///
/// The original's permission bits carry over; the rename is atomic, so an
/// interrupted run never leaves a half-written file behind.
pub fn rewrite_file(path: &Path, rule: &SubstitutionRule) -> DistResult<()> {
  let content = fs::read(path).with_context(|| format!("Failed to read {} for substitution", path.display()))?;
  let rewritten = rule.apply(&content);
  if rewritten == content {
    return Ok(());
  }

  let dir = path.parent().unwrap_or_else(|| Path::new("."));
  let permissions = fs::metadata(path)?.permissions();

  let mut temp = tempfile::Builder::new()
    .prefix(".")
    .tempfile_in(dir)
    .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
  temp.write_all(&rewritten)?;
  temp.flush()?;
  fs::set_permissions(temp.path(), permissions)?;
  temp
    .persist(path)
    .with_context(|| format!("Failed to replace {}", path.display()))?;
  Ok(())
}

/// Split a line into its text and its `\n` or `\r\n` terminator
fn split_terminator(line: &[u8]) -> (&[u8], &[u8]) {
  let cut = if line.ends_with(b"\r\n") {
    line.len() - 2
  } else if line.ends_with(b"\n") {
    line.len() - 1
  } else {
    line.len()
  };
  line.split_at(cut)
}
