//! Path helpers shared by the file resolvers and the staging steps
//!
//! Repository paths are handled as `/`-separated strings relative to the
//! repository root, exactly as the VCS lists them.

use crate::core::error::DistResult;
use std::path::Path;

/// True if `name` lies strictly inside one of `dirs`
///
/// Matches on a directory prefix followed by `/`, so `src` does not claim
/// `srclib/a.c` and a directory never contains itself.
pub fn in_dirs(name: &str, dirs: &[String]) -> bool {
  dirs.iter().any(|dir| {
    let dir = dir.trim_end_matches('/');
    name
      .strip_prefix(dir)
      .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
  })
}

/// Expand glob patterns relative to `base`
///
/// Matches come back relative to `base`, in glob's sorted order. A pattern
/// matching nothing is kept literally so it can name a file that a later step
/// is expected to create.
pub fn glob_expand(patterns: &[String], base: &Path) -> DistResult<Vec<String>> {
  let escaped_base = glob::Pattern::escape(&base.to_string_lossy());
  let mut result = Vec::new();

  for pattern in patterns {
    let full = format!("{}/{}", escaped_base.trim_end_matches('/'), pattern);
    let mut matched = Vec::new();
    for entry in glob::glob(&full)? {
      let path = entry?;
      let relative = path.strip_prefix(base)?;
      matched.push(path_to_slash(relative));
    }

    if matched.is_empty() {
      result.push(pattern.clone());
    } else {
      result.extend(matched);
    }
  }

  Ok(result)
}

/// Render a relative path with `/` separators
pub fn path_to_slash(path: &Path) -> String {
  path
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}

/// Remove the first path segment equal to `segment`
pub fn strip_segment(path: &str, segment: &str) -> String {
  let mut removed = false;
  path
    .split('/')
    .filter(|part| {
      if !removed && *part == segment {
        removed = true;
        false
      } else {
        true
      }
    })
    .collect::<Vec<_>>()
    .join("/")
}

/// Deduplicate while keeping the first occurrence of each item
pub fn unique_in_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
  let mut seen = std::collections::HashSet::new();
  items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}
