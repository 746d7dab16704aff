//! Package descriptor loaded from dist.toml
//!
//! Searched in order: dist.toml, .dist.toml, .config/dist.toml
//!
//! ```toml
//! package = "tilde"
//! srcdirs = ["src"]
//! excludesrc = "/(?:test|\\.gitignore)"
//! auxfiles = ["config.pkg", "mkconfig"]
//! extrabuilddirs = ["doc"]
//!
//! [hooks]
//! prebuild = "make -C src/.objects gen"
//!
//! [[replacements]]
//! tag = "<VERSION>"
//! replacement = "{version}"
//! files = ["src/*.c"]
//! ```

use crate::core::error::{ConfigError, DistError, DistResult, ResultExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for one package
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DistConfig {
  /// Package (and tarball) name; defaults to the repository directory name
  #[serde(default)]
  pub package: Option<String>,

  /// Directories holding sources; auto-discovered when unset
  #[serde(default)]
  pub srcdirs: Option<Vec<String>>,

  /// Regex of tracked files to drop from the source set
  #[serde(default)]
  pub excludesrc: Option<String>,

  /// Non-source distribution files (globs); auto-discovered when unset
  #[serde(default)]
  pub distfiles: Option<Vec<String>>,

  /// Regex of files to drop from auto-discovered distribution files
  #[serde(default)]
  pub excludedist: Option<String>,

  /// Extra files (globs) appended to the source set
  #[serde(default)]
  pub auxsources: Vec<String>,

  /// Files and directories (globs) copied verbatim into the tarball
  #[serde(default)]
  pub auxfiles: Vec<String>,

  /// Directories built alongside the source directories
  #[serde(default)]
  pub extrabuilddirs: Vec<String>,

  /// Build tool invoked as `<tool> -C <dir> clean|all`
  #[serde(default = "default_build_tool")]
  pub build_tool: String,

  /// Generate the configure/install script pair in the tarball
  #[serde(default = "default_create_configure")]
  pub create_configure: bool,

  /// Directory holding `merge_config` and `install.sh`
  /// (default: `<executable dir>/../config`)
  #[serde(default)]
  pub config_dir: Option<PathBuf>,

  /// Lifecycle hooks
  #[serde(default)]
  pub hooks: HookConfig,

  /// Ordered substitution rules applied to the staged tree
  #[serde(default)]
  pub replacements: Vec<ReplacementConfig>,
}

fn default_build_tool() -> String {
  "make".to_string()
}

fn default_create_configure() -> bool {
  true
}

/// Shell commands run at fixed points of the pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookConfig {
  /// Before `clean`/`all` run over the build directories
  #[serde(default)]
  pub prebuild: Option<String>,

  /// After every build directory was built
  #[serde(default)]
  pub postbuild: Option<String>,

  /// After sources, distribution and auxiliary files were staged
  #[serde(default)]
  pub copy: Option<String>,

  /// Right before the tarball is written
  #[serde(default)]
  pub finalize: Option<String>,
}

/// One substitution rule as written in dist.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplacementConfig {
  pub tag: String,

  /// May reference `{package}`, `{version}` and `{version_bin}`; write `{{`
  /// and `}}` for literal braces
  pub replacement: String,

  #[serde(default)]
  pub regex: bool,

  /// Staging-root relative globs; every staged file when unset
  #[serde(default)]
  pub files: Option<Vec<String>>,
}

impl DistConfig {
  /// Find config file in search order: dist.toml, .dist.toml, .config/dist.toml
  pub fn find_config_path(root: &Path) -> Option<PathBuf> {
    let candidates = [
      root.join("dist.toml"),
      root.join(".dist.toml"),
      root.join(".config").join("dist.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load and validate the config for the repository at `root`
  pub fn load(root: &Path) -> DistResult<Self> {
    let config_path = Self::find_config_path(root).ok_or_else(|| {
      DistError::Config(ConfigError::NotFound {
        root: root.to_path_buf(),
      })
    })?;

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config = Self::parse(&content).with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config.validate()?;
    Ok(config)
  }

  /// Parse config text without validating it
  pub fn parse(content: &str) -> DistResult<Self> {
    Ok(toml_edit::de::from_str(content)?)
  }

  /// Check fields that serde cannot check
  pub fn validate(&self) -> DistResult<()> {
    if let Some(ref package) = self.package
      && (package.is_empty() || package.contains('/') || package.contains('\\'))
    {
      return Err(invalid("package", format!("'{}' is not a usable directory name", package)));
    }

    for (field, pattern) in [("excludesrc", &self.excludesrc), ("excludedist", &self.excludedist)] {
      if let Some(pattern) = pattern {
        Regex::new(pattern).map_err(|e| invalid(field, e.to_string()))?;
      }
    }

    if self.build_tool.trim().is_empty() {
      return Err(invalid("build_tool", "must not be empty"));
    }

    for (idx, rule) in self.replacements.iter().enumerate() {
      if rule.tag.is_empty() {
        return Err(invalid(&format!("replacements[{}].tag", idx), "must not be empty"));
      }
      if rule.regex {
        Regex::new(&rule.tag).map_err(|e| invalid(&format!("replacements[{}].tag", idx), e.to_string()))?;
      }
    }

    Ok(())
  }

  /// Package name, falling back to the repository directory name
  pub fn package_name(&self, root: &Path) -> DistResult<String> {
    if let Some(ref package) = self.package {
      return Ok(package.clone());
    }

    root
      .file_name()
      .map(|name| name.to_string_lossy().to_string())
      .filter(|name| !name.is_empty())
      .ok_or_else(|| invalid("package", format!("cannot derive a name from {}", root.display())))
  }

  /// Directory holding `merge_config` and `install.sh`
  pub fn config_dir(&self) -> DistResult<PathBuf> {
    if let Some(ref dir) = self.config_dir {
      return Ok(dir.clone());
    }

    let exe = std::env::current_exe().context("Failed to locate the mkdist executable")?;
    let exe_dir = exe
      .parent()
      .ok_or_else(|| DistError::message("mkdist executable has no parent directory"))?;
    Ok(exe_dir.join("..").join("config"))
  }
}

fn invalid(field: &str, reason: impl Into<String>) -> DistError {
  DistError::Config(ConfigError::InvalidField {
    field: field.to_string(),
    reason: reason.into(),
  })
}
