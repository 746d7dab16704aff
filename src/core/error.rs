//! Error types for mkdist with contextual messages and exit codes
//!
//! Every fatal condition of a packaging run maps onto one of these categories.
//! Errors carry an optional help line that `print_error` shows beneath the
//! message, so the operator knows what to fix before re-running.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for mkdist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (vcs, build tool, archiver, I/O)
  System = 2,
  /// Policy violation (dirty tree, version missing from changelog)
  Policy = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for mkdist
#[derive(Debug)]
pub enum DistError {
  /// Configuration and environment errors
  Config(ConfigError),

  /// Version-control query errors
  Vcs(VcsError),

  /// Release policy violations
  Policy(PolicyError),

  /// External build, configure or archive step failures
  Build(BuildError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl DistError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    DistError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    DistError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  ///
  /// Categorized errors keep their category; I/O errors are folded into a
  /// message so the failing path is not lost.
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      DistError::Message { message, context, help } => DistError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      DistError::Io(e) => DistError::Message {
        message: format!("{}: {}", ctx_str, e),
        context: None,
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      DistError::Config(_) => ExitCode::User,
      DistError::Vcs(_) => ExitCode::System,
      DistError::Policy(_) => ExitCode::Policy,
      DistError::Build(_) => ExitCode::System,
      DistError::Io(_) => ExitCode::System,
      DistError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      DistError::Config(e) => e.help_message(),
      DistError::Vcs(e) => e.help_message(),
      DistError::Policy(e) => e.help_message(),
      DistError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for DistError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DistError::Config(e) => write!(f, "{}", e),
      DistError::Vcs(e) => write!(f, "{}", e),
      DistError::Policy(e) => write!(f, "{}", e),
      DistError::Build(e) => write!(f, "{}", e),
      DistError::Io(e) => write!(f, "I/O error: {}", e),
      DistError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for DistError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      DistError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for DistError {
  fn from(err: io::Error) -> Self {
    DistError::Io(err)
  }
}

impl From<String> for DistError {
  fn from(msg: String) -> Self {
    DistError::message(msg)
  }
}

impl From<&str> for DistError {
  fn from(msg: &str) -> Self {
    DistError::message(msg)
  }
}

impl From<ConfigError> for DistError {
  fn from(err: ConfigError) -> Self {
    DistError::Config(err)
  }
}

impl From<VcsError> for DistError {
  fn from(err: VcsError) -> Self {
    DistError::Vcs(err)
  }
}

impl From<PolicyError> for DistError {
  fn from(err: PolicyError) -> Self {
    DistError::Policy(err)
  }
}

impl From<BuildError> for DistError {
  fn from(err: BuildError) -> Self {
    DistError::Build(err)
  }
}

impl From<toml_edit::de::Error> for DistError {
  fn from(err: toml_edit::de::Error) -> Self {
    DistError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for DistError {
  fn from(err: serde_json::Error) -> Self {
    DistError::message(format!("JSON error: {}", err))
  }
}

impl From<regex::Error> for DistError {
  fn from(err: regex::Error) -> Self {
    DistError::message(format!("Invalid regular expression: {}", err))
  }
}

impl From<glob::PatternError> for DistError {
  fn from(err: glob::PatternError) -> Self {
    DistError::message(format!("Invalid glob pattern: {}", err))
  }
}

impl From<glob::GlobError> for DistError {
  fn from(err: glob::GlobError) -> Self {
    DistError::message(format!("Glob expansion error: {}", err))
  }
}

impl From<walkdir::Error> for DistError {
  fn from(err: walkdir::Error) -> Self {
    DistError::message(format!("Directory walk error: {}", err))
  }
}

impl From<std::path::StripPrefixError> for DistError {
  fn from(err: std::path::StripPrefixError) -> Self {
    DistError::message(format!("Path strip prefix error: {}", err))
  }
}

impl From<tempfile::PersistError> for DistError {
  fn from(err: tempfile::PersistError) -> Self {
    DistError::message(format!("Failed to replace file: {}", err))
  }
}

/// Convert anyhow::Error to DistError
impl From<anyhow::Error> for DistError {
  fn from(err: anyhow::Error) -> Self {
    DistError::message(err.to_string())
  }
}

/// Configuration and environment errors
#[derive(Debug)]
pub enum ConfigError {
  /// dist.toml not found
  NotFound { root: PathBuf },

  /// No recognized version-control marker directory
  NoRepository { root: PathBuf },

  /// No distribution file named Changelog
  NoChangelog,

  /// Field present but unusable
  InvalidField { field: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Create a dist.toml in the repository root (an empty file uses all defaults).".to_string())
      }
      ConfigError::NoRepository { .. } => Some("Run mkdist from the top of a git or mercurial checkout.".to_string()),
      ConfigError::NoChangelog => {
        Some("Track a file named Changelog under dist/ or list it in `distfiles`.".to_string())
      }
      ConfigError::InvalidField { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { root } => {
        write!(
          f,
          "No mkdist configuration found.\nExpected file: {}/dist.toml",
          root.display()
        )
      }
      ConfigError::NoRepository { root } => {
        write!(f, "Could not find git or mercurial repository in {}", root.display())
      }
      ConfigError::NoChangelog => write!(f, "No Changelog file found; aborting"),
      ConfigError::InvalidField { field, reason } => {
        write!(f, "Invalid value for '{}' in config: {}", field, reason)
      }
    }
  }
}

/// Version-control query errors
#[derive(Debug)]
pub enum VcsError {
  /// VCS command exited non-zero or could not be started
  CommandFailed { command: String, stderr: String },

  /// VCS command output did not have the expected shape
  UnexpectedOutput { command: String, output: String },
}

impl VcsError {
  fn help_message(&self) -> Option<String> {
    match self {
      VcsError::CommandFailed { command, .. } => Some(format!(
        "Make sure `{}` works in this checkout.",
        command.split_whitespace().next().unwrap_or("git")
      )),
      VcsError::UnexpectedOutput { .. } => None,
    }
  }
}

impl fmt::Display for VcsError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VcsError::CommandFailed { command, stderr } => {
        write!(f, "VCS command failed: {}\n{}", command, stderr.trim_end())
      }
      VcsError::UnexpectedOutput { command, output } => {
        write!(f, "Unexpected output from {}: {:?}", command, output)
      }
    }
  }
}

/// Release policy violations
#[derive(Debug)]
pub enum PolicyError {
  /// Working tree differs from the revision being packaged
  ModifiedTree { revision: String },

  /// Resolved version has no `Version <v>:` line in the changelog
  NoChangelogEntry { version: String, changelog: PathBuf },
}

impl PolicyError {
  fn help_message(&self) -> Option<String> {
    match self {
      PolicyError::ModifiedTree { .. } => {
        Some("Commit or revert your changes, or use TESTVERSION=xxx for testing.".to_string())
      }
      PolicyError::NoChangelogEntry { version, .. } => {
        Some(format!("Add a line starting with `Version {}:` to the changelog.", version))
      }
    }
  }
}

impl fmt::Display for PolicyError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PolicyError::ModifiedTree { revision } => {
        write!(
          f,
          "It seems you have a modified working tree (revision {}); packaging aborted",
          revision
        )
      }
      PolicyError::NoChangelogEntry { version, changelog } => {
        write!(
          f,
          "{} has no information for version {}; aborting",
          changelog.display(),
          version
        )
      }
    }
  }
}

/// External build, configure or archive failures
#[derive(Debug)]
pub enum BuildError {
  /// `<tool> -C <dir> clean` failed
  CleanFailed { dir: PathBuf },

  /// `<tool> -C <dir> all` failed
  BuildFailed { dir: PathBuf },

  /// A lifecycle hook failed
  HookFailed { hook: String, reason: String },

  /// Any other external tool failure (archiver, configure merge)
  ToolFailed { tool: String, reason: String },
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::CleanFailed { dir } => write!(f, "Failed to clean directory {}", dir.display()),
      BuildError::BuildFailed { dir } => write!(f, "Failed to build directory {}", dir.display()),
      BuildError::HookFailed { hook, reason } => write!(f, "{} hook failed: {}", hook, reason),
      BuildError::ToolFailed { tool, reason } => write!(f, "{} failed: {}", tool, reason),
    }
  }
}

/// Result type alias for mkdist
pub type DistResult<T> = Result<T, DistError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> DistResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> DistResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<DistError>,
{
  fn context(self, ctx: impl Into<String>) -> DistResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> DistResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &DistError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
