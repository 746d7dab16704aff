mod commands;
mod core;
mod ui;
mod utils;

use clap::{Args, Parser, Subcommand};
use crate::commands::DistOptions;
use crate::core::error::{DistError, print_error};
use crate::core::version::DEFAULT_VERSION_BIN;
use std::path::PathBuf;

/// Package a version-controlled source tree into a release tarball
#[derive(Parser)]
#[command(name = "mkdist")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Run as if mkdist was started in DIR
  #[arg(short = 'C', long, global = true, value_name = "DIR")]
  directory: Option<PathBuf>,

  /// Options for the default `dist` workflow
  #[command(flatten)]
  dist: DistArgs,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Args, Clone)]
struct DistArgs {
  /// Package VERSION as a test build (skips the clean-tree check)
  #[arg(long, env = "TESTVERSION", value_name = "VERSION")]
  test_version: Option<String>,

  /// Skip clean/build (test builds only)
  #[arg(long, env = "NOBUILD", value_parser = clap::builder::FalseyValueParser::new())]
  no_build: bool,

  /// Keep the staging directory after a successful run
  #[arg(long)]
  keep_staging: bool,
}

impl DistArgs {
  fn into_options(self) -> DistOptions {
    DistOptions {
      test_version: non_empty(self.test_version),
      no_build: self.no_build,
      keep_staging: self.keep_staging,
    }
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Build, stage and pack a release tarball (default)
  Dist(DistArgs),

  /// Show what a packaging run would do, without doing it
  Plan {
    /// Use VERSION as a test-build override
    #[arg(long, env = "TESTVERSION", value_name = "VERSION")]
    test_version: Option<String>,
    /// Output the plan in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Print the packed 0xMMmmpp version literal
  VersionBin {
    /// Use VERSION as a test-build override
    #[arg(long, env = "TESTVERSION", value_name = "VERSION")]
    test_version: Option<String>,
    /// Literal printed when the version is not major.minor[.patch]
    #[arg(long, default_value = DEFAULT_VERSION_BIN)]
    default: String,
  },
}

/// An empty override counts as no override
fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.is_empty())
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = Cli::parse();

  let root = match resolve_root(cli.directory) {
    Ok(root) => root,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    None => commands::run_dist(&root, &cli.dist.into_options()),
    Some(Commands::Dist(args)) => commands::run_dist(&root, &args.into_options()),
    Some(Commands::Plan { test_version, json }) => {
      commands::run_plan(&root, non_empty(test_version).as_deref(), json)
    }
    Some(Commands::VersionBin { test_version, default }) => {
      commands::run_version_bin(&root, non_empty(test_version).as_deref(), &default)
    }
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

/// Absolute repository root: `-C DIR` or the current directory
fn resolve_root(directory: Option<PathBuf>) -> Result<PathBuf, DistError> {
  let dir = match directory {
    Some(dir) => dir,
    None => std::env::current_dir().map_err(|e| DistError::message(format!("Failed to get current directory: {}", e)))?,
  };
  dir
    .canonicalize()
    .map_err(|e| DistError::message(format!("Cannot use directory {}: {}", dir.display(), e)))
}

fn handle_error(err: DistError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
