//! Progress indicators for staging
//!
//! Uses `linya` for allocation-free progress bars

use linya::{Bar, Progress};
use std::io::IsTerminal;

/// Progress bar wrapper for file copies
pub struct FileProgress {
  progress: Progress,
  bar: Bar,
}

impl FileProgress {
  /// Create a new progress bar for `total` files
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self { progress, bar }
  }

  /// Progress bar only when stderr is a terminal and there is work to show
  pub fn interactive(total: usize, label: impl Into<String>) -> Option<Self> {
    (total > 0 && std::io::stderr().is_terminal()).then(|| Self::new(total, label))
  }

  /// Increment progress by 1
  pub fn inc(&mut self) {
    self.progress.inc_and_draw(&self.bar, 1);
  }
}
