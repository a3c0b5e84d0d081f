//! Progress indicators for long-running operations
//!
//! Uses `linya`, which draws on stderr and is safe to share across the
//! rayon workers that resolve dependencies in parallel.

use linya::{Bar, Progress};
use std::io::IsTerminal;
use std::sync::{Arc, Mutex};

/// One bar ticked from many threads
#[derive(Clone)]
pub struct SharedProgress {
  progress: Arc<Mutex<Progress>>,
  bar: Arc<Bar>,
}

impl SharedProgress {
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      progress: Arc::new(Mutex::new(progress)),
      bar: Arc::new(bar),
    }
  }

  /// A bar only when stderr is interactive, so CI logs stay clean
  pub fn for_terminal(total: usize, label: impl Into<String>) -> Option<Self> {
    (total > 0 && std::io::stderr().is_terminal()).then(|| Self::new(total, label))
  }

  /// Increment by 1 (thread-safe). A poisoned lock just stops drawing.
  pub fn inc(&self) {
    if let Ok(mut progress) = self.progress.lock() {
      progress.inc_and_draw(&self.bar, 1);
    }
  }
}
