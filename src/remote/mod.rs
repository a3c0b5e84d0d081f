//! External collaborators: hosting platform, network fetch, signing
//!
//! - **github**: `HostingPlatform` over the `gh` CLI
//! - **fetch**: `Fetcher` over blocking HTTP
//! - **signing**: `Signer` over `gpg`

pub mod fetch;
pub mod github;
pub mod signing;

pub use fetch::{Fetcher, HttpFetcher};
pub use github::{GhCli, HostingPlatform};
pub use signing::{GpgSigner, Signer};

use serde::{Deserialize, Serialize};

/// Status of one CI run, flattened from the platform's status + conclusion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Queued,
  InProgress,
  Waiting,
  Success,
  Failure,
  TimedOut,
  Cancelled,
  Skipped,
  Neutral,
  ActionRequired,
  StartupFailure,
  Stale,
}

/// Where a run stands for gating purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
  Pending,
  Passed,
  Failed,
}

impl RunStatus {
  /// Map GitHub's `status` / `conclusion` pair; unknown values are treated
  /// as still pending so they can never admit a release
  pub fn from_github(status: &str, conclusion: Option<&str>) -> Self {
    match status {
      "completed" => match conclusion.unwrap_or_default() {
        "success" => RunStatus::Success,
        "failure" => RunStatus::Failure,
        "timed_out" => RunStatus::TimedOut,
        "cancelled" => RunStatus::Cancelled,
        "skipped" => RunStatus::Skipped,
        "neutral" => RunStatus::Neutral,
        "action_required" => RunStatus::ActionRequired,
        "startup_failure" => RunStatus::StartupFailure,
        "stale" => RunStatus::Stale,
        _ => RunStatus::InProgress,
      },
      "queued" | "requested" | "pending" => RunStatus::Queued,
      "waiting" => RunStatus::Waiting,
      _ => RunStatus::InProgress,
    }
  }

  pub fn phase(&self) -> RunPhase {
    match self {
      RunStatus::Queued | RunStatus::InProgress | RunStatus::Waiting | RunStatus::ActionRequired => {
        RunPhase::Pending
      }
      RunStatus::Success | RunStatus::Skipped | RunStatus::Neutral => RunPhase::Passed,
      RunStatus::Failure
      | RunStatus::TimedOut
      | RunStatus::Cancelled
      | RunStatus::StartupFailure
      | RunStatus::Stale => RunPhase::Failed,
    }
  }
}

/// One CI run reported for a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiRun {
  pub name: String,
  pub status: RunStatus,
}

impl CiRun {
  pub fn new(name: impl Into<String>, status: RunStatus) -> Self {
    Self {
      name: name.into(),
      status,
    }
  }
}
