//! Release readiness gate
//!
//! An ordered chain of checks, cheapest first, stopping at the first failure:
//!
//! 1. target version is `MAJOR.MINOR.PATCH`
//! 2. the immediately preceding version is already tagged (unless it is 0.0.0)
//! 3. the changelog at the source revision has an entry for the version
//! 4. the canonical version file at the source revision declares the version
//! 5. CI for the source revision finished green, ignoring the release workflow
//!
//! A denial is a normal outcome and comes back as [`GateVerdict::Rejected`];
//! `Err` is reserved for collaborator failures (network, gh, bad input that
//! can't even be gated).

use crate::core::config::{ProjectDescriptor, ProjectRegistry};
use crate::core::error::{ErrorKind, RelResult};
use crate::release::changelog::ChangelogResolver;
use crate::release::version::{is_well_formed_version, previous_version};
use crate::release::version_file::VersionFileReader;
use crate::remote::{Fetcher, HostingPlatform, RunPhase};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Input to one gating decision
#[derive(Debug, Clone)]
pub struct ReleaseCandidate<'a> {
  pub project: &'a ProjectDescriptor,
  pub target_version: String,
  pub source_revision: String,
}

impl<'a> ReleaseCandidate<'a> {
  pub fn new(project: &'a ProjectDescriptor, target_version: impl Into<String>, source_revision: impl Into<String>) -> Self {
    Self {
      project,
      target_version: target_version.into(),
      source_revision: source_revision.into(),
    }
  }

  pub fn tag(&self) -> String {
    self.project.tag_for(&self.target_version)
  }
}

/// Why a candidate was denied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
  MalformedVersion,
  MissingPredecessorTag { tag: String },
  MissingChangelogEntry,
  MissingVersionFile,
  VersionMismatch { declared: Option<String> },
  CiPending { runs: Vec<String> },
  CiFailed { runs: Vec<String> },
  CiNotRun,
}

/// A denial with the context an operator needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
  pub project: String,
  pub version: String,
  pub revision: String,
  #[serde(flatten)]
  pub reason: RejectReason,
}

impl Rejection {
  pub fn kind(&self) -> ErrorKind {
    match self.reason {
      RejectReason::MalformedVersion => ErrorKind::MalformedVersion,
      RejectReason::MissingPredecessorTag { .. } => ErrorKind::MissingPredecessorTag,
      RejectReason::MissingChangelogEntry => ErrorKind::MissingChangelogEntry,
      RejectReason::MissingVersionFile => ErrorKind::MissingVersionFile,
      RejectReason::VersionMismatch { .. } => ErrorKind::VersionMismatch,
      RejectReason::CiPending { .. } => ErrorKind::CIPending,
      RejectReason::CiFailed { .. } => ErrorKind::CIFailed,
      RejectReason::CiNotRun => ErrorKind::CINotRun,
    }
  }

  pub fn help_message(&self) -> Option<String> {
    match &self.reason {
      RejectReason::MalformedVersion => Some("Pass a bare version like 2.1.0, without the tag prefix.".to_string()),
      RejectReason::MissingPredecessorTag { tag } => {
        Some(format!("Release {} first; versions can't be skipped.", tag))
      }
      RejectReason::MissingChangelogEntry => Some(format!(
        "Add a changelog entry for {} and push it before releasing.",
        self.version
      )),
      RejectReason::VersionMismatch { .. } => Some(format!(
        "Bump the declared version to {} in the version file.",
        self.version
      )),
      RejectReason::MissingVersionFile => {
        Some("Add `version_file` to the project in relman.toml once it has one.".to_string())
      }
      RejectReason::CiPending { .. } => Some("Wait for CI to finish and retry.".to_string()),
      RejectReason::CiFailed { .. } => Some("Fix CI on this revision, or release a different one.".to_string()),
      RejectReason::CiNotRun => Some("Trigger CI for this revision and retry once it is green.".to_string()),
    }
  }
}

impl fmt::Display for Rejection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Can't release {} {} at {}: ", self.project, self.version, self.revision)?;
    match &self.reason {
      RejectReason::MalformedVersion => write!(f, "'{}' is not MAJOR.MINOR.PATCH", self.version),
      RejectReason::MissingPredecessorTag { tag } => write!(f, "previous tag {} does not exist", tag),
      RejectReason::MissingChangelogEntry => write!(f, "no changelog entry for {}", self.version),
      RejectReason::MissingVersionFile => write!(f, "project has no canonical version file"),
      RejectReason::VersionMismatch { declared } => write!(
        f,
        "version file declares {}",
        declared.as_deref().unwrap_or("no version")
      ),
      RejectReason::CiPending { runs } => write!(f, "CI still running ({})", runs.join(", ")),
      RejectReason::CiFailed { runs } => write!(f, "CI failed ({})", runs.join(", ")),
      RejectReason::CiNotRun => write!(f, "no completed CI run"),
    }
  }
}

/// Outcome of one gating decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
  Admitted,
  Rejected(Rejection),
}

impl GateVerdict {
  pub fn is_admitted(&self) -> bool {
    matches!(self, GateVerdict::Admitted)
  }
}

pub struct ReleaseGate<'a> {
  registry: &'a ProjectRegistry,
  hosting: &'a dyn HostingPlatform,
  fetcher: &'a dyn Fetcher,
}

impl<'a> ReleaseGate<'a> {
  pub fn new(registry: &'a ProjectRegistry, hosting: &'a dyn HostingPlatform, fetcher: &'a dyn Fetcher) -> Self {
    Self {
      registry,
      hosting,
      fetcher,
    }
  }

  pub fn evaluate(&self, candidate: &ReleaseCandidate<'_>) -> RelResult<GateVerdict> {
    let project = candidate.project;
    let version = candidate.target_version.as_str();
    let revision = candidate.source_revision.as_str();

    let reject = |reason: RejectReason| {
      debug!(project = %project.name, %version, ?reason, "gate rejected");
      Ok(GateVerdict::Rejected(Rejection {
        project: project.name.clone(),
        version: version.to_string(),
        revision: revision.to_string(),
        reason,
      }))
    };

    // 1. shape of the version; nothing remote happens before this passes
    if !is_well_formed_version(version) {
      return reject(RejectReason::MalformedVersion);
    }

    // 2. no skipping versions
    let previous = previous_version(version)?;
    if previous != "0.0.0" {
      let previous_tag = project.tag_for(&previous);
      if !self.hosting.tag_exists(&project.repository, &previous_tag)? {
        return reject(RejectReason::MissingPredecessorTag { tag: previous_tag });
      }
    }

    // 3. changelog entry at the revision being released
    let changelog = ChangelogResolver::new(self.registry, self.fetcher).get_changelog(&project.name, version, revision)?;
    if changelog.is_empty() {
      return reject(RejectReason::MissingChangelogEntry);
    }

    // 4. declared version must match exactly (string equality)
    if !project.has_canonical_version_file() {
      return reject(RejectReason::MissingVersionFile);
    }
    let declared = VersionFileReader::new(self.registry, self.fetcher).declared_version(project, revision)?;
    if declared.as_deref() != Some(version) {
      return reject(RejectReason::VersionMismatch { declared });
    }

    // 5. CI, minus the release workflow itself
    let release_workflow = &self.registry.settings.release_workflow;
    let runs: Vec<_> = self
      .hosting
      .ci_status(&project.repository, revision)?
      .into_iter()
      .filter(|run| &run.name != release_workflow)
      .collect();

    let names_in = |phase: RunPhase| -> Vec<String> {
      runs
        .iter()
        .filter(|run| run.status.phase() == phase)
        .map(|run| run.name.clone())
        .collect()
    };

    let pending = names_in(RunPhase::Pending);
    if !pending.is_empty() {
      return reject(RejectReason::CiPending { runs: pending });
    }
    let failed = names_in(RunPhase::Failed);
    if !failed.is_empty() {
      return reject(RejectReason::CiFailed { runs: failed });
    }
    if names_in(RunPhase::Passed).is_empty() {
      return reject(RejectReason::CiNotRun);
    }

    debug!(project = %project.name, %version, "gate admitted");
    Ok(GateVerdict::Admitted)
  }
}
