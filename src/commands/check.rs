//! `relman check` - run the release gate without releasing
//!
//! Exits 0 when the candidate is admitted and 3 with the rejection reason
//! otherwise, so CI can gate on it directly.

use crate::core::context::ReleaseContext;
use crate::core::error::{RelError, RelResult};
use crate::release::{GateVerdict, ReleaseCandidate, ReleaseGate};
use std::path::Path;

/// Run the check command
///
/// `revision` is resolved to a commit through `repo_path` when one is given;
/// otherwise it must already be a commit id (CI status is looked up by commit).
pub fn run_check(
  ctx: &ReleaseContext,
  project_name: &str,
  version: &str,
  revision: &str,
  repo_path: Option<&Path>,
) -> RelResult<()> {
  let registry = ctx.require_registry()?;
  let project = registry.project(project_name)?;

  let commit = match repo_path {
    Some(path) => ctx.git.resolve_ref_to_commit(path, revision)?,
    None => revision.to_string(),
  };

  let candidate = ReleaseCandidate::new(project, version, commit);
  match ReleaseGate::new(registry, ctx.hosting.as_ref(), ctx.fetcher.as_ref()).evaluate(&candidate)? {
    GateVerdict::Admitted => {
      println!(
        "✅ {} can be released from {}",
        candidate.tag(),
        candidate.source_revision
      );
      Ok(())
    }
    GateVerdict::Rejected(rejection) => Err(RelError::Gate(rejection)),
  }
}
