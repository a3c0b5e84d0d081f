//! `relman deps` - pinned dependency status and bumps
//!
//! `status` prints one GitHub Actions annotation per dependency so results
//! show up on the workflow summary; `--json` prints the snapshots instead.
//! `update` bumps a single dependency on its own branch and opens a PR.

use crate::core::context::ReleaseContext;
use crate::core::error::{RelError, RelResult};
use crate::deps::{DependencyUpdater, SnapshotResolver, SnapshotStatus, UpdateOutcome, VersionSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// JSON shape of `deps status --json`
#[derive(Debug, Serialize)]
pub struct DepsReport<'a> {
  pub project: &'a str,
  pub resolved_at: DateTime<Utc>,
  pub dependencies: Vec<DependencyEntry<'a>>,
}

#[derive(Debug, Serialize)]
pub struct DependencyEntry<'a> {
  #[serde(flatten)]
  pub snapshot: &'a VersionSnapshot,
  pub status: SnapshotStatus,
}

/// Run `deps status`
pub fn run_deps_status(
  ctx: &ReleaseContext,
  project_name: &str,
  repo_path: &Path,
  dependency: Option<&str>,
  json: bool,
) -> RelResult<()> {
  let registry = ctx.require_registry()?;
  let project = registry.project(project_name)?;

  let snapshots = SnapshotResolver::new(ctx.git.as_ref(), ctx.hosting.as_ref())
    .with_progress(!json)
    .combined_snapshots(repo_path, project, dependency)?;

  if json {
    let report = DepsReport {
      project: &project.name,
      resolved_at: Utc::now(),
      dependencies: snapshots
        .iter()
        .map(|snapshot| DependencyEntry {
          snapshot,
          status: snapshot.status(),
        })
        .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  if snapshots.is_empty() {
    return Ok(());
  }
  println!("::group::Versions");
  for snapshot in &snapshots {
    println!("{}", annotation(snapshot));
  }
  println!("::endgroup::");
  Ok(())
}

/// Run `deps update`
pub fn run_deps_update(
  ctx: &ReleaseContext,
  project_name: &str,
  repo_path: &Path,
  dependency: &str,
  dry_run: bool,
) -> RelResult<()> {
  let registry = ctx.require_registry()?;
  let project = registry.project(project_name)?;

  let snapshot = SnapshotResolver::new(ctx.git.as_ref(), ctx.hosting.as_ref())
    .combined_snapshots(repo_path, project, Some(dependency))?
    .into_iter()
    .next()
    .ok_or_else(|| RelError::message(format!("No snapshot resolved for '{}'", dependency)))?;

  let outcome = DependencyUpdater::new(ctx.git.as_ref(), ctx.hosting.as_ref()).update(
    repo_path,
    project,
    &snapshot,
    dry_run,
  )?;

  match outcome {
    UpdateOutcome::UpToDate => println!("✅ {} is up to date", dependency),
    UpdateOutcome::Unknown => {
      return Err(RelError::with_help(
        format!("Can't determine the latest version of {}", dependency),
        "Run `relman deps status --json` to see which lookup failed.",
      ));
    }
    UpdateOutcome::Ahead => println!(
      "⚠️  {} {} is newer than the latest release; not touching it",
      dependency,
      snapshot.current_version.as_deref().unwrap_or("?")
    ),
    UpdateOutcome::Incomparable => println!(
      "⚠️  {} {} can't be ordered against {}; not touching it",
      dependency,
      snapshot.current_version.as_deref().unwrap_or("?"),
      snapshot.latest_version.as_deref().unwrap_or("?")
    ),
    UpdateOutcome::BranchExists { branch } => println!("⏭️  {} already exists on origin", branch),
    UpdateOutcome::Planned { branch, from, to } => {
      println!("🔍 Dry-run: would bump {} from {} to {} on {}", dependency, from, to, branch)
    }
    UpdateOutcome::Opened { url, .. } => println!("✅ Opened {}", url),
  }
  Ok(())
}

/// One GitHub Actions annotation line for a snapshot
pub fn annotation(snapshot: &VersionSnapshot) -> String {
  let key = &snapshot.dependency_key;
  let current = snapshot.current_version.as_deref().unwrap_or("unknown");
  match (snapshot.status(), snapshot.latest_version.as_deref()) {
    (SnapshotStatus::UpToDate, latest) => {
      format!("::notice::{} is up to date ({})", key, latest.unwrap_or(current))
    }
    (SnapshotStatus::Outdated, Some(latest)) => {
      format!("::warning::{} {} can be bumped to {}", key, current, latest)
    }
    (SnapshotStatus::Ahead, Some(latest)) => {
      format!("::warning::{} {} is newer than the latest release {}", key, current, latest)
    }
    (SnapshotStatus::Incomparable, Some(latest)) => {
      format!("::warning::{} {} can't be compared with the latest release {}", key, current, latest)
    }
    _ => format!("::error::Can't determine version of {}", key),
  }
}
