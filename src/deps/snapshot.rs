//! Dependency snapshot resolution
//!
//! For every pinned dependency of a project, work out what is in use now and
//! what the newest upstream release is. Dependencies are resolved in parallel
//! and independently: a failure leaves the affected fields absent and is
//! recorded on that snapshot, it never aborts the batch.
//!
//! Results keep declaration order (submodules first, then fetch
//! declarations, each sorted by key).

use crate::core::config::{DependencySpec, ProjectDescriptor};
use crate::core::error::{ErrorKind, RelResult};
use crate::core::vcs::{SourceControl, strip_describe_suffix};
use crate::deps::declaration::extract_declarations;
use crate::release::version::has_newer_version;
use crate::remote::HostingPlatform;
use crate::ui::progress::SharedProgress;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Current version value meaning "intentionally floating, never stale"
pub const LATEST_SENTINEL: &str = "latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
  Submodule,
  FetchDeclaration,
}

/// Where a dependency stands relative to upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
  UpToDate,
  Outdated,
  /// In use is newer than upstream's latest release
  Ahead,
  /// Both known and different, but not orderable as versions
  Incomparable,
  Unknown,
}

/// One step of resolution that failed for one dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionFailure {
  pub step: &'static str,
  pub reason: String,
}

impl ResolutionFailure {
  pub fn kind(&self) -> ErrorKind {
    ErrorKind::DependencyResolutionFailure
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSnapshot {
  pub dependency_key: String,
  pub kind: DependencyKind,
  /// Submodule path or declaration file
  pub path: PathBuf,
  pub current_version: Option<String>,
  pub current_commit: Option<String>,
  pub latest_version: Option<String>,
  pub latest_commit: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub failures: Vec<ResolutionFailure>,
}

impl VersionSnapshot {
  fn empty(key: &str, spec: &DependencySpec) -> Self {
    Self {
      dependency_key: key.to_string(),
      kind: if spec.is_submodule() {
        DependencyKind::Submodule
      } else {
        DependencyKind::FetchDeclaration
      },
      path: spec.path().to_path_buf(),
      current_version: None,
      current_commit: None,
      latest_version: None,
      latest_commit: None,
      failures: Vec::new(),
    }
  }

  pub fn is_sentinel(&self) -> bool {
    self.current_version.as_deref() == Some(LATEST_SENTINEL)
  }

  pub fn status(&self) -> SnapshotStatus {
    if self.is_sentinel() {
      return SnapshotStatus::UpToDate;
    }
    let (Some(current), Some(latest)) = (&self.current_version, &self.latest_version) else {
      return SnapshotStatus::Unknown;
    };
    if strip_describe_suffix(current) == strip_describe_suffix(latest) {
      return SnapshotStatus::UpToDate;
    }

    match has_newer_version(current, latest) {
      Ok(true) => SnapshotStatus::Outdated,
      Ok(false) => SnapshotStatus::UpToDate,
      Err(e) if e.kind() == ErrorKind::VersionOrderInverted => SnapshotStatus::Ahead,
      Err(_) => SnapshotStatus::Incomparable,
    }
  }

  /// Keep `result`'s value, or record why it is missing
  fn keep<T>(&mut self, step: &'static str, result: RelResult<T>) -> Option<T> {
    match result {
      Ok(value) => Some(value),
      Err(e) => {
        warn!(dependency = %self.dependency_key, step, error = %e, "dependency resolution failed");
        self.failures.push(ResolutionFailure {
          step,
          reason: e.to_string(),
        });
        None
      }
    }
  }
}

/// Resolves snapshots against a checked-out superproject
pub struct SnapshotResolver<'a> {
  git: &'a dyn SourceControl,
  hosting: &'a dyn HostingPlatform,
  show_progress: bool,
}

impl<'a> SnapshotResolver<'a> {
  pub fn new(git: &'a dyn SourceControl, hosting: &'a dyn HostingPlatform) -> Self {
    Self {
      git,
      hosting,
      show_progress: false,
    }
  }

  /// Draw a progress bar on stderr while resolving (terminals only)
  pub fn with_progress(mut self, show: bool) -> Self {
    self.show_progress = show;
    self
  }

  pub fn resolve_submodule_snapshots(
    &self,
    repo_root: &Path,
    project: &ProjectDescriptor,
    filter: Option<&str>,
  ) -> RelResult<Vec<VersionSnapshot>> {
    let deps = select(project, filter, true)?;
    Ok(self.resolve_all(&deps, "submodules", |key, spec| {
      self.resolve_submodule(repo_root, key, spec)
    }))
  }

  pub fn resolve_fetch_declaration_snapshots(
    &self,
    repo_root: &Path,
    project: &ProjectDescriptor,
    filter: Option<&str>,
  ) -> RelResult<Vec<VersionSnapshot>> {
    let deps = select(project, filter, false)?;
    Ok(self.resolve_all(&deps, "declarations", |key, spec| {
      self.resolve_fetch_declaration(repo_root, key, spec)
    }))
  }

  /// Submodule snapshots followed by fetch-declaration snapshots
  pub fn combined_snapshots(
    &self,
    repo_root: &Path,
    project: &ProjectDescriptor,
    filter: Option<&str>,
  ) -> RelResult<Vec<VersionSnapshot>> {
    let mut snapshots = self.resolve_submodule_snapshots(repo_root, project, filter)?;
    snapshots.extend(self.resolve_fetch_declaration_snapshots(repo_root, project, filter)?);
    Ok(snapshots)
  }

  fn resolve_all<F>(&self, deps: &[(&str, &DependencySpec)], label: &str, resolve: F) -> Vec<VersionSnapshot>
  where
    F: Fn(&str, &DependencySpec) -> VersionSnapshot + Sync,
  {
    let progress = self
      .show_progress
      .then(|| SharedProgress::for_terminal(deps.len(), label))
      .flatten();

    deps
      .par_iter()
      .map(|(key, spec)| {
        let snapshot = resolve(key, spec);
        if let Some(progress) = &progress {
          progress.inc();
        }
        snapshot
      })
      .collect()
  }

  fn resolve_submodule(&self, repo_root: &Path, key: &str, spec: &DependencySpec) -> VersionSnapshot {
    let mut snapshot = VersionSnapshot::empty(key, spec);
    let DependencySpec::Submodule { submodule_path, upstream, .. } = spec else {
      return snapshot;
    };
    let checkout = repo_root.join(submodule_path);

    snapshot.current_version = snapshot
      .keep("describe checkout", self.git.describe_nearest_tag(&checkout, "HEAD"))
      .map(|tag| strip_describe_suffix(&tag).to_string());
    snapshot.current_commit = snapshot.keep("resolve checkout", self.git.resolve_ref_to_commit(&checkout, "HEAD"));

    match upstream {
      Some(repo) => {
        let latest = snapshot.keep("latest release", self.hosting.latest_release_tag(repo)).flatten();
        if let Some(tag) = &latest {
          snapshot.latest_commit = snapshot.keep("resolve latest", self.hosting.tag_commit(repo, tag)).flatten();
        }
        snapshot.latest_version = latest;
      }
      None => {
        let main_ref = format!("origin/{}", spec.main_branch());
        if snapshot.keep("fetch", self.git.fetch(&checkout)).is_some() {
          self.describe_latest(&mut snapshot, &checkout, &main_ref);
        }
      }
    }

    debug!(dependency = %key, current = ?snapshot.current_version, latest = ?snapshot.latest_version, "resolved submodule");
    snapshot
  }

  fn resolve_fetch_declaration(&self, repo_root: &Path, key: &str, spec: &DependencySpec) -> VersionSnapshot {
    let mut snapshot = VersionSnapshot::empty(key, spec);
    let Some(text) = snapshot.keep("read declaration", read(repo_root, spec.path())) else {
      return snapshot;
    };
    let Some(record) = extract_declarations(&text, Some(key)).into_iter().next() else {
      snapshot.failures.push(ResolutionFailure {
        step: "parse declaration",
        reason: format!("no complete declaration named '{}' in {}", key, spec.path().display()),
      });
      warn!(dependency = %key, file = %spec.path().display(), "declaration not found");
      return snapshot;
    };

    // Scratch clone lives exactly as long as this scope
    let Some(scratch) = snapshot.keep(
      "scratch dir",
      tempfile::Builder::new()
        .prefix("relman-clone-")
        .tempdir()
        .map_err(Into::into),
    ) else {
      return snapshot;
    };
    let clone = scratch.path().join(key);
    if snapshot
      .keep("clone", self.git.clone_repo(&record.repository_url, &clone))
      .is_none()
    {
      return snapshot;
    }

    let pinned = record.pinned_commit.as_str();
    snapshot.current_version = snapshot
      .keep("describe pinned", self.git.describe_nearest_tag(&clone, pinned))
      .map(|tag| strip_describe_suffix(&tag).to_string());
    snapshot.current_commit = snapshot.keep("resolve pinned", self.git.resolve_ref_to_commit(&clone, pinned));

    let main_ref = format!("origin/{}", spec.main_branch());
    self.describe_latest(&mut snapshot, &clone, &main_ref);

    debug!(dependency = %key, current = ?snapshot.current_version, latest = ?snapshot.latest_version, "resolved declaration");
    snapshot
  }

  /// Latest tag on `main_ref` and the commit it names
  fn describe_latest(&self, snapshot: &mut VersionSnapshot, path: &Path, main_ref: &str) {
    let latest = snapshot
      .keep("describe latest", self.git.describe_nearest_tag(path, main_ref))
      .map(|tag| strip_describe_suffix(&tag).to_string());
    if let Some(tag) = &latest {
      snapshot.latest_commit = snapshot.keep("resolve latest", self.git.resolve_ref_to_commit(path, tag));
    }
    snapshot.latest_version = latest;
  }
}

fn read(repo_root: &Path, file: &Path) -> RelResult<String> {
  Ok(fs::read_to_string(repo_root.join(file))?)
}

/// Dependencies of one variant, optionally narrowed to a key. An unknown key
/// is an error; a known key of the other variant selects nothing.
fn select<'p>(
  project: &'p ProjectDescriptor,
  filter: Option<&str>,
  submodules: bool,
) -> RelResult<Vec<(&'p str, &'p DependencySpec)>> {
  if let Some(key) = filter {
    project.dependency(key)?;
  }
  Ok(
    project
      .dependencies
      .iter()
      .filter(|(key, spec)| spec.is_submodule() == submodules && filter.is_none_or(|f| f == key.as_str()))
      .map(|(key, spec)| (key.as_str(), spec))
      .collect(),
  )
}
