//! Bump one outdated dependency on a branch and open a pull request

use crate::core::config::ProjectDescriptor;
use crate::core::error::{RelError, RelResult, ResultExt};
use crate::core::vcs::SourceControl;
use crate::deps::declaration::{extract_declarations, rewrite_pinned_commit};
use crate::deps::snapshot::{DependencyKind, SnapshotStatus, VersionSnapshot};
use crate::remote::HostingPlatform;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// What happened to one dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
  /// Already at the latest release, or pinned to the floating sentinel
  UpToDate,
  /// Latest release could not be determined
  Unknown,
  /// In use is newer than the latest release; never downgraded
  Ahead,
  /// In use and latest can't be ordered; left alone
  Incomparable,
  /// A bump branch is already on origin, presumably with an open PR
  BranchExists { branch: String },
  /// Dry run: what would be done
  Planned { branch: String, from: String, to: String },
  Opened { branch: String, url: String },
}

pub struct DependencyUpdater<'a> {
  git: &'a dyn SourceControl,
  hosting: &'a dyn HostingPlatform,
}

impl<'a> DependencyUpdater<'a> {
  pub fn new(git: &'a dyn SourceControl, hosting: &'a dyn HostingPlatform) -> Self {
    Self { git, hosting }
  }

  pub fn branch_name(snapshot: &VersionSnapshot, latest: &str) -> String {
    format!("deps/{}-{}", snapshot.dependency_key, latest)
  }

  pub fn update(
    &self,
    repo_root: &Path,
    project: &ProjectDescriptor,
    snapshot: &VersionSnapshot,
    dry_run: bool,
  ) -> RelResult<UpdateOutcome> {
    match snapshot.status() {
      SnapshotStatus::UpToDate => return Ok(UpdateOutcome::UpToDate),
      SnapshotStatus::Unknown => return Ok(UpdateOutcome::Unknown),
      SnapshotStatus::Ahead => return Ok(UpdateOutcome::Ahead),
      SnapshotStatus::Incomparable => return Ok(UpdateOutcome::Incomparable),
      SnapshotStatus::Outdated => {}
    }
    let (Some(current), Some(latest)) = (&snapshot.current_version, &snapshot.latest_version) else {
      return Ok(UpdateOutcome::Unknown);
    };

    let branch = Self::branch_name(snapshot, latest);
    if self.git.remote_branch_exists(repo_root, &branch)? {
      info!(%branch, "bump branch already on origin");
      return Ok(UpdateOutcome::BranchExists { branch });
    }
    if dry_run {
      return Ok(UpdateOutcome::Planned {
        branch,
        from: current.clone(),
        to: latest.clone(),
      });
    }

    let original = self.git.current_head(repo_root)?;
    self.git.create_branch(repo_root, &branch)?;

    let title = format!("Bump {} from {} to {}", snapshot.dependency_key, current, latest);
    if let Err(err) = self.commit_and_push(repo_root, snapshot, latest, &title, &branch) {
      self.roll_back(repo_root, snapshot, &original, &branch, false);
      return Err(err);
    }

    let body = format!(
      "Bumps `{}` (`{}`) from {} to {}.",
      snapshot.dependency_key,
      snapshot.path.display(),
      current,
      latest
    );
    match self
      .hosting
      .open_pull_request(&project.repository, &project.default_branch, &branch, &title, &body)
    {
      Ok(url) => Ok(UpdateOutcome::Opened { branch, url }),
      Err(err) => {
        self.roll_back(repo_root, snapshot, &original, &branch, true);
        Err(err)
      }
    }
  }

  fn commit_and_push(
    &self,
    repo_root: &Path,
    snapshot: &VersionSnapshot,
    latest: &str,
    title: &str,
    branch: &str,
  ) -> RelResult<()> {
    match snapshot.kind {
      DependencyKind::Submodule => self.move_submodule(repo_root, snapshot, latest)?,
      DependencyKind::FetchDeclaration => self.repin_declaration(repo_root, snapshot, latest)?,
    }
    self.git.commit(repo_root, title)?;
    self.git.push_branch(repo_root, branch)
  }

  /// Put the repository back on `original` and drop the bump branch. Failures
  /// here are logged; the caller reports the error that triggered the rollback.
  fn roll_back(&self, repo_root: &Path, snapshot: &VersionSnapshot, original: &str, branch: &str, pushed: bool) {
    warn!(%branch, %original, "bump failed, rolling back");
    if pushed && let Err(e) = self.git.delete_remote_branch(repo_root, branch) {
      warn!(%branch, error = %e, "could not delete bump branch on origin");
    }
    if let Err(e) = self.git.discard_branch(repo_root, original, branch) {
      warn!(%branch, error = %e, "could not discard bump branch");
    }
    if snapshot.kind == DependencyKind::Submodule
      && let Some(commit) = &snapshot.current_commit
      && let Err(e) = self.git.checkout(&repo_root.join(&snapshot.path), commit)
    {
      warn!(path = %snapshot.path.display(), error = %e, "could not restore submodule checkout");
    }
  }

  fn move_submodule(&self, repo_root: &Path, snapshot: &VersionSnapshot, latest: &str) -> RelResult<()> {
    let checkout = repo_root.join(&snapshot.path);
    self.git.fetch(&checkout)?;
    self.git.checkout(&checkout, latest)?;
    self.git.stage(repo_root, &[snapshot.path.as_path()])
  }

  fn repin_declaration(&self, repo_root: &Path, snapshot: &VersionSnapshot, latest: &str) -> RelResult<()> {
    let latest_commit = snapshot.latest_commit.as_deref().ok_or_else(|| {
      RelError::message(format!(
        "No commit known for {} {}; can't re-pin",
        snapshot.dependency_key, latest
      ))
    })?;

    let file = repo_root.join(&snapshot.path);
    let text = fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    let record = extract_declarations(&text, Some(&snapshot.dependency_key))
      .into_iter()
      .next()
      .ok_or_else(|| {
        RelError::message(format!(
          "No declaration named '{}' in {}",
          snapshot.dependency_key,
          snapshot.path.display()
        ))
      })?;

    let updated = rewrite_pinned_commit(
      &text,
      &record.name,
      &record.pinned_commit,
      latest_commit,
      Some(latest),
    )?;
    fs::write(&file, updated).with_context(|| format!("Failed to write {}", file.display()))?;
    self.git.stage(repo_root, &[snapshot.path.as_path()])
  }
}
