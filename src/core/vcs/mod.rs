pub mod system_git;
mod system_git_ops;

pub use system_git::SystemGit;

use crate::core::error::RelResult;
use std::path::Path;

/// Source-control operations the engine depends on.
///
/// Every call names the working tree it acts on; implementations hold no
/// per-repository state, so one instance serves the superproject, its
/// submodules and scratch clones alike.
pub trait SourceControl: Send + Sync {
  /// Nearest ancestor tag reachable from `reference`, possibly with a
  /// `-<distance>-g<sha>` suffix (see [`strip_describe_suffix`])
  fn describe_nearest_tag(&self, path: &Path, reference: &str) -> RelResult<String>;

  /// Full commit id for `reference`
  fn resolve_ref_to_commit(&self, path: &Path, reference: &str) -> RelResult<String>;

  /// Clone `url` into `dest` (which must not exist or be empty)
  fn clone_repo(&self, url: &str, dest: &Path) -> RelResult<()>;

  /// Fetch branches and tags from `origin`
  fn fetch(&self, path: &Path) -> RelResult<()>;

  /// Check out `reference` (detached for tags/commits)
  fn checkout(&self, path: &Path, reference: &str) -> RelResult<()>;

  /// Create an annotated tag at `target`
  fn create_tag(&self, path: &Path, tag: &str, target: &str, message: &str) -> RelResult<()>;

  /// Push a single tag to `origin`
  fn push_tag(&self, path: &Path, tag: &str) -> RelResult<()>;

  /// Branch checked out at `path`, or the commit id when HEAD is detached
  fn current_head(&self, path: &Path) -> RelResult<String>;

  /// Create and switch to a new branch
  fn create_branch(&self, path: &Path, branch: &str) -> RelResult<()>;

  /// Force-switch back to `restore` and delete the local `branch`
  fn discard_branch(&self, path: &Path, restore: &str, branch: &str) -> RelResult<()>;

  /// Stage paths relative to `path`
  fn stage(&self, path: &Path, files: &[&Path]) -> RelResult<()>;

  /// Commit what is staged
  fn commit(&self, path: &Path, message: &str) -> RelResult<()>;

  /// Push a branch to `origin` and set upstream
  fn push_branch(&self, path: &Path, branch: &str) -> RelResult<()>;

  /// Whether `origin` already has `branch`
  fn remote_branch_exists(&self, path: &Path, branch: &str) -> RelResult<bool>;

  /// Delete `branch` on `origin`
  fn delete_remote_branch(&self, path: &Path, branch: &str) -> RelResult<()>;

  /// Write a gzip tarball of `url` at `tag`, submodules included, with every
  /// entry under `prefix/`
  fn create_archive(&self, url: &str, tag: &str, prefix: &str, output: &Path) -> RelResult<()>;
}

/// Drop the `-<n>-g<sha>` distance suffix `git describe` appends when the ref
/// is not exactly on a tag
pub fn strip_describe_suffix(described: &str) -> &str {
  let trimmed = described.trim();
  let Some((head, hash)) = trimmed.rsplit_once("-g") else {
    return trimmed;
  };
  let Some((tag, distance)) = head.rsplit_once('-') else {
    return trimmed;
  };

  let hash_ok = !hash.is_empty() && hash.chars().all(|c| c.is_ascii_hexdigit());
  let distance_ok = !distance.is_empty() && distance.chars().all(|c| c.is_ascii_digit());
  if hash_ok && distance_ok && !tag.is_empty() {
    tag
  } else {
    trimmed
  }
}
