//! System git backend
//!
//! Uses git porcelain/plumbing through subprocesses with an isolated
//! environment. Read-only operations live here; mutating ones are in
//! `system_git_ops`.

use super::SourceControl;
use crate::core::error::{GitError, RelError, RelResult, ResultExt};
use std::path::Path;
use std::process::{Command, Output};
use tracing::debug;

/// Git backend using the system `git` binary
#[derive(Debug, Clone, Default)]
pub struct SystemGit;

impl SystemGit {
  pub fn new() -> Self {
    Self
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Runs against `path` via `-C`
  /// - Clears environment variables
  /// - Whitelists PATH, HOME and the SSH agent socket
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self, path: &Path) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(path);

    // Isolated environment (don't trust global config)
    cmd.env_clear();
    for var in ["PATH", "HOME", "SSH_AUTH_SOCK", "GIT_SSH_COMMAND"] {
      if let Ok(value) = std::env::var(var) {
        cmd.env(var, value);
      }
    }

    // Force safe behavior (override user config)
    cmd.arg("-c").arg("protocol.version=2");
    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false");

    cmd
  }

  /// Run git and return its output, failing on non-zero exit
  pub(crate) fn run(&self, path: &Path, args: &[&str]) -> RelResult<Output> {
    let command = format!("git {}", args.join(" "));
    debug!(path = %path.display(), %command, "running git");

    let output = self
      .git_cmd(path)
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute {}", command))?;

    if !output.status.success() {
      return Err(RelError::Git(GitError::CommandFailed {
        command,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }

    Ok(output)
  }

  /// Run git and return trimmed stdout
  pub(crate) fn run_stdout(&self, path: &Path, args: &[&str]) -> RelResult<String> {
    let output = self.run(path, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }
}

impl SourceControl for SystemGit {
  fn describe_nearest_tag(&self, path: &Path, reference: &str) -> RelResult<String> {
    match self.run_stdout(path, &["describe", "--tags", reference]) {
      Ok(tag) if !tag.is_empty() => Ok(tag),
      Ok(_) => Err(RelError::Git(GitError::NoTagReachable {
        path: path.to_path_buf(),
        reference: reference.to_string(),
      })),
      Err(RelError::Git(GitError::CommandFailed { stderr, .. }))
        if stderr.contains("No names found") || stderr.contains("No tags can describe") =>
      {
        Err(RelError::Git(GitError::NoTagReachable {
          path: path.to_path_buf(),
          reference: reference.to_string(),
        }))
      }
      Err(e) => Err(e),
    }
  }

  fn resolve_ref_to_commit(&self, path: &Path, reference: &str) -> RelResult<String> {
    let spec = format!("{}^{{commit}}", reference);
    self
      .run_stdout(path, &["rev-parse", "--verify", "--quiet", &spec])
      .map_err(|_| {
        RelError::Git(GitError::UnknownRef {
          path: path.to_path_buf(),
          reference: reference.to_string(),
        })
      })
  }

  fn clone_repo(&self, url: &str, dest: &Path) -> RelResult<()> {
    let dest_str = dest.to_string_lossy();
    self
      .run(Path::new("."), &["clone", "--quiet", url, &dest_str])
      .map(|_| ())
      .map_err(|e| match e {
        RelError::Git(GitError::CommandFailed { stderr, .. }) => RelError::Git(GitError::CloneFailed {
          url: url.to_string(),
          reason: stderr,
        }),
        other => other,
      })
  }

  fn fetch(&self, path: &Path) -> RelResult<()> {
    self.run(path, &["fetch", "--quiet", "--tags", "origin"])?;
    Ok(())
  }

  fn checkout(&self, path: &Path, reference: &str) -> RelResult<()> {
    self.run(path, &["checkout", "--quiet", reference])?;
    Ok(())
  }

  fn create_tag(&self, path: &Path, tag: &str, target: &str, message: &str) -> RelResult<()> {
    self.create_annotated_tag(path, tag, target, message)
  }

  fn push_tag(&self, path: &Path, tag: &str) -> RelResult<()> {
    self.push_ref(path, &format!("refs/tags/{}", tag))
  }

  fn current_head(&self, path: &Path) -> RelResult<String> {
    match self.run_stdout(path, &["rev-parse", "--abbrev-ref", "HEAD"])?.as_str() {
      "HEAD" => self.run_stdout(path, &["rev-parse", "HEAD"]),
      branch => Ok(branch.to_string()),
    }
  }

  fn create_branch(&self, path: &Path, branch: &str) -> RelResult<()> {
    self.create_and_checkout_branch(path, branch)
  }

  fn discard_branch(&self, path: &Path, restore: &str, branch: &str) -> RelResult<()> {
    self.force_discard_branch(path, restore, branch)
  }

  fn stage(&self, path: &Path, files: &[&Path]) -> RelResult<()> {
    self.add_paths(path, files)
  }

  fn commit(&self, path: &Path, message: &str) -> RelResult<()> {
    self.commit_staged(path, message)
  }

  fn push_branch(&self, path: &Path, branch: &str) -> RelResult<()> {
    self.push_upstream(path, branch)
  }

  fn remote_branch_exists(&self, path: &Path, branch: &str) -> RelResult<bool> {
    self.has_remote_branch(path, branch)
  }

  fn delete_remote_branch(&self, path: &Path, branch: &str) -> RelResult<()> {
    self.delete_upstream_branch(path, branch)
  }

  fn create_archive(&self, url: &str, tag: &str, prefix: &str, output: &Path) -> RelResult<()> {
    self.archive_with_submodules(url, tag, prefix, output)
  }
}
