//! Mutating operations for SystemGit (tags, branches, commits, pushes, archives)

use super::system_git::SystemGit;
use crate::core::error::{GitError, RelError, RelResult, ResultExt};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

impl SystemGit {
  /// Create an annotated tag pointing at `target`
  pub fn create_annotated_tag(&self, path: &Path, tag: &str, target: &str, message: &str) -> RelResult<()> {
    self.run(path, &["tag", "-a", tag, "-m", message, target])?;
    info!(%tag, %target, "created tag");
    Ok(())
  }

  /// Push a ref to origin
  pub fn push_ref(&self, path: &Path, refspec: &str) -> RelResult<()> {
    match self.run(path, &["push", "origin", refspec]) {
      Ok(_) => {
        info!(%refspec, "pushed to origin");
        Ok(())
      }
      Err(RelError::Git(GitError::CommandFailed { stderr, .. })) => Err(RelError::Git(GitError::PushFailed {
        remote: "origin".to_string(),
        refspec: refspec.to_string(),
        reason: stderr,
      })),
      Err(e) => Err(e),
    }
  }

  /// Push a branch and set its upstream
  pub fn push_upstream(&self, path: &Path, branch: &str) -> RelResult<()> {
    match self.run(path, &["push", "--set-upstream", "origin", branch]) {
      Ok(_) => {
        info!(%branch, "pushed branch");
        Ok(())
      }
      Err(RelError::Git(GitError::CommandFailed { stderr, .. })) => Err(RelError::Git(GitError::PushFailed {
        remote: "origin".to_string(),
        refspec: branch.to_string(),
        reason: stderr,
      })),
      Err(e) => Err(e),
    }
  }

  /// Create and checkout a branch
  pub fn create_and_checkout_branch(&self, path: &Path, branch: &str) -> RelResult<()> {
    self.run(path, &["checkout", "--quiet", "-b", branch])?;
    Ok(())
  }

  /// Force-checkout `restore` and delete `branch` locally, dropping any
  /// uncommitted or committed work on it
  pub fn force_discard_branch(&self, path: &Path, restore: &str, branch: &str) -> RelResult<()> {
    self.run(path, &["checkout", "--quiet", "--force", restore])?;
    self.run(path, &["branch", "--quiet", "-D", branch])?;
    info!(%branch, %restore, "discarded branch");
    Ok(())
  }

  /// Delete a branch on origin
  pub fn delete_upstream_branch(&self, path: &Path, branch: &str) -> RelResult<()> {
    self.run(path, &["push", "--quiet", "origin", "--delete", branch])?;
    info!(%branch, "deleted branch on origin");
    Ok(())
  }

  /// Stage the given paths
  pub fn add_paths(&self, path: &Path, files: &[&Path]) -> RelResult<()> {
    let mut cmd = self.git_cmd(path);
    cmd.arg("add").arg("--");
    for file in files {
      cmd.arg(file);
    }

    let output = cmd.output().context("Failed to run git add")?;
    if !output.status.success() {
      return Err(RelError::Git(GitError::CommandFailed {
        command: "git add".to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }
    Ok(())
  }

  /// Commit whatever is staged
  pub fn commit_staged(&self, path: &Path, message: &str) -> RelResult<()> {
    self.run(path, &["commit", "--quiet", "-m", message])?;
    Ok(())
  }

  /// Check whether origin has a branch, without fetching it
  pub fn has_remote_branch(&self, path: &Path, branch: &str) -> RelResult<bool> {
    let refname = format!("refs/heads/{}", branch);
    let stdout = self.run_stdout(path, &["ls-remote", "--heads", "origin", &refname])?;
    Ok(!stdout.is_empty())
  }

  /// Clone `url` at `tag` with all submodules into a scratch directory and
  /// pack it as `<prefix>/...` into a gzip tarball, VCS metadata excluded
  pub fn archive_with_submodules(&self, url: &str, tag: &str, prefix: &str, output: &Path) -> RelResult<()> {
    let scratch = tempfile::Builder::new()
      .prefix("relman-archive-")
      .tempdir()
      .context("Failed to create scratch directory")?;
    let checkout = scratch.path().join(prefix);
    let checkout_str = checkout.to_string_lossy();

    self
      .run(
        Path::new("."),
        &[
          "clone",
          "--quiet",
          "--recurse-submodules",
          "--branch",
          tag,
          url,
          &checkout_str,
        ],
      )
      .map_err(|e| match e {
        RelError::Git(GitError::CommandFailed { stderr, .. }) => RelError::Git(GitError::CloneFailed {
          url: url.to_string(),
          reason: stderr,
        }),
        other => other,
      })?;

    debug!(output = %output.display(), "packing tarball");
    pack_tarball(&checkout, prefix, output)?;

    // scratch is removed here, on success and on every early return above
    Ok(())
  }
}

/// Write `source` as `<prefix>/...` into a gzip tarball, skipping `.git`
/// entries (directories in the superproject, files in submodules)
fn pack_tarball(source: &Path, prefix: &str, output: &Path) -> RelResult<()> {
  let file = fs::File::create(output).with_context(|| format!("Failed to create {}", output.display()))?;
  let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
  builder.follow_symlinks(false);

  append_tree(&mut builder, source, Path::new(prefix))
    .with_context(|| format!("Failed to pack {}", source.display()))?;
  builder
    .into_inner()
    .and_then(GzEncoder::finish)
    .with_context(|| format!("Failed to finish {}", output.display()))?;
  Ok(())
}

fn append_tree<W: Write>(builder: &mut tar::Builder<W>, dir: &Path, name: &Path) -> RelResult<()> {
  builder.append_dir(name, dir)?;

  let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
  entries.sort_by_key(|entry| entry.file_name());
  for entry in entries {
    let file_name = entry.file_name();
    if file_name == ".git" {
      continue;
    }
    let entry_name = name.join(&file_name);
    if entry.file_type()?.is_dir() {
      append_tree(builder, &entry.path(), &entry_name)?;
    } else {
      builder.append_path_with_name(entry.path(), &entry_name)?;
    }
  }
  Ok(())
}
