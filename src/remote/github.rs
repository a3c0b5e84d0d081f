//! GitHub operations via the gh CLI

use super::{CiRun, RunStatus};
use crate::core::error::{RelError, RelResult, RemoteError, ResultExt};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, info};

/// Hosting-platform operations. `repo` is always an `owner/repo` slug.
pub trait HostingPlatform: Send + Sync {
  /// Commit a remote tag points at, or `None` if the tag does not exist
  fn tag_commit(&self, repo: &str, tag: &str) -> RelResult<Option<String>>;

  fn tag_exists(&self, repo: &str, tag: &str) -> RelResult<bool> {
    Ok(self.tag_commit(repo, tag)?.is_some())
  }

  /// Tag of the latest published (non-draft, non-prerelease) release
  fn latest_release_tag(&self, repo: &str) -> RelResult<Option<String>>;

  fn release_exists(&self, repo: &str, tag: &str) -> RelResult<bool>;

  /// CI runs recorded for a commit
  fn ci_status(&self, repo: &str, revision: &str) -> RelResult<Vec<CiRun>>;

  /// Publish a release; fails if one already exists for `tag`
  fn create_release(&self, repo: &str, tag: &str, title: &str, notes: &str, files: &[PathBuf]) -> RelResult<()>;

  /// Attach (or replace) assets on an existing release
  fn upload_assets(&self, repo: &str, tag: &str, files: &[PathBuf]) -> RelResult<()>;

  /// Open a pull request and return its URL
  fn open_pull_request(&self, repo: &str, base: &str, head: &str, title: &str, body: &str) -> RelResult<String>;
}

/// `HostingPlatform` backed by the `gh` binary
#[derive(Debug, Clone, Default)]
pub struct GhCli;

#[derive(Deserialize)]
struct GhRelease {
  #[serde(rename = "tagName")]
  tag_name: String,
}

#[derive(Deserialize)]
struct GhRun {
  name: String,
  status: String,
  #[serde(default)]
  conclusion: Option<String>,
}

impl GhCli {
  pub fn new() -> Self {
    Self
  }

  fn gh_cmd(&self) -> Command {
    let mut cmd = Command::new("gh");
    // keep gh from paging or prompting in CI
    cmd.env("GH_PAGER", "").env("GH_PROMPT_DISABLED", "1").env("NO_COLOR", "1");
    cmd
  }

  fn output(&self, args: &[&str]) -> RelResult<(String, Output)> {
    let command = format!("gh {}", args.join(" "));
    debug!(%command, "running gh");
    let output = self
      .gh_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute {}", command))?;
    Ok((command, output))
  }

  fn run(&self, args: &[&str]) -> RelResult<String> {
    let (command, output) = self.output(args)?;
    if !output.status.success() {
      return Err(RelError::Remote(RemoteError::CommandFailed {
        command,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  fn is_not_found(output: &Output) -> bool {
    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr.contains("Not Found") || stderr.contains("HTTP 404") || stderr.contains("release not found")
  }
}

impl HostingPlatform for GhCli {
  fn tag_commit(&self, repo: &str, tag: &str) -> RelResult<Option<String>> {
    // refs/tags lookup first so a branch named like the tag can't answer
    let ref_path = format!("repos/{}/git/ref/tags/{}", repo, tag);
    let (command, output) = self.output(&["api", &ref_path, "--jq", ".object.sha"])?;
    if !output.status.success() {
      if Self::is_not_found(&output) {
        return Ok(None);
      }
      return Err(RelError::Remote(RemoteError::CommandFailed {
        command,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }

    // peel annotated tags down to the commit
    let commit_path = format!("repos/{}/commits/refs/tags/{}", repo, tag);
    let sha = self.run(&["api", &commit_path, "--jq", ".sha"])?;
    if sha.is_empty() {
      return Err(RelError::Remote(RemoteError::UnexpectedOutput {
        command: format!("gh api {}", commit_path),
        reason: "empty commit sha".to_string(),
      }));
    }
    Ok(Some(sha))
  }

  fn latest_release_tag(&self, repo: &str) -> RelResult<Option<String>> {
    let stdout = self.run(&[
      "release",
      "list",
      "--repo",
      repo,
      "--exclude-drafts",
      "--exclude-pre-releases",
      "--limit",
      "1",
      "--json",
      "tagName",
    ])?;
    let releases: Vec<GhRelease> = serde_json::from_str(&stdout).map_err(|e| {
      RelError::Remote(RemoteError::UnexpectedOutput {
        command: "gh release list".to_string(),
        reason: e.to_string(),
      })
    })?;
    Ok(releases.into_iter().next().map(|r| r.tag_name))
  }

  fn release_exists(&self, repo: &str, tag: &str) -> RelResult<bool> {
    let (command, output) = self.output(&["release", "view", tag, "--repo", repo, "--json", "tagName"])?;
    if output.status.success() {
      return Ok(true);
    }
    if Self::is_not_found(&output) {
      return Ok(false);
    }
    Err(RelError::Remote(RemoteError::CommandFailed {
      command,
      stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }))
  }

  fn ci_status(&self, repo: &str, revision: &str) -> RelResult<Vec<CiRun>> {
    let stdout = self.run(&[
      "run",
      "list",
      "--repo",
      repo,
      "--commit",
      revision,
      "--limit",
      "100",
      "--json",
      "name,status,conclusion",
    ])?;
    let runs: Vec<GhRun> = serde_json::from_str(&stdout).map_err(|e| {
      RelError::Remote(RemoteError::UnexpectedOutput {
        command: "gh run list".to_string(),
        reason: e.to_string(),
      })
    })?;

    Ok(
      runs
        .into_iter()
        .map(|run| CiRun::new(run.name, RunStatus::from_github(&run.status, run.conclusion.as_deref())))
        .collect(),
    )
  }

  fn create_release(&self, repo: &str, tag: &str, title: &str, notes: &str, files: &[PathBuf]) -> RelResult<()> {
    let mut args: Vec<String> = vec![
      "release".into(),
      "create".into(),
      tag.into(),
      "--repo".into(),
      repo.into(),
      "--verify-tag".into(),
      "--title".into(),
      title.into(),
      "--notes".into(),
      notes.into(),
    ];
    args.extend(files.iter().map(|f| f.to_string_lossy().to_string()));

    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    self.run(&arg_refs)?;
    info!(%repo, %tag, assets = files.len(), "created release");
    Ok(())
  }

  fn upload_assets(&self, repo: &str, tag: &str, files: &[PathBuf]) -> RelResult<()> {
    let mut args: Vec<String> = vec![
      "release".into(),
      "upload".into(),
      tag.into(),
      "--repo".into(),
      repo.into(),
      "--clobber".into(),
    ];
    args.extend(files.iter().map(|f| f.to_string_lossy().to_string()));

    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    self.run(&arg_refs)?;
    info!(%repo, %tag, assets = files.len(), "uploaded release assets");
    Ok(())
  }

  fn open_pull_request(&self, repo: &str, base: &str, head: &str, title: &str, body: &str) -> RelResult<String> {
    let url = self.run(&[
      "pr", "create", "--repo", repo, "--base", base, "--head", head, "--title", title, "--body", body,
    ])?;
    info!(%repo, %head, %url, "opened pull request");
    Ok(url)
  }
}

/// Raw file URL on the hosting platform
pub fn raw_file_url(base: &str, repo: &str, revision: &str, file: &Path) -> String {
  format!(
    "{}/{}/{}/{}",
    base.trim_end_matches('/'),
    repo,
    revision,
    file.to_string_lossy().trim_start_matches('/')
  )
}

/// Clone URL for a repository slug
pub fn clone_url(base: &str, repo: &str) -> String {
  format!("{}/{}.git", base.trim_end_matches('/'), repo)
}

/// Source archive URL the platform generates for a tag
pub fn archive_url(base: &str, repo: &str, tag: &str) -> String {
  format!("{}/{}/archive/refs/tags/{}.tar.gz", base.trim_end_matches('/'), repo, tag)
}
