//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A scratch directory holding an upstream repository and a superproject
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();
    Ok(Self { _root: root, path })
  }

  /// Create `name` with one commit per tag, tagged in order, on `main`.
  ///
  /// Returns the repository path and the commit of each tag.
  pub fn upstream(&self, name: &str, tags: &[&str]) -> Result<(PathBuf, Vec<String>)> {
    let repo = self.path.join(name);
    std::fs::create_dir_all(&repo)?;
    init_repo(&repo)?;

    let mut commits = Vec::new();
    for tag in tags {
      std::fs::write(repo.join("VERSION"), format!("{}\n", tag))?;
      commits.push(commit_all(&repo, &format!("Release {}", tag))?);
      git(&repo, &["tag", tag])?;
    }
    Ok((repo, commits))
  }

  /// Create the superproject with a relman.toml and an initial commit
  pub fn superproject(&self, config: &str) -> Result<PathBuf> {
    let repo = self.path.join("superproject");
    std::fs::create_dir_all(&repo)?;
    init_repo(&repo)?;
    std::fs::write(repo.join("relman.toml"), config)?;
    commit_all(&repo, "Initial commit")?;
    Ok(repo)
  }

  pub fn write(&self, relative: &str, content: &str) -> Result<()> {
    let file = self.path.join(relative);
    if let Some(parent) = file.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file, content)?;
    Ok(())
  }
}

fn init_repo(path: &Path) -> Result<()> {
  git(path, &["init", "--initial-branch=main"])?;
  git(path, &["config", "user.name", "Test User"])?;
  git(path, &["config", "user.email", "test@example.com"])?;
  git(path, &["config", "commit.gpgsign", "false"])?;
  Ok(())
}

/// Stage everything and commit; returns the new commit id
pub fn commit_all(path: &Path, message: &str) -> Result<String> {
  git(path, &["add", "."])?;
  git(path, &["commit", "-m", message])?;
  let output = git(path, &["rev-parse", "HEAD"])?;
  Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run relman and return its output regardless of exit status
pub fn run_relman(cwd: &Path, args: &[&str]) -> Result<Output> {
  let relman_bin = env!("CARGO_BIN_EXE_relman");

  Command::new(relman_bin)
    .current_dir(cwd)
    .args(args)
    .env_remove("RELMAN_CONFIG")
    .env_remove("RELMAN_LOG")
    .output()
    .context("Failed to run relman")
}

/// Run relman and fail unless it exits successfully
pub fn run_relman_ok(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_relman(cwd, args)?;
  if !output.status.success() {
    anyhow::bail!(
      "relman command failed: relman {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      String::from_utf8_lossy(&output.stdout),
      String::from_utf8_lossy(&output.stderr)
    );
  }
  Ok(output)
}
