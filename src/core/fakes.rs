//! In-memory fakes for the collaborator traits (testing only)
//!
//! Every fake records what it was asked to do so tests can assert both on
//! results and on which remote calls were (or were not) made.

use crate::core::error::{GitError, RelError, RelResult, RemoteError};
use crate::core::vcs::SourceControl;
use crate::remote::{CiRun, Fetcher, HostingPlatform, Signer};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// FakeFetcher
// ---------------------------------------------------------------------------

/// URL -> body map; unknown URLs answer 404
#[derive(Debug, Default)]
pub struct FakeFetcher {
  bodies: HashMap<String, Vec<u8>>,
  requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
  pub fn with_text(mut self, url: &str, text: &str) -> Self {
    self.bodies.insert(url.to_string(), text.as_bytes().to_vec());
    self
  }

  pub fn with_bytes(mut self, url: &str, bytes: &[u8]) -> Self {
    self.bodies.insert(url.to_string(), bytes.to_vec());
    self
  }

  /// URLs requested so far, in order
  pub fn requested(&self) -> Vec<String> {
    self.requested.lock().unwrap().clone()
  }
}

impl Fetcher for FakeFetcher {
  fn fetch_text(&self, url: &str) -> RelResult<String> {
    let bytes = self.fetch_bytes(url)?;
    Ok(String::from_utf8(bytes)?)
  }

  fn fetch_bytes(&self, url: &str) -> RelResult<Vec<u8>> {
    self.requested.lock().unwrap().push(url.to_string());
    self.bodies.get(url).cloned().ok_or_else(|| {
      RelError::Remote(RemoteError::Http {
        url: url.to_string(),
        reason: "HTTP 404".to_string(),
      })
    })
  }
}

// ---------------------------------------------------------------------------
// FakeGit
// ---------------------------------------------------------------------------

/// Scripted source control.
///
/// Answers are keyed by a *location*: the clone URL for scratch clones made
/// through `clone_repo`, otherwise the working-tree path as given.
#[derive(Debug, Default)]
pub struct FakeGit {
  described: HashMap<(String, String), String>,
  resolved: HashMap<(String, String), String>,
  failing: HashSet<String>,
  failing_ops: HashSet<String>,
  remote_branches: HashSet<String>,
  clones: Mutex<HashMap<PathBuf, String>>,
  clone_dests: Mutex<Vec<PathBuf>>,
  calls: Mutex<Vec<String>>,
}

impl FakeGit {
  pub fn with_describe(mut self, location: &str, reference: &str, tag: &str) -> Self {
    self
      .described
      .insert((location.to_string(), reference.to_string()), tag.to_string());
    self
  }

  pub fn with_commit(mut self, location: &str, reference: &str, commit: &str) -> Self {
    self
      .resolved
      .insert((location.to_string(), reference.to_string()), commit.to_string());
    self
  }

  /// Every operation at `location` fails
  pub fn failing_at(mut self, location: &str) -> Self {
    self.failing.insert(location.to_string());
    self
  }

  /// Every `git <command>` fails, wherever it runs
  pub fn failing_op(mut self, command: &str) -> Self {
    self.failing_ops.insert(command.to_string());
    self
  }

  pub fn with_remote_branch(mut self, branch: &str) -> Self {
    self.remote_branches.insert(branch.to_string());
    self
  }

  /// Mutating calls, formatted as `op arg...`
  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  /// Clone destinations asked for so far, failed clones included
  pub fn clone_dirs(&self) -> Vec<PathBuf> {
    self.clone_dests.lock().unwrap().clone()
  }

  fn location(&self, path: &Path) -> String {
    self
      .clones
      .lock()
      .unwrap()
      .get(path)
      .cloned()
      .unwrap_or_else(|| path.to_string_lossy().to_string())
  }

  fn check(&self, location: &str, command: &str) -> RelResult<()> {
    if self.failing.contains(location) || self.failing_ops.contains(command) {
      return Err(RelError::Git(GitError::CommandFailed {
        command: format!("git {}", command),
        stderr: format!("fatal: scripted failure at {}", location),
      }));
    }
    Ok(())
  }

  fn record(&self, call: String) {
    self.calls.lock().unwrap().push(call);
  }
}

impl SourceControl for FakeGit {
  fn describe_nearest_tag(&self, path: &Path, reference: &str) -> RelResult<String> {
    let location = self.location(path);
    self.check(&location, "describe")?;
    self
      .described
      .get(&(location, reference.to_string()))
      .cloned()
      .ok_or_else(|| {
        RelError::Git(GitError::NoTagReachable {
          path: path.to_path_buf(),
          reference: reference.to_string(),
        })
      })
  }

  fn resolve_ref_to_commit(&self, path: &Path, reference: &str) -> RelResult<String> {
    let location = self.location(path);
    self.check(&location, "rev-parse")?;
    self
      .resolved
      .get(&(location, reference.to_string()))
      .cloned()
      .ok_or_else(|| {
        RelError::Git(GitError::UnknownRef {
          path: path.to_path_buf(),
          reference: reference.to_string(),
        })
      })
  }

  fn clone_repo(&self, url: &str, dest: &Path) -> RelResult<()> {
    self.clone_dests.lock().unwrap().push(dest.to_path_buf());
    if self.failing.contains(url) {
      return Err(RelError::Git(GitError::CloneFailed {
        url: url.to_string(),
        reason: "scripted failure".to_string(),
      }));
    }
    fs::create_dir_all(dest)?;
    self.clones.lock().unwrap().insert(dest.to_path_buf(), url.to_string());
    Ok(())
  }

  fn fetch(&self, path: &Path) -> RelResult<()> {
    let location = self.location(path);
    self.check(&location, "fetch")
  }

  fn checkout(&self, path: &Path, reference: &str) -> RelResult<()> {
    let location = self.location(path);
    self.check(&location, "checkout")?;
    self.record(format!("checkout {} {}", location, reference));
    Ok(())
  }

  fn create_tag(&self, path: &Path, tag: &str, target: &str, _message: &str) -> RelResult<()> {
    self.check(&self.location(path), "tag")?;
    self.record(format!("tag {} {}", tag, target));
    Ok(())
  }

  fn push_tag(&self, path: &Path, tag: &str) -> RelResult<()> {
    self.check(&self.location(path), "push")?;
    self.record(format!("push-tag {}", tag));
    Ok(())
  }

  fn current_head(&self, path: &Path) -> RelResult<String> {
    self.check(&self.location(path), "rev-parse")?;
    Ok("main".to_string())
  }

  fn create_branch(&self, path: &Path, branch: &str) -> RelResult<()> {
    self.check(&self.location(path), "checkout -b")?;
    self.record(format!("branch {}", branch));
    Ok(())
  }

  fn discard_branch(&self, path: &Path, restore: &str, branch: &str) -> RelResult<()> {
    self.check(&self.location(path), "branch -D")?;
    self.record(format!("discard {} back to {}", branch, restore));
    Ok(())
  }

  fn stage(&self, path: &Path, files: &[&Path]) -> RelResult<()> {
    self.check(&self.location(path), "add")?;
    let names: Vec<String> = files.iter().map(|f| f.to_string_lossy().to_string()).collect();
    self.record(format!("stage {}", names.join(" ")));
    Ok(())
  }

  fn commit(&self, path: &Path, message: &str) -> RelResult<()> {
    self.check(&self.location(path), "commit")?;
    self.record(format!("commit {}", message));
    Ok(())
  }

  fn push_branch(&self, path: &Path, branch: &str) -> RelResult<()> {
    self.check(&self.location(path), "push")?;
    self.record(format!("push-branch {}", branch));
    Ok(())
  }

  fn remote_branch_exists(&self, _path: &Path, branch: &str) -> RelResult<bool> {
    Ok(self.remote_branches.contains(branch))
  }

  fn delete_remote_branch(&self, path: &Path, branch: &str) -> RelResult<()> {
    self.check(&self.location(path), "push --delete")?;
    self.record(format!("delete-remote {}", branch));
    Ok(())
  }

  fn create_archive(&self, url: &str, tag: &str, prefix: &str, output: &Path) -> RelResult<()> {
    fs::write(output, format!("{}@{} as {}/", url, tag, prefix))?;
    self.record(format!("archive {} {}", url, tag));
    Ok(())
  }
}

// ---------------------------------------------------------------------------
// FakeHosting
// ---------------------------------------------------------------------------

/// A release published through the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRelease {
  pub repo: String,
  pub tag: String,
  pub title: String,
  pub notes: String,
  pub files: Vec<PathBuf>,
}

/// A pull request opened through the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPullRequest {
  pub repo: String,
  pub base: String,
  pub head: String,
  pub title: String,
}

#[derive(Debug, Default)]
pub struct FakeHosting {
  tags: HashMap<(String, String), String>,
  latest: HashMap<String, String>,
  failing_repos: HashSet<String>,
  existing_releases: HashSet<(String, String)>,
  runs: HashMap<(String, String), Vec<CiRun>>,
  calls: Mutex<Vec<String>>,
  published: Mutex<Vec<PublishedRelease>>,
  uploads: Mutex<Vec<(String, Vec<PathBuf>)>>,
  pull_requests: Mutex<Vec<OpenedPullRequest>>,
}

impl FakeHosting {
  pub fn with_tag(mut self, repo: &str, tag: &str, commit: &str) -> Self {
    self.tags.insert((repo.to_string(), tag.to_string()), commit.to_string());
    self
  }

  pub fn with_latest_release(mut self, repo: &str, tag: &str) -> Self {
    self.latest.insert(repo.to_string(), tag.to_string());
    self
  }

  pub fn with_release(mut self, repo: &str, tag: &str) -> Self {
    self.existing_releases.insert((repo.to_string(), tag.to_string()));
    self
  }

  /// Replaces any runs already registered for the revision
  pub fn with_runs(mut self, repo: &str, revision: &str, runs: Vec<CiRun>) -> Self {
    self.runs.insert((repo.to_string(), revision.to_string()), runs);
    self
  }

  /// Every query about `repo` fails
  pub fn failing_for(mut self, repo: &str) -> Self {
    self.failing_repos.insert(repo.to_string());
    self
  }

  /// Every call made, formatted as `op repo [arg]`
  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  pub fn published(&self) -> Vec<PublishedRelease> {
    self.published.lock().unwrap().clone()
  }

  pub fn uploads(&self) -> Vec<(String, Vec<PathBuf>)> {
    self.uploads.lock().unwrap().clone()
  }

  pub fn pull_requests(&self) -> Vec<OpenedPullRequest> {
    self.pull_requests.lock().unwrap().clone()
  }

  fn enter(&self, op: &str, repo: &str, arg: &str) -> RelResult<()> {
    self.calls.lock().unwrap().push(format!("{} {} {}", op, repo, arg).trim_end().to_string());
    if self.failing_repos.contains(repo) {
      return Err(RelError::Remote(RemoteError::CommandFailed {
        command: format!("gh {}", op),
        stderr: format!("HTTP 502 for {}", repo),
      }));
    }
    Ok(())
  }
}

impl HostingPlatform for FakeHosting {
  fn tag_commit(&self, repo: &str, tag: &str) -> RelResult<Option<String>> {
    self.enter("tag", repo, tag)?;
    Ok(self.tags.get(&(repo.to_string(), tag.to_string())).cloned())
  }

  fn latest_release_tag(&self, repo: &str) -> RelResult<Option<String>> {
    self.enter("latest-release", repo, "")?;
    Ok(self.latest.get(repo).cloned())
  }

  fn release_exists(&self, repo: &str, tag: &str) -> RelResult<bool> {
    self.enter("release-view", repo, tag)?;
    let key = (repo.to_string(), tag.to_string());
    let published = self
      .published
      .lock()
      .unwrap()
      .iter()
      .any(|r| r.repo == repo && r.tag == tag);
    Ok(self.existing_releases.contains(&key) || published)
  }

  fn ci_status(&self, repo: &str, revision: &str) -> RelResult<Vec<CiRun>> {
    self.enter("run-list", repo, revision)?;
    Ok(
      self
        .runs
        .get(&(repo.to_string(), revision.to_string()))
        .cloned()
        .unwrap_or_default(),
    )
  }

  fn create_release(&self, repo: &str, tag: &str, title: &str, notes: &str, files: &[PathBuf]) -> RelResult<()> {
    self.enter("release-create", repo, tag)?;
    self.published.lock().unwrap().push(PublishedRelease {
      repo: repo.to_string(),
      tag: tag.to_string(),
      title: title.to_string(),
      notes: notes.to_string(),
      files: files.to_vec(),
    });
    Ok(())
  }

  fn upload_assets(&self, repo: &str, tag: &str, files: &[PathBuf]) -> RelResult<()> {
    self.enter("release-upload", repo, tag)?;
    self.uploads.lock().unwrap().push((tag.to_string(), files.to_vec()));
    Ok(())
  }

  fn open_pull_request(&self, repo: &str, base: &str, head: &str, title: &str, _body: &str) -> RelResult<String> {
    self.enter("pr-create", repo, head)?;
    let mut prs = self.pull_requests.lock().unwrap();
    prs.push(OpenedPullRequest {
      repo: repo.to_string(),
      base: base.to_string(),
      head: head.to_string(),
      title: title.to_string(),
    });
    Ok(format!("https://github.com/{}/pull/{}", repo, prs.len()))
  }
}

// ---------------------------------------------------------------------------
// FakeSigner
// ---------------------------------------------------------------------------

/// Writes a placeholder `.asc` next to the file
#[derive(Debug, Default)]
pub struct FakeSigner {
  signed: Mutex<Vec<PathBuf>>,
}

impl FakeSigner {
  pub fn signed(&self) -> Vec<PathBuf> {
    self.signed.lock().unwrap().clone()
  }
}

impl Signer for FakeSigner {
  fn detach_sign(&self, file: &Path) -> RelResult<PathBuf> {
    let signature = crate::remote::GpgSigner::signature_path(file);
    fs::write(&signature, "-----BEGIN PGP SIGNATURE-----\n")?;
    self.signed.lock().unwrap().push(file.to_path_buf());
    Ok(signature)
  }

  fn verify(&self, file: &Path, signature: &Path) -> RelResult<()> {
    if file.exists() && signature.exists() {
      Ok(())
    } else {
      Err(RelError::Remote(RemoteError::Signing {
        path: file.to_path_buf(),
        reason: "missing file or signature".to_string(),
      }))
    }
  }
}
