//! Release orchestration
//!
//! Once the gate admits a candidate, every step runs in a fixed order:
//!
//! ```text
//! tag -> tarball (+ .sha256) -> sign + verify -> publish
//! ```
//!
//! Steps that mutate remote state check first. A tag already on the remote
//! at the same commit is fine; at a different commit it is a conflict. An
//! existing release is left alone.

use crate::core::config::{ProjectDescriptor, ProjectRegistry};
use crate::core::context::ReleaseContext;
use crate::core::error::{RelError, RelResult, RemoteError, ResultExt};
use crate::core::vcs::SourceControl;
use crate::release::changelog::ChangelogResolver;
use crate::release::gate::{GateVerdict, Rejection, ReleaseCandidate, ReleaseGate};
use crate::remote::github::{archive_url, clone_url};
use crate::remote::{Fetcher, HostingPlatform, Signer};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct ReleaseOptions {
  /// Local clone of the project (tags are created and pushed from here)
  pub repo_path: PathBuf,
  /// Where the tarball, checksum and signature are written
  pub output_dir: PathBuf,
  pub sign: bool,
  pub dry_run: bool,
}

/// What a run will do, decided before anything is mutated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasePlan {
  pub project: String,
  pub version: String,
  pub tag: String,
  pub commit: String,
  pub tarball: PathBuf,
  pub sign: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseReport {
  pub plan: ReleasePlan,
  /// False when the remote already had the tag at this commit
  pub tag_pushed: bool,
  pub sha256: String,
  pub artifacts: Vec<PathBuf>,
  /// False when a release for the tag already existed
  pub release_created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
  Rejected(Rejection),
  Planned(ReleasePlan),
  Released(ReleaseReport),
}

pub struct ReleaseOrchestrator<'a> {
  registry: &'a ProjectRegistry,
  git: &'a dyn SourceControl,
  hosting: &'a dyn HostingPlatform,
  fetcher: &'a dyn Fetcher,
  signer: &'a dyn Signer,
}

impl<'a> ReleaseOrchestrator<'a> {
  pub fn new(ctx: &'a ReleaseContext) -> RelResult<Self> {
    Ok(Self {
      registry: ctx.require_registry()?,
      git: ctx.git.as_ref(),
      hosting: ctx.hosting.as_ref(),
      fetcher: ctx.fetcher.as_ref(),
      signer: ctx.signer.as_ref(),
    })
  }

  /// Gate, then release `version` of `project_name` from `revision`
  pub fn release(
    &self,
    project_name: &str,
    version: &str,
    revision: &str,
    options: &ReleaseOptions,
  ) -> RelResult<ReleaseOutcome> {
    let project = self.registry.project(project_name)?;
    let commit = self.git.resolve_ref_to_commit(&options.repo_path, revision)?;

    let candidate = ReleaseCandidate::new(project, version, commit.clone());
    if let GateVerdict::Rejected(rejection) =
      ReleaseGate::new(self.registry, self.hosting, self.fetcher).evaluate(&candidate)?
    {
      return Ok(ReleaseOutcome::Rejected(rejection));
    }

    let plan = ReleasePlan {
      project: project.name.clone(),
      version: version.to_string(),
      tag: candidate.tag(),
      commit,
      tarball: options
        .output_dir
        .join(format!("{}.tar.gz", archive_stem(project, version))),
      sign: options.sign,
    };
    if options.dry_run {
      return Ok(ReleaseOutcome::Planned(plan));
    }

    // 1. tag
    let tag_pushed = self.ensure_tag(project, &plan, &options.repo_path)?;

    // 2. tarball + checksum
    fs::create_dir_all(&options.output_dir)
      .with_context(|| format!("Failed to create {}", options.output_dir.display()))?;
    let url = clone_url(&self.registry.settings.archive_base, &project.repository);
    self
      .git
      .create_archive(&url, &plan.tag, &archive_stem(project, version), &plan.tarball)?;
    let (checksum_file, sha256) = write_checksum(&plan.tarball)?;
    let mut artifacts = vec![plan.tarball.clone(), checksum_file];

    // 3. signature
    if options.sign {
      artifacts.push(self.sign_and_verify(&plan.tarball)?);
    }

    // 4. publish
    let release_created = if self.hosting.release_exists(&project.repository, &plan.tag)? {
      info!(tag = %plan.tag, "release already exists, leaving it alone");
      false
    } else {
      let notes = ChangelogResolver::new(self.registry, self.fetcher).get_changelog(&project.name, version, &plan.commit)?;
      let title = format!("{} {}", project.name, version);
      self
        .hosting
        .create_release(&project.repository, &plan.tag, &title, &notes, &artifacts)?;
      true
    };

    Ok(ReleaseOutcome::Released(ReleaseReport {
      plan,
      tag_pushed,
      sha256,
      artifacts,
      release_created,
    }))
  }

  /// Download the platform's archive for an existing release, sign it and
  /// attach the signature. Returns the signature path.
  pub fn sign_published(&self, project_name: &str, version: &str, output_dir: &Path) -> RelResult<PathBuf> {
    let project = self.registry.project(project_name)?;
    let tag = project.tag_for(version);
    let url = archive_url(&self.registry.settings.archive_base, &project.repository, &tag);

    let bytes = self.fetcher.fetch_bytes(&url)?;
    fs::create_dir_all(output_dir).with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let tarball = output_dir.join(format!("{}.tar.gz", archive_stem(project, version)));
    fs::write(&tarball, bytes).with_context(|| format!("Failed to write {}", tarball.display()))?;

    let signature = self.sign_and_verify(&tarball)?;
    self
      .hosting
      .upload_assets(&project.repository, &tag, std::slice::from_ref(&signature))?;
    Ok(signature)
  }

  /// Publish a release for an existing tag with operator-written notes
  pub fn publish(&self, project_name: &str, tag: &str, notes: &str) -> RelResult<()> {
    let project = self.registry.project(project_name)?;
    if notes.trim().is_empty() {
      return Err(RelError::with_help(
        format!("No release notes for {}", tag),
        "Write the notes to a file and pass it with --notes-file.",
      ));
    }
    let version = tag.strip_prefix(&project.tag_prefix).unwrap_or(tag);
    let title = format!("{} {}", project.name, version);
    self.hosting.create_release(&project.repository, tag, &title, notes, &[])
  }

  /// Returns whether a tag was pushed
  fn ensure_tag(&self, project: &ProjectDescriptor, plan: &ReleasePlan, repo_path: &Path) -> RelResult<bool> {
    match self.hosting.tag_commit(&project.repository, &plan.tag)? {
      Some(existing) if existing == plan.commit => {
        info!(tag = %plan.tag, "tag already on remote at this commit");
        Ok(false)
      }
      Some(existing) => Err(RelError::Remote(RemoteError::StateConflict {
        what: format!("tag {}", plan.tag),
        expected: plan.commit.clone(),
        found: existing,
      })),
      None => {
        let message = format!(
          "{} {} ({})",
          project.name,
          plan.version,
          chrono::Utc::now().format("%Y-%m-%d")
        );
        self.git.create_tag(repo_path, &plan.tag, &plan.commit, &message)?;
        self.git.push_tag(repo_path, &plan.tag)?;
        info!(tag = %plan.tag, commit = %plan.commit, "pushed tag");
        Ok(true)
      }
    }
  }

  fn sign_and_verify(&self, file: &Path) -> RelResult<PathBuf> {
    let signature = self.signer.detach_sign(file)?;
    self.signer.verify(file, &signature)?;
    Ok(signature)
  }
}

/// `kddockwidgets-2.1.0`
fn archive_stem(project: &ProjectDescriptor, version: &str) -> String {
  format!("{}-{}", project.tarball_name, version)
}

/// Write `<file>.sha256` in `sha256sum` format; returns its path and the digest
fn write_checksum(file: &Path) -> RelResult<(PathBuf, String)> {
  let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
  let digest = hex::encode(Sha256::digest(&bytes));

  let mut name = file.as_os_str().to_owned();
  name.push(".sha256");
  let checksum_file = PathBuf::from(name);

  let file_name = file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
  fs::write(&checksum_file, format!("{}  {}\n", digest, file_name))
    .with_context(|| format!("Failed to write {}", checksum_file.display()))?;
  Ok((checksum_file, digest))
}
