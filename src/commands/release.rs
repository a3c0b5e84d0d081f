//! Release command implementations
//!
//! - `release`: gate, tag, tarball, sign, publish
//! - `sign`: sign the platform archive of an existing release
//! - `publish`: create a release from a notes file

use crate::core::context::ReleaseContext;
use crate::core::error::{RelError, RelResult, ResultExt};
use crate::release::{ReleaseOptions, ReleaseOrchestrator, ReleaseOutcome};
use std::fs;
use std::path::Path;

/// Run the release command
pub fn run_release(
  ctx: &ReleaseContext,
  project_name: &str,
  version: &str,
  revision: &str,
  options: ReleaseOptions,
) -> RelResult<()> {
  let orchestrator = ReleaseOrchestrator::new(ctx)?;

  match orchestrator.release(project_name, version, revision, &options)? {
    ReleaseOutcome::Rejected(rejection) => Err(RelError::Gate(rejection)),

    ReleaseOutcome::Planned(plan) => {
      println!("📦 Release plan for {} {}", plan.project, plan.version);
      println!();
      println!("  Tag:     {} -> {}", plan.tag, plan.commit);
      println!("  Tarball: {}", plan.tarball.display());
      println!("  Sign:    {}", if plan.sign { "yes" } else { "no" });
      println!();
      println!("🔍 Dry-run mode (gate passed, nothing changed)");
      Ok(())
    }

    ReleaseOutcome::Released(report) => {
      let plan = &report.plan;
      if report.tag_pushed {
        println!("   Pushed tag {}", plan.tag);
      } else {
        println!("   Tag {} already on remote at {}", plan.tag, plan.commit);
      }
      println!("   sha256 {}", report.sha256);
      for artifact in &report.artifacts {
        println!("   {}", artifact.display());
      }
      if report.release_created {
        println!("✅ Released {} {}", plan.project, plan.version);
      } else {
        println!("::notice::Release {} already exists; assets were not uploaded", plan.tag);
      }
      Ok(())
    }
  }
}

/// Run the sign command
pub fn run_sign(ctx: &ReleaseContext, project_name: &str, version: &str, output_dir: &Path) -> RelResult<()> {
  let signature = ReleaseOrchestrator::new(ctx)?.sign_published(project_name, version, output_dir)?;
  println!("✅ Uploaded {}", signature.display());
  Ok(())
}

/// Run the publish command
pub fn run_publish(ctx: &ReleaseContext, project_name: &str, tag: &str, notes_file: &Path) -> RelResult<()> {
  let notes = fs::read_to_string(notes_file)
    .with_context(|| format!("Could not read release notes file {}", notes_file.display()))?;
  ReleaseOrchestrator::new(ctx)?.publish(project_name, tag, &notes)?;
  println!("✅ Published {}", tag);
  Ok(())
}
