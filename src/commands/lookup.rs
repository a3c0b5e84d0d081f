//! One-shot lookups that print a single value (for use in shell scripts)

use crate::core::context::ReleaseContext;
use crate::core::config::Settings;
use crate::core::error::{RelError, RelResult};
use crate::deps::vcpkg;

/// `relman latest-release <owner/repo>`
pub fn run_latest_release(ctx: &ReleaseContext, repo: &str) -> RelResult<()> {
  match ctx.hosting.latest_release_tag(repo)? {
    Some(tag) => {
      println!("{}", tag);
      Ok(())
    }
    None => Err(RelError::message(format!("{} has no published release", repo))),
  }
}

/// `relman vcpkg-version <port>`
pub fn run_vcpkg_version(ctx: &ReleaseContext, port: &str, repository: &str, branch: &str) -> RelResult<()> {
  let default_base = Settings::default().raw_content_base;
  let base = ctx
    .registry
    .as_ref()
    .map(|r| r.settings.raw_content_base.as_str())
    .unwrap_or(&default_base);

  let version = vcpkg::latest_port_version(ctx.fetcher.as_ref(), base, repository, branch, port)?;
  println!("{}", version);
  Ok(())
}
