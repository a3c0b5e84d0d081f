//! `relman changelog` - print one version's changelog section

use crate::core::context::ReleaseContext;
use crate::core::error::{RelError, RelResult};
use crate::release::ChangelogResolver;

/// Run the changelog command
pub fn run_changelog(ctx: &ReleaseContext, project_name: &str, version: &str, revision: &str) -> RelResult<()> {
  let registry = ctx.require_registry()?;
  let text = ChangelogResolver::new(registry, ctx.fetcher.as_ref()).get_changelog(project_name, version, revision)?;

  if text.is_empty() {
    return Err(RelError::with_help(
      format!("No changelog entry for {} {} at {}", project_name, version, revision),
      "Check the version and revision, or add the entry first.",
    ));
  }

  println!("{}", text);
  Ok(())
}
