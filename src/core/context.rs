//! Release context - build once, pass everywhere
//!
//! # Architecture
//!
//! ```text
//! main.rs:
//!   ReleaseContext::build() -> &ReleaseContext
//!   |
//!   v
//! commands/release.rs, deps.rs, etc:
//!   fn run_*(ctx: &ReleaseContext, ...)
//! ```
//!
//! Commands never construct collaborators themselves, so every engine
//! component can be exercised against fakes.

use crate::core::config::ProjectRegistry;
use crate::core::error::{ConfigError, RelError, RelResult};
use crate::core::vcs::{SourceControl, SystemGit};
use crate::remote::{Fetcher, GhCli, GpgSigner, HostingPlatform, HttpFetcher, Signer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Registry plus the external collaborators every operation goes through.
pub struct ReleaseContext {
  /// Directory relman was started from (config search root)
  pub root: PathBuf,

  /// Project registry (relman.toml)
  /// Optional because lookups like `latest-release` need no configuration
  pub registry: Option<Arc<ProjectRegistry>>,

  pub git: Box<dyn SourceControl>,
  pub hosting: Box<dyn HostingPlatform>,
  pub fetcher: Box<dyn Fetcher>,
  pub signer: Box<dyn Signer>,
}

impl ReleaseContext {
  /// Build the context with the system collaborators (git, gh, HTTP, gpg).
  ///
  /// An explicit config path must load; otherwise a missing registry is
  /// tolerated and reported by [`require_registry`](Self::require_registry).
  pub fn build(root: &Path, config: Option<&Path>) -> RelResult<Self> {
    let registry = match config {
      Some(path) => Some(ProjectRegistry::load(root, Some(path))?),
      None => match ProjectRegistry::load(root, None) {
        Ok(registry) => Some(registry),
        Err(RelError::Config(ConfigError::NotFound { .. })) => None,
        Err(e) => return Err(e),
      },
    };
    debug!(root = %root.display(), has_registry = registry.is_some(), "built release context");

    let signing_key = registry.as_ref().and_then(|r| r.settings.signing_key.clone());
    Ok(Self {
      root: root.to_path_buf(),
      registry: registry.map(Arc::new),
      git: Box::new(SystemGit::new()),
      hosting: Box::new(GhCli::new()),
      fetcher: Box::new(HttpFetcher::new()),
      signer: Box::new(GpgSigner::new(signing_key)),
    })
  }

  /// Assemble a context from explicit parts
  pub fn with_parts(
    root: &Path,
    registry: ProjectRegistry,
    git: Box<dyn SourceControl>,
    hosting: Box<dyn HostingPlatform>,
    fetcher: Box<dyn Fetcher>,
    signer: Box<dyn Signer>,
  ) -> Self {
    Self {
      root: root.to_path_buf(),
      registry: Some(Arc::new(registry)),
      git,
      hosting,
      fetcher,
      signer,
    }
  }

  /// Get the registry or error if no relman.toml was found.
  pub fn require_registry(&self) -> RelResult<&ProjectRegistry> {
    self.registry.as_deref().ok_or_else(|| {
      RelError::Config(ConfigError::NotFound {
        searched_from: self.root.clone(),
      })
    })
  }
}
