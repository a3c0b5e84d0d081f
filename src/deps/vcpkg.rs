//! Port versions published in a vcpkg registry

use crate::core::error::{RelError, RelResult, RemoteError};
use crate::remote::Fetcher;
use crate::remote::github::raw_file_url;
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_REPOSITORY: &str = "microsoft/vcpkg";
pub const DEFAULT_BRANCH: &str = "master";

/// The part of a port manifest we care about. vcpkg allows several version
/// fields; exactly one is set per port.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PortManifest {
  version: Option<String>,
  version_semver: Option<String>,
  version_date: Option<String>,
  version_string: Option<String>,
}

impl PortManifest {
  fn version(self) -> Option<String> {
    self
      .version
      .or(self.version_semver)
      .or(self.version_date)
      .or(self.version_string)
  }
}

/// Version declared in `ports/<port>/vcpkg.json` on `branch` of `repository`
pub fn latest_port_version(
  fetcher: &dyn Fetcher,
  raw_content_base: &str,
  repository: &str,
  branch: &str,
  port: &str,
) -> RelResult<String> {
  let revision = format!("refs/heads/{}", branch);
  let file = PathBuf::from("ports").join(port).join("vcpkg.json");
  let url = raw_file_url(raw_content_base, repository, &revision, &file);

  let text = fetcher.fetch_text(&url)?;
  let manifest: PortManifest = serde_json::from_str(&text)?;
  manifest.version().ok_or_else(|| {
    RelError::Remote(RemoteError::UnexpectedOutput {
      command: url,
      reason: "port manifest has no version field".to_string(),
    })
  })
}
