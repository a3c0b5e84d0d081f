//! Canonical declared version of a project (its version-of-record file)

use crate::core::config::{ProjectDescriptor, ProjectRegistry, VersionFileFormat};
use crate::core::error::{RelError, RelResult};
use crate::remote::Fetcher;
use crate::remote::github::raw_file_url;
use regex::Regex;
use std::path::Path;

impl VersionFileFormat {
  /// Declared version from file contents; `None` if the file doesn't carry one
  pub fn parse(&self, text: &str) -> RelResult<Option<String>> {
    match self {
      VersionFileFormat::CMakeVersionVars { variable_prefix } => {
        let mut parts = Vec::with_capacity(3);
        for component in ["MAJOR", "MINOR", "PATCH"] {
          let pattern = format!(
            r#"(?i)set\s*\(\s*{}_VERSION_{}\s+"?(\d+)"?\s*\)"#,
            regex::escape(variable_prefix),
            component
          );
          let re = Regex::new(&pattern)?;
          match re.captures(text).and_then(|c| c.get(1)) {
            Some(m) => parts.push(m.as_str().to_string()),
            None => return Ok(None),
          }
        }
        Ok(Some(parts.join(".")))
      }
      VersionFileFormat::VersionTxt => Ok(
        text
          .lines()
          .map(str::trim)
          .find(|line| !line.is_empty())
          .map(str::to_string),
      ),
    }
  }
}

/// Reads a project's declared version at a revision
pub struct VersionFileReader<'a> {
  registry: &'a ProjectRegistry,
  fetcher: &'a dyn Fetcher,
}

impl<'a> VersionFileReader<'a> {
  pub fn new(registry: &'a ProjectRegistry, fetcher: &'a dyn Fetcher) -> Self {
    Self { registry, fetcher }
  }

  /// `Ok(None)` when the file exists but declares no version
  pub fn declared_version(&self, project: &ProjectDescriptor, revision: &str) -> RelResult<Option<String>> {
    let version_file = project.version_file.as_ref().ok_or_else(|| RelError::Unsupported {
      project: project.name.clone(),
      capability: "version file",
    })?;

    let url = raw_file_url(
      &self.registry.settings.raw_content_base,
      &project.repository,
      revision,
      Path::new(&version_file.file),
    );
    let text = self.fetcher.fetch_text(&url)?;
    version_file.format.parse(&text)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::error::ErrorKind;
  use crate::core::fakes::FakeFetcher;

  const CMAKE: &str = r#"
cmake_minimum_required(VERSION 3.16)
set(KDDockWidgets_VERSION_MAJOR 2)
set(KDDockWidgets_VERSION_MINOR 1)
SET( KDDockWidgets_VERSION_PATCH "50" )
project(KDDockWidgets VERSION ${KDDockWidgets_VERSION})
"#;

  fn cmake_format() -> VersionFileFormat {
    VersionFileFormat::CMakeVersionVars {
      variable_prefix: "KDDockWidgets".to_string(),
    }
  }

  #[test]
  fn test_cmake_version_vars() {
    assert_eq!(cmake_format().parse(CMAKE).unwrap().as_deref(), Some("2.1.50"));
  }

  #[test]
  fn test_cmake_missing_component() {
    let text = "set(KDDockWidgets_VERSION_MAJOR 2)\nset(KDDockWidgets_VERSION_MINOR 1)\n";
    assert_eq!(cmake_format().parse(text).unwrap(), None);
  }

  #[test]
  fn test_version_txt() {
    assert_eq!(
      VersionFileFormat::VersionTxt.parse("\n  2.2.0  \n").unwrap().as_deref(),
      Some("2.2.0")
    );
    assert_eq!(VersionFileFormat::VersionTxt.parse("   \n").unwrap(), None);
  }

  #[test]
  fn test_declared_version_fetches_at_revision() {
    let registry = ProjectRegistry::from_toml(
      r#"
[projects.KDDockWidgets]
repository = "KDAB/KDDockWidgets"
version_file = { format = "cmake-version-vars", variable_prefix = "KDDockWidgets" }

[projects.Plain]
repository = "KDAB/Plain"
"#,
    )
    .unwrap();
    let fetcher = FakeFetcher::default().with_text(
      "https://raw.githubusercontent.com/KDAB/KDDockWidgets/abc/CMakeLists.txt",
      CMAKE,
    );
    let reader = VersionFileReader::new(&registry, &fetcher);

    let project = registry.project("KDDockWidgets").unwrap();
    assert_eq!(reader.declared_version(project, "abc").unwrap().as_deref(), Some("2.1.50"));

    let plain = registry.project("Plain").unwrap();
    let err = reader.declared_version(plain, "abc").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedProject);
  }
}
