//! Per-version changelog extraction
//!
//! Changelog layouts are not auto-detected. Each project registers one
//! [`ChangelogFormat`]; an unregistered project is an error, never a guess.

use crate::core::config::{ChangelogFormat, ProjectRegistry};
use crate::core::error::{RelError, RelResult};
use crate::remote::Fetcher;
use crate::remote::github::raw_file_url;
use std::path::Path;

const BULLET_MARKER: &str = "* v";
const SECTION_MARKER: &str = "Version ";

impl ChangelogFormat {
  /// Extract the section for `version`, or `""` when there is none
  pub fn extract(self, text: &str, version: &str) -> String {
    match self {
      ChangelogFormat::Bulleted => extract_bulleted(text, version),
      ChangelogFormat::Headed => extract_headed(text, version),
    }
  }
}

/// The section text must start with the version and not continue it
/// (`2.1.0` must not match a `2.1.01` or `2.1.0.1` section)
fn starts_with_version(section: &str, version: &str) -> bool {
  section
    .strip_prefix(version)
    .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_digit() || c == '.'))
}

/// `* v2.1.0 ...` bullets. Returns the whole bullet including its marker.
pub fn extract_bulleted(text: &str, version: &str) -> String {
  text
    .split(BULLET_MARKER)
    .skip(1)
    .find(|section| starts_with_version(section, version))
    .map(|section| format!("{}{}", BULLET_MARKER, section.trim()))
    .unwrap_or_default()
}

/// `Version 2.1.0:` headings. Underline/diff lines (starting with `-`) are
/// dropped first; the heading line itself is not part of the result.
pub fn extract_headed(text: &str, version: &str) -> String {
  let cleaned: String = text
    .lines()
    .filter(|line| !line.starts_with('-'))
    .map(|line| format!("{}\n", line))
    .collect();

  cleaned
    .split(SECTION_MARKER)
    .skip(1)
    .find(|section| starts_with_version(section, version))
    .map(|section| section.split_once('\n').map(|(_, body)| body.trim()).unwrap_or_default().to_string())
    .unwrap_or_default()
}

/// Resolves changelog sections for registered projects at a given revision
pub struct ChangelogResolver<'a> {
  registry: &'a ProjectRegistry,
  fetcher: &'a dyn Fetcher,
}

impl<'a> ChangelogResolver<'a> {
  pub fn new(registry: &'a ProjectRegistry, fetcher: &'a dyn Fetcher) -> Self {
    Self { registry, fetcher }
  }

  /// Changelog text for `version` as of `revision`; `""` means no entry
  pub fn get_changelog(&self, project_name: &str, version: &str, revision: &str) -> RelResult<String> {
    let unsupported = || RelError::Unsupported {
      project: project_name.to_string(),
      capability: "changelog",
    };

    let project = self.registry.project(project_name).map_err(|_| unsupported())?;
    let source = project.changelog.as_ref().ok_or_else(unsupported)?;

    let url = raw_file_url(
      &self.registry.settings.raw_content_base,
      &project.repository,
      revision,
      Path::new(&source.file),
    );
    let text = self.fetcher.fetch_text(&url)?;

    Ok(source.format.extract(&text, version))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::error::ErrorKind;
  use crate::core::fakes::FakeFetcher;

  const BULLETED: &str = "\
Changelog for KDDockWidgets

* v2.1.0
  - Fixed a crash when undocking
  - Qt 6.7 support

* v2.0.0
  - Initial 2.0 release

* v1.7.0
  - Old stuff
";

  const HEADED: &str = "\
Version 2.1.0:
--------------
 * KDStateMachineEditor now looks for Qt6 by default
 * Removed Qt5 fallback

Version 2.0.0:
--------------
 * Ported to CMake
";

  const REGISTRY: &str = r#"
[projects.KDDockWidgets]
repository = "KDAB/KDDockWidgets"
changelog = { format = "bulleted" }

[projects.KDStateMachineEditor]
repository = "KDAB/KDStateMachineEditor"
changelog = { format = "headed" }

[projects.NoChangelog]
repository = "KDAB/Nothing"
"#;

  #[test]
  fn test_bulleted_extraction() {
    let entry = extract_bulleted(BULLETED, "2.1.0");
    assert!(entry.starts_with("* v2.1.0"));
    assert!(entry.contains("Qt 6.7 support"));
    assert!(!entry.contains("2.0.0"));

    assert_eq!(extract_bulleted(BULLETED, "9999.0.0"), "");
  }

  #[test]
  fn test_bulleted_respects_version_boundary() {
    let text = "* v2.1.01\n  - typo release\n* v2.1.0\n  - real\n";
    assert_eq!(extract_bulleted(text, "2.1.0"), "* v2.1.0\n  - real");
  }

  #[test]
  fn test_headed_extraction() {
    let entry = extract_headed(HEADED, "2.1.0");
    assert!(entry.starts_with("* KDStateMachineEditor now looks for Qt6 by default"));
    assert!(entry.contains("Removed Qt5 fallback"));
    assert!(!entry.contains("----"));
    assert!(!entry.contains("Ported to CMake"));

    assert_eq!(extract_headed(HEADED, "9999.0.0"), "");
  }

  #[test]
  fn test_get_changelog_fetches_at_revision() {
    let registry = ProjectRegistry::from_toml(REGISTRY).unwrap();
    let fetcher = FakeFetcher::default().with_text(
      "https://raw.githubusercontent.com/KDAB/KDDockWidgets/cfc6750/Changelog",
      BULLETED,
    );
    let resolver = ChangelogResolver::new(&registry, &fetcher);

    let entry = resolver.get_changelog("KDDockWidgets", "2.1.0", "cfc6750").unwrap();
    assert!(entry.starts_with("* v2.1.0"));

    let missing = resolver.get_changelog("KDDockWidgets", "9999.0.0", "cfc6750").unwrap();
    assert_eq!(missing, "");
  }

  #[test]
  fn test_headed_project_uses_changes_file() {
    let registry = ProjectRegistry::from_toml(REGISTRY).unwrap();
    let fetcher = FakeFetcher::default().with_text(
      "https://raw.githubusercontent.com/KDAB/KDStateMachineEditor/main/CHANGES",
      HEADED,
    );
    let resolver = ChangelogResolver::new(&registry, &fetcher);
    let entry = resolver.get_changelog("KDStateMachineEditor", "2.0.0", "main").unwrap();
    assert_eq!(entry, "* Ported to CMake");
  }

  #[test]
  fn test_unsupported_project() {
    let registry = ProjectRegistry::from_toml(REGISTRY).unwrap();
    let fetcher = FakeFetcher::default();
    let resolver = ChangelogResolver::new(&registry, &fetcher);

    let err = resolver.get_changelog("InvalidProject", "1.0.0", "main").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedProject);
    assert!(err.to_string().contains("InvalidProject"));

    let err = resolver.get_changelog("NoChangelog", "1.0.0", "main").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedProject);
    assert!(fetcher.requested().is_empty());
  }
}
