//! Project registry (relman.toml)
//!
//! The registry is read once, validated, and turned into immutable
//! [`ProjectDescriptor`]s whose format handlers are already resolved into closed
//! enums. Nothing downstream dispatches on project-name strings.
//!
//! # Example
//!
//! ```toml
//! [settings]
//! release_workflow = "Create release"
//!
//! [projects.KDDockWidgets]
//! repository = "KDAB/KDDockWidgets"
//! tag_prefix = "v"
//! changelog = { format = "bulleted" }
//! version_file = { format = "cmake-version-vars", file = "CMakeLists.txt", variable_prefix = "KDDockWidgets" }
//!
//! [projects.KDDockWidgets.dependencies.fmt]
//! declaration_file = "cmake/dependencies.cmake"
//! main_branch = "master"
//!
//! [projects.Knut.dependencies.pugixml]
//! submodule_path = "3rdparty/pugixml"
//! ```

use crate::core::error::{ConfigError, RelError, RelResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_BRANCH: &str = "main";

/// Top-level settings shared by all projects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
  /// CI run name of the release workflow itself; ignored by the gate
  #[serde(default = "default_release_workflow")]
  pub release_workflow: String,

  /// Base URL for raw file access (`<base>/<owner>/<repo>/<rev>/<file>`)
  #[serde(default = "default_raw_content_base")]
  pub raw_content_base: String,

  /// Base URL for source archives (`<base>/<owner>/<repo>/archive/refs/tags/<tag>.tar.gz`)
  #[serde(default = "default_archive_base")]
  pub archive_base: String,

  /// GPG key used for detached signatures (default key if unset)
  #[serde(default)]
  pub signing_key: Option<String>,
}

fn default_release_workflow() -> String {
  "Create release".to_string()
}

fn default_raw_content_base() -> String {
  "https://raw.githubusercontent.com".to_string()
}

fn default_archive_base() -> String {
  "https://github.com".to_string()
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      release_workflow: default_release_workflow(),
      raw_content_base: default_raw_content_base(),
      archive_base: default_archive_base(),
      signing_key: None,
    }
  }
}

/// How a project's changelog is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangelogFormat {
  /// `* vX.Y.Z` bullets, one per release
  Bulleted,
  /// `Version X.Y.Z` headings followed by a body
  Headed,
}

impl ChangelogFormat {
  fn default_file(self) -> &'static str {
    match self {
      ChangelogFormat::Bulleted => "Changelog",
      ChangelogFormat::Headed => "CHANGES",
    }
  }
}

/// Changelog handler resolved at load time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogSource {
  pub format: ChangelogFormat,
  /// Path of the changelog inside the repository
  pub file: String,
}

/// How a project declares its canonical version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionFileFormat {
  /// `set(<prefix>_VERSION_MAJOR N)` and friends in a CMake file
  CMakeVersionVars { variable_prefix: String },
  /// A file whose only content is the version
  VersionTxt,
}

/// Canonical version file, resolved at load time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFile {
  pub format: VersionFileFormat,
  pub file: String,
}

/// One pinned dependency, either a submodule or a fetch declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencySpec {
  Submodule {
    submodule_path: PathBuf,
    main_branch: Option<String>,
    /// Hosting slug whose latest release is authoritative
    upstream: Option<String>,
  },
  FetchDeclaration {
    declaration_file: PathBuf,
    main_branch: Option<String>,
  },
}

impl DependencySpec {
  /// Branch the upstream releases from
  pub fn main_branch(&self) -> &str {
    match self {
      DependencySpec::Submodule { main_branch, .. } | DependencySpec::FetchDeclaration { main_branch, .. } => {
        main_branch.as_deref().unwrap_or(DEFAULT_BRANCH)
      }
    }
  }

  /// Submodule path or declaration file path
  pub fn path(&self) -> &Path {
    match self {
      DependencySpec::Submodule { submodule_path, .. } => submodule_path,
      DependencySpec::FetchDeclaration { declaration_file, .. } => declaration_file,
    }
  }

  pub fn is_submodule(&self) -> bool {
    matches!(self, DependencySpec::Submodule { .. })
  }
}

/// A registered project; immutable for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
  pub name: String,
  /// Hosting slug (`owner/repo`)
  pub repository: String,
  pub tag_prefix: String,
  pub default_branch: String,
  pub tarball_name: String,
  pub changelog: Option<ChangelogSource>,
  pub version_file: Option<VersionFile>,
  pub dependencies: BTreeMap<String, DependencySpec>,
}

impl ProjectDescriptor {
  pub fn has_canonical_version_file(&self) -> bool {
    self.version_file.is_some()
  }

  /// Tag name for a numeric version
  pub fn tag_for(&self, version: &str) -> String {
    format!("{}{}", self.tag_prefix, version)
  }

  /// Look up a dependency, rejecting unknown keys
  pub fn dependency(&self, key: &str) -> RelResult<&DependencySpec> {
    self.dependencies.get(key).ok_or_else(|| {
      RelError::Config(ConfigError::UnknownDependency {
        project: self.name.clone(),
        key: key.to_string(),
      })
    })
  }
}

/// The immutable project registry
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
  pub settings: Settings,
  projects: BTreeMap<String, ProjectDescriptor>,
}

impl ProjectRegistry {
  /// Find config file: explicit path, then relman.toml, .relman.toml, .config/relman.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("relman.toml"),
      path.join(".relman.toml"),
      path.join(".config").join("relman.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load the registry, from `explicit` when given or by searching `dir`
  pub fn load(dir: &Path, explicit: Option<&Path>) -> RelResult<Self> {
    let config_path = match explicit {
      Some(p) if !p.is_file() => {
        return Err(RelError::Config(ConfigError::NotFound {
          searched_from: p.to_path_buf(),
        }));
      }
      Some(p) => p.to_path_buf(),
      None => Self::find_config_path(dir).ok_or_else(|| {
        RelError::Config(ConfigError::NotFound {
          searched_from: dir.to_path_buf(),
        })
      })?,
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    Self::from_toml(&content)
  }

  /// Parse and validate registry text
  pub fn from_toml(content: &str) -> RelResult<Self> {
    let raw: RawRegistry = toml_edit::de::from_str(content)?;
    raw.into_registry()
  }

  /// Look up a project, rejecting unknown names
  pub fn project(&self, name: &str) -> RelResult<&ProjectDescriptor> {
    self.projects.get(name).ok_or_else(|| {
      RelError::Config(ConfigError::UnknownProject {
        name: name.to_string(),
      })
    })
  }
}

// On-disk shape; converted into the validated types above.

#[derive(Debug, Deserialize)]
struct RawRegistry {
  #[serde(default)]
  settings: Settings,
  #[serde(default)]
  projects: BTreeMap<String, RawProject>,
}

#[derive(Debug, Deserialize)]
struct RawProject {
  repository: String,
  #[serde(default)]
  tag_prefix: String,
  #[serde(default)]
  default_branch: Option<String>,
  #[serde(default)]
  tarball_name: Option<String>,
  #[serde(default)]
  changelog: Option<RawChangelog>,
  #[serde(default)]
  version_file: Option<RawVersionFile>,
  #[serde(default)]
  dependencies: BTreeMap<String, RawDependency>,
}

#[derive(Debug, Deserialize)]
struct RawChangelog {
  format: ChangelogFormat,
  #[serde(default)]
  file: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "format", rename_all = "kebab-case")]
enum RawVersionFile {
  CmakeVersionVars {
    #[serde(default)]
    file: Option<String>,
    variable_prefix: String,
  },
  VersionTxt {
    #[serde(default)]
    file: Option<String>,
  },
}

#[derive(Debug, Deserialize)]
struct RawDependency {
  #[serde(default)]
  submodule_path: Option<PathBuf>,
  #[serde(default)]
  declaration_file: Option<PathBuf>,
  #[serde(default)]
  main_branch: Option<String>,
  #[serde(default)]
  upstream: Option<String>,
}

impl RawRegistry {
  fn into_registry(self) -> RelResult<ProjectRegistry> {
    let mut projects = BTreeMap::new();
    for (name, raw) in self.projects {
      let project = raw.into_descriptor(&name)?;
      projects.insert(name, project);
    }
    Ok(ProjectRegistry {
      settings: self.settings,
      projects,
    })
  }
}

impl RawProject {
  fn into_descriptor(self, name: &str) -> RelResult<ProjectDescriptor> {
    if self.repository.split('/').filter(|s| !s.is_empty()).count() != 2 {
      return Err(RelError::Config(ConfigError::Parse {
        reason: format!(
          "project '{}': repository must be 'owner/repo', got '{}'",
          name, self.repository
        ),
      }));
    }

    let mut dependencies = BTreeMap::new();
    for (key, dep) in self.dependencies {
      let spec = dep.into_spec(name, &key)?;
      dependencies.insert(key, spec);
    }

    let changelog = self.changelog.map(|c| ChangelogSource {
      file: c.file.unwrap_or_else(|| c.format.default_file().to_string()),
      format: c.format,
    });

    let version_file = self.version_file.map(|v| match v {
      RawVersionFile::CmakeVersionVars { file, variable_prefix } => VersionFile {
        format: VersionFileFormat::CMakeVersionVars { variable_prefix },
        file: file.unwrap_or_else(|| "CMakeLists.txt".to_string()),
      },
      RawVersionFile::VersionTxt { file } => VersionFile {
        format: VersionFileFormat::VersionTxt,
        file: file.unwrap_or_else(|| "version.txt".to_string()),
      },
    });

    Ok(ProjectDescriptor {
      name: name.to_string(),
      repository: self.repository,
      tag_prefix: self.tag_prefix,
      default_branch: self.default_branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
      tarball_name: self.tarball_name.unwrap_or_else(|| name.to_lowercase()),
      changelog,
      version_file,
      dependencies,
    })
  }
}

impl RawDependency {
  fn into_spec(self, project: &str, key: &str) -> RelResult<DependencySpec> {
    let invalid = |reason: &str| {
      RelError::Config(ConfigError::InvalidDependency {
        project: project.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
      })
    };

    match (self.submodule_path, self.declaration_file) {
      (Some(submodule_path), None) => Ok(DependencySpec::Submodule {
        submodule_path,
        main_branch: self.main_branch,
        upstream: self.upstream,
      }),
      (None, Some(declaration_file)) => {
        if self.upstream.is_some() {
          return Err(invalid("`upstream` only applies to submodules"));
        }
        Ok(DependencySpec::FetchDeclaration {
          declaration_file,
          main_branch: self.main_branch,
        })
      }
      (Some(_), Some(_)) => Err(invalid("both submodule_path and declaration_file are set")),
      (None, None) => Err(invalid("neither submodule_path nor declaration_file is set")),
    }
  }
}
