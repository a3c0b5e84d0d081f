//! Error types for relman with contextual messages and exit codes
//!
//! Every failure carries a category (config, git, version, remote) and maps onto
//! an [`ErrorKind`] so callers and tests can branch on the reason without parsing
//! messages. Gate rejections travel as [`RelError::Gate`] only when a command
//! turns a denial into a process failure; the gate itself returns them as values.

use crate::release::gate::Rejection;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for relman
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, unknown project)
  User = 1,
  /// System error (git, gh, network, I/O)
  System = 2,
  /// Validation failure (gate rejected, remote state diverged)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Failure taxonomy shared by every operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  MalformedVersion,
  VersionUnderflow,
  VersionOrderInverted,
  UnsupportedProject,
  MissingPredecessorTag,
  MissingChangelogEntry,
  VersionMismatch,
  MissingVersionFile,
  CIPending,
  CIFailed,
  CINotRun,
  DependencyResolutionFailure,
  DeclarationNotFound,
  RemoteStateConflict,
  Configuration,
  SourceControl,
  Network,
  Io,
  Other,
}

/// Main error type for relman
#[derive(Debug)]
pub enum RelError {
  /// Registry/configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Version parsing and ordering errors
  Version(VersionError),

  /// Hosting platform, network and signing errors
  Remote(RemoteError),

  /// No handler registered for a project capability (changelog, version file)
  Unsupported { project: String, capability: &'static str },

  /// `rewrite_pinned_commit` found nothing to replace
  DeclarationNotFound { name: String, commit: String },

  /// The release gate denied a candidate
  Gate(Rejection),

  /// I/O errors
  Io(io::Error),

  /// Any other error, with what was being done when it happened
  Context { context: String, source: Box<RelError> },

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl RelError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    RelError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    RelError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      RelError::Message { message, context, help } => RelError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      other => RelError::Context {
        context: ctx_str,
        source: Box::new(other),
      },
    }
  }

  /// Classify this error
  pub fn kind(&self) -> ErrorKind {
    match self {
      RelError::Config(_) => ErrorKind::Configuration,
      RelError::Git(_) => ErrorKind::SourceControl,
      RelError::Version(e) => e.kind(),
      RelError::Remote(RemoteError::StateConflict { .. }) => ErrorKind::RemoteStateConflict,
      RelError::Remote(_) => ErrorKind::Network,
      RelError::Unsupported { .. } => ErrorKind::UnsupportedProject,
      RelError::DeclarationNotFound { .. } => ErrorKind::DeclarationNotFound,
      RelError::Gate(rejection) => rejection.kind(),
      RelError::Io(_) => ErrorKind::Io,
      RelError::Context { source, .. } => source.kind(),
      RelError::Message { .. } => ErrorKind::Other,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      RelError::Config(_) => ExitCode::User,
      RelError::Git(_) => ExitCode::System,
      RelError::Version(_) => ExitCode::User,
      RelError::Remote(RemoteError::StateConflict { .. }) => ExitCode::Validation,
      RelError::Remote(_) => ExitCode::System,
      RelError::Unsupported { .. } => ExitCode::User,
      RelError::DeclarationNotFound { .. } => ExitCode::User,
      RelError::Gate(_) => ExitCode::Validation,
      RelError::Io(_) => ExitCode::System,
      RelError::Context { source, .. } => source.exit_code(),
      RelError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      RelError::Config(e) => e.help_message(),
      RelError::Git(e) => e.help_message(),
      RelError::Remote(e) => e.help_message(),
      RelError::Unsupported { project, capability } => Some(format!(
        "Register a {} handler for '{}' in relman.toml",
        capability, project
      )),
      RelError::Gate(rejection) => rejection.help_message(),
      RelError::Message { help, .. } => help.clone(),
      RelError::Context { source, .. } => source.help_message(),
      _ => None,
    }
  }
}

impl fmt::Display for RelError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RelError::Config(e) => write!(f, "{}", e),
      RelError::Git(e) => write!(f, "{}", e),
      RelError::Version(e) => write!(f, "{}", e),
      RelError::Remote(e) => write!(f, "{}", e),
      RelError::Unsupported { project, capability } => {
        write!(f, "Don't know how to get {} for project '{}'", capability, project)
      }
      RelError::DeclarationNotFound { name, commit } => {
        write!(f, "No declaration of '{}' pins '{}' in its GIT_TAG", name, commit)
      }
      RelError::Gate(rejection) => write!(f, "{}", rejection),
      RelError::Io(e) => write!(f, "I/O error: {}", e),
      RelError::Context { context, source } => write!(f, "{}\n{}", source, context),
      RelError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for RelError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      RelError::Io(e) => Some(e),
      RelError::Context { source, .. } => Some(source.as_ref()),
      _ => None,
    }
  }
}

impl From<io::Error> for RelError {
  fn from(err: io::Error) -> Self {
    RelError::Io(err)
  }
}

impl From<String> for RelError {
  fn from(msg: String) -> Self {
    RelError::message(msg)
  }
}

impl From<&str> for RelError {
  fn from(msg: &str) -> Self {
    RelError::message(msg)
  }
}

impl From<toml_edit::de::Error> for RelError {
  fn from(err: toml_edit::de::Error) -> Self {
    RelError::Config(ConfigError::Parse {
      reason: err.to_string(),
    })
  }
}

impl From<serde_json::Error> for RelError {
  fn from(err: serde_json::Error) -> Self {
    RelError::message(format!("JSON error: {}", err))
  }
}

impl From<regex::Error> for RelError {
  fn from(err: regex::Error) -> Self {
    RelError::message(format!("Regex error: {}", err))
  }
}

impl From<ureq::Error> for RelError {
  fn from(err: ureq::Error) -> Self {
    match err {
      ureq::Error::Status(status, response) => RelError::Remote(RemoteError::Http {
        url: response.get_url().to_string(),
        reason: format!("HTTP {}", status),
      }),
      ureq::Error::Transport(transport) => RelError::Remote(RemoteError::Http {
        url: transport.url().map(|u| u.to_string()).unwrap_or_default(),
        reason: transport.to_string(),
      }),
    }
  }
}

impl From<std::string::FromUtf8Error> for RelError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    RelError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<anyhow::Error> for RelError {
  fn from(err: anyhow::Error) -> Self {
    RelError::message(err.to_string())
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// relman.toml not found
  NotFound { searched_from: PathBuf },

  /// relman.toml is not valid TOML or does not match the schema
  Parse { reason: String },

  /// Project not present in the registry
  UnknownProject { name: String },

  /// Dependency key not declared for a project
  UnknownDependency { project: String, key: String },

  /// Dependency declares both or neither of submodule_path / declaration_file
  InvalidDependency { project: String, key: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Create relman.toml or pass --config <path> (or set RELMAN_CONFIG).".to_string())
      }
      ConfigError::UnknownProject { .. } => Some("Projects must be registered under [projects.<name>].".to_string()),
      ConfigError::UnknownDependency { project, .. } => Some(format!(
        "Declare it under [projects.{}.dependencies.<key>] in relman.toml",
        project
      )),
      ConfigError::InvalidDependency { .. } => {
        Some("Set exactly one of `submodule_path` or `declaration_file`.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { searched_from } => {
        write!(f, "No relman configuration found from {}", searched_from.display())
      }
      ConfigError::Parse { reason } => write!(f, "Invalid relman configuration: {}", reason),
      ConfigError::UnknownProject { name } => write!(f, "Unknown project '{}'", name),
      ConfigError::UnknownDependency { project, key } => {
        write!(f, "Unknown dependency '{}' for project '{}'", key, project)
      }
      ConfigError::InvalidDependency { project, key, reason } => {
        write!(f, "Invalid dependency '{}' in project '{}': {}", key, project, reason)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// No tag reachable from a ref
  NoTagReachable { path: PathBuf, reference: String },

  /// Ref does not resolve to a commit
  UnknownRef { path: PathBuf, reference: String },

  /// Clone failed (network/auth)
  CloneFailed { url: String, reason: String },

  /// Push failed
  PushFailed { remote: String, refspec: String, reason: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") {
          Some("The remote has commits you don't have. Fetch and rebase first.".to_string())
        } else if reason.contains("permission denied") || reason.contains("403") {
          Some("Check your SSH key or token permissions for the repository.".to_string())
        } else {
          None
        }
      }
      GitError::NoTagReachable { .. } => Some("Fetch tags (`git fetch --tags`) and retry.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::NoTagReachable { path, reference } => {
        write!(f, "No tag reachable from '{}' in {}", reference, path.display())
      }
      GitError::UnknownRef { path, reference } => {
        write!(f, "Ref '{}' does not resolve to a commit in {}", reference, path.display())
      }
      GitError::CloneFailed { url, reason } => write!(f, "Failed to clone {}: {}", url, reason),
      GitError::PushFailed { remote, refspec, reason } => {
        write!(f, "Push of {} to {} failed: {}", refspec, remote, reason)
      }
    }
  }
}

/// Version parsing and comparison errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
  /// Not three dot-separated non-negative integers
  Malformed { version: String },

  /// previous_version("0.0.0")
  Underflow,

  /// The version in use is newer than the supposed latest
  OrderInverted { in_use: String, latest: String },

  /// Not a semantic version even after normalization
  Unparseable { version: String, reason: String },
}

impl VersionError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      VersionError::Malformed { .. } | VersionError::Unparseable { .. } => ErrorKind::MalformedVersion,
      VersionError::Underflow => ErrorKind::VersionUnderflow,
      VersionError::OrderInverted { .. } => ErrorKind::VersionOrderInverted,
    }
  }
}

impl fmt::Display for VersionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VersionError::Malformed { version } => {
        write!(f, "'{}' is not a MAJOR.MINOR.PATCH version (do not pass tag prefixes)", version)
      }
      VersionError::Underflow => write!(f, "Version cannot go lower than 0.0.0"),
      VersionError::OrderInverted { in_use, latest } => {
        write!(f, "Version in use ({}) is newer than latest ({})", in_use, latest)
      }
      VersionError::Unparseable { version, reason } => {
        write!(f, "Cannot parse version '{}': {}", version, reason)
      }
    }
  }
}

/// Hosting platform, network fetch and signing errors
#[derive(Debug)]
pub enum RemoteError {
  /// gh CLI failed
  CommandFailed { command: String, stderr: String },

  /// HTTP fetch failed (non-2xx or transport)
  Http { url: String, reason: String },

  /// gh returned output we could not interpret
  UnexpectedOutput { command: String, reason: String },

  /// Tag or release already exists pointing somewhere else
  StateConflict { what: String, expected: String, found: String },

  /// Signing or signature verification failed
  Signing { path: PathBuf, reason: String },
}

impl RemoteError {
  fn help_message(&self) -> Option<String> {
    match self {
      RemoteError::CommandFailed { stderr, .. } if stderr.contains("auth login") => {
        Some("Authenticate the GitHub CLI with `gh auth login` or set GH_TOKEN.".to_string())
      }
      RemoteError::StateConflict { .. } => {
        Some("Delete the stale remote object or release a different version.".to_string())
      }
      RemoteError::Signing { .. } => Some("Check `gpg --list-secret-keys` and settings.signing_key.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for RemoteError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RemoteError::CommandFailed { command, stderr } => write!(f, "Command failed: {}\n{}", command, stderr),
      RemoteError::Http { url, reason } => write!(f, "Failed to fetch {}: {}", url, reason),
      RemoteError::UnexpectedOutput { command, reason } => {
        write!(f, "Unexpected output from {}: {}", command, reason)
      }
      RemoteError::StateConflict { what, expected, found } => {
        write!(f, "{} already exists at {} (expected {})", what, found, expected)
      }
      RemoteError::Signing { path, reason } => write!(f, "Signing {} failed: {}", path.display(), reason),
    }
  }
}

/// Result type alias for relman
pub type RelResult<T> = Result<T, RelError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> RelResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> RelResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<RelError>,
{
  fn context(self, ctx: impl Into<String>) -> RelResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> RelResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &RelError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_version_error_kinds() {
    assert_eq!(
      RelError::Version(VersionError::Underflow).kind(),
      ErrorKind::VersionUnderflow
    );
    assert_eq!(
      RelError::Version(VersionError::Malformed {
        version: "v1.0".into()
      })
      .kind(),
      ErrorKind::MalformedVersion
    );
  }

  #[test]
  fn test_state_conflict_is_validation_failure() {
    let err = RelError::Remote(RemoteError::StateConflict {
      what: "tag v1.0.0".into(),
      expected: "aaa".into(),
      found: "bbb".into(),
    });
    assert_eq!(err.kind(), ErrorKind::RemoteStateConflict);
    assert_eq!(err.exit_code(), ExitCode::Validation);
  }

  #[test]
  fn test_context_on_message_appends() {
    let err = RelError::message("boom").context("while testing");
    assert_eq!(err.to_string(), "boom\nwhile testing");
  }

  #[test]
  fn test_context_wraps_other_errors() {
    let read: Result<String, io::Error> = Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
    let err = read.context("Failed to read cmake/dependencies.cmake").unwrap_err();

    assert_eq!(
      err.to_string(),
      "I/O error: no such file\nFailed to read cmake/dependencies.cmake"
    );
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(err.exit_code(), ExitCode::System);
    assert!(std::error::Error::source(&err).is_some());
  }

  #[test]
  fn test_context_keeps_kind_and_help_of_wrapped_error() {
    let err = RelError::Config(ConfigError::NotFound {
      searched_from: PathBuf::from("/work"),
    })
    .context("while loading the registry");
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(err.exit_code(), ExitCode::User);
    assert!(err.help_message().unwrap().contains("relman.toml"));
  }

  #[test]
  fn test_unsupported_names_project() {
    let err = RelError::Unsupported {
      project: "InvalidProject".into(),
      capability: "changelog",
    };
    assert!(err.to_string().contains("InvalidProject"));
    assert_eq!(err.kind(), ErrorKind::UnsupportedProject);
  }
}
