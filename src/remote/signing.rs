//! Detached signatures via gpg

use crate::core::error::{RelError, RelResult, RemoteError, ResultExt};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

pub trait Signer: Send + Sync {
  /// Write a detached signature next to `file` and return its path
  fn detach_sign(&self, file: &Path) -> RelResult<PathBuf>;

  /// Check `signature` against `file`
  fn verify(&self, file: &Path, signature: &Path) -> RelResult<()>;
}

/// `Signer` backed by the `gpg` binary, ASCII-armored (`<file>.asc`)
#[derive(Debug, Clone, Default)]
pub struct GpgSigner {
  key: Option<String>,
}

impl GpgSigner {
  pub fn new(key: Option<String>) -> Self {
    Self { key }
  }

  /// `foo.tar.gz` -> `foo.tar.gz.asc`
  pub fn signature_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".asc");
    PathBuf::from(name)
  }

  fn run(&self, file: &Path, args: &[&str]) -> RelResult<()> {
    debug!(file = %file.display(), ?args, "running gpg");
    let output = Command::new("gpg")
      .args(["--batch", "--yes"])
      .args(args)
      .output()
      .context("Failed to execute gpg")?;

    if !output.status.success() {
      return Err(RelError::Remote(RemoteError::Signing {
        path: file.to_path_buf(),
        reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }
    Ok(())
  }
}

impl Signer for GpgSigner {
  fn detach_sign(&self, file: &Path) -> RelResult<PathBuf> {
    let signature = Self::signature_path(file);
    let signature_str = signature.to_string_lossy();
    let file_str = file.to_string_lossy();

    let mut args = vec!["--armor", "--detach-sign", "--output", signature_str.as_ref()];
    if let Some(key) = &self.key {
      args.extend(["--local-user", key.as_str()]);
    }
    args.push(file_str.as_ref());

    self.run(file, &args)?;
    info!(signature = %signature.display(), "signed");
    Ok(signature)
  }

  fn verify(&self, file: &Path, signature: &Path) -> RelResult<()> {
    let signature_str = signature.to_string_lossy();
    let file_str = file.to_string_lossy();
    self.run(file, &["--verify", signature_str.as_ref(), file_str.as_ref()])
  }
}
