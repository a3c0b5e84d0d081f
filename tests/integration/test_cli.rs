//! Exit codes and configuration handling of the relman binary

use crate::helpers::{TestWorkspace, run_relman};
use anyhow::Result;

const CONFIG: &str = r#"
[projects.Demo]
repository = "acme/demo"
tag_prefix = "v"
changelog = { format = "bulleted" }
"#;

#[test]
fn test_malformed_version_is_rejected_by_gate() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let superproject = ws.superproject(CONFIG)?;

  let output = run_relman(&superproject, &["check", "Demo", "1.0", "--revision", "deadbeef"])?;
  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("1.0"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_unknown_project_is_user_error() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let superproject = ws.superproject(CONFIG)?;

  let output = run_relman(&superproject, &["changelog", "Nope", "1.0.0"])?;
  assert_eq!(output.status.code(), Some(1));

  Ok(())
}

#[test]
fn test_missing_registry_is_user_error() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_relman(&ws.path, &["check", "Demo", "1.0.0", "--revision", "deadbeef"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("relman.toml"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_explicit_config_must_exist() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let superproject = ws.superproject(CONFIG)?;

  let output = run_relman(
    &superproject,
    &["--config", "missing.toml", "check", "Demo", "1.0.0", "--revision", "deadbeef"],
  )?;
  assert_eq!(output.status.code(), Some(1));

  Ok(())
}

#[test]
fn test_invalid_registry_is_user_error() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let superproject = ws.superproject("[projects.Demo]\nrepository = \"not-a-slug\"\n")?;

  let output = run_relman(&superproject, &["changelog", "Demo", "1.0.0"])?;
  assert_eq!(output.status.code(), Some(1));

  Ok(())
}

#[test]
fn test_publish_rejects_blank_notes() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let superproject = ws.superproject(CONFIG)?;
  ws.write("superproject/notes.md", "  \n\n")?;

  let output = run_relman(
    &superproject,
    &["publish", "Demo", "v1.0.0", "--notes-file", "notes.md"],
  )?;
  assert_eq!(output.status.code(), Some(1));

  Ok(())
}
