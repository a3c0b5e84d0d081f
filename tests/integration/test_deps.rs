//! Integration tests for `relman deps`

use crate::helpers::{TestWorkspace, git, run_relman, run_relman_ok};
use anyhow::Result;
use std::path::Path;

const DECLARATION_CONFIG: &str = r#"
[projects.Demo]
repository = "acme/demo"

[projects.Demo.dependencies.libfoo]
declaration_file = "cmake/dependencies.cmake"
main_branch = "main"
"#;

const SUBMODULE_CONFIG: &str = r#"
[projects.Demo]
repository = "acme/demo"

[projects.Demo.dependencies.libfoo]
submodule_path = "3rdparty/libfoo"
main_branch = "main"
"#;

fn declaration(url: &Path, commit: &str, label: &str) -> String {
  format!(
    "include(FetchContent)\n\nFetchContent_Declare(\n  libfoo\n  GIT_REPOSITORY {}\n  GIT_TAG {} # {}\n)\nFetchContent_MakeAvailable(libfoo)\n",
    url.display(),
    commit,
    label
  )
}

#[test]
fn test_status_json_for_fetch_declaration() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let (upstream, commits) = ws.upstream("libfoo", &["v1.0.0", "v1.1.0"])?;
  let superproject = ws.superproject(DECLARATION_CONFIG)?;
  ws.write(
    "superproject/cmake/dependencies.cmake",
    &declaration(&upstream, &commits[0], "v1.0.0"),
  )?;

  let output = run_relman_ok(&superproject, &["deps", "status", "Demo", "--json"])?;
  let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(report["project"], "Demo");
  assert!(report["resolved_at"].is_string());
  let deps = report["dependencies"].as_array().expect("dependencies array");
  assert_eq!(deps.len(), 1);
  assert_eq!(deps[0]["dependency_key"], "libfoo");
  assert_eq!(deps[0]["kind"], "fetch_declaration");
  assert_eq!(deps[0]["current_version"], "v1.0.0");
  assert_eq!(deps[0]["current_commit"], commits[0].as_str());
  assert_eq!(deps[0]["latest_version"], "v1.1.0");
  assert_eq!(deps[0]["latest_commit"], commits[1].as_str());
  assert_eq!(deps[0]["status"], "outdated");

  Ok(())
}

#[test]
fn test_status_annotations_for_submodule() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let (upstream, _) = ws.upstream("libfoo", &["v1.0.0", "v1.1.0"])?;
  let superproject = ws.superproject(SUBMODULE_CONFIG)?;

  let url = upstream.to_string_lossy().to_string();
  git(
    &superproject,
    &["-c", "protocol.file.allow=always", "submodule", "add", &url, "3rdparty/libfoo"],
  )?;
  git(&superproject.join("3rdparty/libfoo"), &["checkout", "--quiet", "v1.0.0"])?;

  let output = run_relman_ok(&superproject, &["deps", "status", "Demo"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  let lines: Vec<&str> = stdout.lines().collect();

  assert_eq!(
    lines,
    vec![
      "::group::Versions",
      "::warning::libfoo v1.0.0 can be bumped to v1.1.0",
      "::endgroup::",
    ]
  );

  Ok(())
}

#[test]
fn test_status_reports_up_to_date_pin() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let (upstream, commits) = ws.upstream("libfoo", &["v1.0.0", "v1.1.0"])?;
  let superproject = ws.superproject(DECLARATION_CONFIG)?;
  ws.write(
    "superproject/cmake/dependencies.cmake",
    &declaration(&upstream, &commits[1], "v1.1.0"),
  )?;

  let output = run_relman_ok(&superproject, &["deps", "status", "Demo"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("::notice::libfoo is up to date (v1.1.0)"), "stdout: {}", stdout);

  Ok(())
}

#[test]
fn test_unreachable_dependency_is_reported_not_fatal() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let superproject = ws.superproject(DECLARATION_CONFIG)?;
  let missing = ws.path.join("does-not-exist");
  ws.write(
    "superproject/cmake/dependencies.cmake",
    &declaration(&missing, "0123456789abcdef0123456789abcdef01234567", "v1.0.0"),
  )?;

  let output = run_relman_ok(&superproject, &["deps", "status", "Demo"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("::error::Can't determine version of libfoo"), "stdout: {}", stdout);

  Ok(())
}

#[test]
fn test_status_unknown_dependency_is_user_error() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let superproject = ws.superproject(DECLARATION_CONFIG)?;

  let output = run_relman(&superproject, &["deps", "status", "Demo", "--dependency", "nope"])?;
  assert_eq!(output.status.code(), Some(1));

  Ok(())
}

#[test]
fn test_update_dry_run_leaves_checkout_untouched() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let (upstream, commits) = ws.upstream("libfoo", &["v1.0.0", "v1.1.0"])?;
  let superproject = ws.superproject(DECLARATION_CONFIG)?;

  let origin = ws.path.join("origin.git");
  std::fs::create_dir_all(&origin)?;
  git(&origin, &["init", "--bare", "--initial-branch=main"])?;
  git(&superproject, &["remote", "add", "origin", &origin.to_string_lossy()])?;

  let contents = declaration(&upstream, &commits[0], "v1.0.0");
  ws.write("superproject/cmake/dependencies.cmake", &contents)?;

  let output = run_relman_ok(
    &superproject,
    &["deps", "update", "Demo", "--dependency", "libfoo", "--dry-run"],
  )?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(
    stdout.contains("would bump libfoo from v1.0.0 to v1.1.0 on deps/libfoo-v1.1.0"),
    "stdout: {}",
    stdout
  );

  let after = std::fs::read_to_string(superproject.join("cmake/dependencies.cmake"))?;
  assert_eq!(after, contents);
  let branches = git(&superproject, &["branch", "--list", "deps/*"])?;
  assert!(branches.stdout.is_empty());

  Ok(())
}
