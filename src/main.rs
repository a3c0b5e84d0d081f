mod commands;
mod core;
mod deps;
mod release;
mod remote;
mod ui;

use crate::core::context::ReleaseContext;
use crate::core::error::{RelError, print_error};
use crate::release::ReleaseOptions;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Gate, tag, sign and publish releases; track pinned dependencies
#[derive(Parser)]
#[command(name = "relman")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Path to relman.toml (default: relman.toml, .relman.toml or .config/relman.toml here)
  #[arg(long, global = true, env = "RELMAN_CONFIG")]
  config: Option<PathBuf>,

  /// Debug logging on stderr
  #[arg(short, long, global = true, conflicts_with = "quiet")]
  verbose: bool,

  /// Only log errors
  #[arg(short, long, global = true)]
  quiet: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  // ============================================================================
  // Releases
  // ============================================================================
  /// Print the changelog section for a version
  Changelog {
    /// Project name from relman.toml
    project: String,
    /// Version to look up (e.g. 2.1.0)
    #[arg(value_name = "VERSION")]
    target_version: String,
    /// Revision whose changelog is read
    #[arg(long, default_value = "main")]
    revision: String,
  },

  /// Check whether a version can be released from a revision
  Check {
    /// Project name from relman.toml
    project: String,
    /// Version to release (X.Y.Z)
    #[arg(value_name = "VERSION")]
    target_version: String,
    /// Commit (or ref, together with --repo-path) to release from
    #[arg(long)]
    revision: String,
    /// Local clone used to resolve --revision to a commit
    #[arg(long)]
    repo_path: Option<PathBuf>,
  },

  /// Tag, build the tarball, sign it and publish the release
  Release {
    /// Project name from relman.toml
    project: String,
    /// Version to release (X.Y.Z)
    #[arg(value_name = "VERSION")]
    target_version: String,
    /// Ref to tag
    #[arg(long, default_value = "HEAD")]
    revision: String,
    /// Local clone of the project
    #[arg(long, default_value = ".")]
    repo_path: PathBuf,
    /// Where to write the tarball, checksum and signature
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
    /// Skip the detached signature
    #[arg(long)]
    no_sign: bool,
    /// Run the gate and print the plan without changing anything
    #[arg(long)]
    dry_run: bool,
  },

  /// Sign the source archive of a published release and upload the signature
  Sign {
    /// Project name from relman.toml
    project: String,
    /// Released version
    #[arg(value_name = "VERSION")]
    target_version: String,
    /// Where to write the archive and signature
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
  },

  /// Create a release for an existing tag from a notes file
  Publish {
    /// Project name from relman.toml
    project: String,
    /// Existing tag
    tag: String,
    /// Markdown file with the release notes
    #[arg(long)]
    notes_file: PathBuf,
  },

  // ============================================================================
  // Dependencies
  // ============================================================================
  /// Pinned dependency status and bumps
  #[command(subcommand)]
  Deps(DepsCommands),

  // ============================================================================
  // Lookups
  // ============================================================================
  /// Print the latest release tag of a GitHub repository
  LatestRelease {
    /// Repository as owner/name
    repo: String,
  },

  /// Print the version of a vcpkg port
  VcpkgVersion {
    /// Port name
    port: String,
    /// Registry repository
    #[arg(long, default_value = deps::vcpkg::DEFAULT_REPOSITORY)]
    repository: String,
    /// Registry branch
    #[arg(long, default_value = deps::vcpkg::DEFAULT_BRANCH)]
    branch: String,
  },
}

#[derive(Subcommand)]
enum DepsCommands {
  /// Compare pinned versions with the latest upstream releases
  Status {
    /// Project name from relman.toml
    project: String,
    /// Checkout of the project
    #[arg(long, default_value = ".")]
    repo_path: PathBuf,
    /// Only this dependency
    #[arg(long)]
    dependency: Option<String>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Bump one dependency on a branch and open a pull request
  Update {
    /// Project name from relman.toml
    project: String,
    /// Dependency key
    #[arg(long)]
    dependency: String,
    /// Checkout of the project
    #[arg(long, default_value = ".")]
    repo_path: PathBuf,
    /// Report what would change without touching the repository
    #[arg(long)]
    dry_run: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_tracing(quiet: bool, verbose: bool) {
  let level = if quiet {
    "error"
  } else if verbose {
    "debug"
  } else {
    "warn"
  };

  let filter = tracing_subscriber::EnvFilter::try_from_env("RELMAN_LOG")
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

  // stdout carries annotations and JSON
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .try_init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.quiet, cli.verbose);

  let root = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => {
      eprintln!("Error: Failed to get current directory: {}", e);
      std::process::exit(1);
    }
  };

  let ctx = match ReleaseContext::build(&root, cli.config.as_deref()) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    // Releases
    Commands::Changelog {
      project,
      target_version,
      revision,
    } => commands::run_changelog(&ctx, &project, &target_version, &revision),
    Commands::Check {
      project,
      target_version,
      revision,
      repo_path,
    } => commands::run_check(&ctx, &project, &target_version, &revision, repo_path.as_deref()),
    Commands::Release {
      project,
      target_version,
      revision,
      repo_path,
      output_dir,
      no_sign,
      dry_run,
    } => commands::run_release(
      &ctx,
      &project,
      &target_version,
      &revision,
      ReleaseOptions {
        repo_path,
        output_dir,
        sign: !no_sign,
        dry_run,
      },
    ),
    Commands::Sign {
      project,
      target_version,
      output_dir,
    } => commands::run_sign(&ctx, &project, &target_version, &output_dir),
    Commands::Publish {
      project,
      tag,
      notes_file,
    } => commands::run_publish(&ctx, &project, &tag, &notes_file),

    // Dependencies
    Commands::Deps(deps_cmd) => match deps_cmd {
      DepsCommands::Status {
        project,
        repo_path,
        dependency,
        json,
      } => commands::run_deps_status(&ctx, &project, &repo_path, dependency.as_deref(), json),
      DepsCommands::Update {
        project,
        dependency,
        repo_path,
        dry_run,
      } => commands::run_deps_update(&ctx, &project, &repo_path, &dependency, dry_run),
    },

    // Lookups
    Commands::LatestRelease { repo } => commands::run_latest_release(&ctx, &repo),
    Commands::VcpkgVersion {
      port,
      repository,
      branch,
    } => commands::run_vcpkg_version(&ctx, &port, &repository, &branch),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: RelError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
