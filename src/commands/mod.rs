//! CLI commands for relman
//!
//! ## Releases
//! - **check**: run the release gate for a candidate
//! - **changelog**: print one version's changelog section
//! - **release**: gate, tag, tarball, sign and publish
//! - **sign** / **publish**: after-the-fact signing and notes-file releases
//!
//! ## Dependencies
//! - **deps status**: current vs latest for every pinned dependency
//! - **deps update**: bump one dependency and open a PR
//!
//! ## Lookups
//! - **latest-release**, **vcpkg-version**
//!
//! All commands accept `&ReleaseContext` so collaborators are built once.

pub mod changelog;
pub mod check;
pub mod deps;
pub mod lookup;
pub mod release;

pub use changelog::run_changelog;
pub use check::run_check;
pub use deps::{run_deps_status, run_deps_update};
pub use lookup::{run_latest_release, run_vcpkg_version};
pub use release::{run_publish, run_release, run_sign};
