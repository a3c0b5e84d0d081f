//! Pinned dependency tracking
//!
//! - **declaration**: parse and re-pin fetch declarations in build files
//! - **snapshot**: current vs latest version for every pinned dependency
//! - **updater**: bump one dependency on a branch and open a PR
//! - **vcpkg**: port versions in a vcpkg registry

pub mod declaration;
pub mod snapshot;
pub mod updater;
pub mod vcpkg;

pub use snapshot::{SnapshotResolver, SnapshotStatus, VersionSnapshot};
pub use updater::{DependencyUpdater, UpdateOutcome};
