//! Release gating and orchestration
//!
//! # Invariants
//!
//! 1. **No version skipping**
//!    - `X.Y.Z` can only be tagged once its immediate predecessor is
//!
//! 2. **Source of truth agrees with the request**
//!    - changelog has an entry, version file declares exactly the version
//!
//! 3. **Releases are green**
//!    - every CI run on the revision finished and passed, except the
//!      release workflow itself
//!
//! # Architecture
//!
//! - **version**: release/tag version parsing and ordering
//! - **changelog**: per-project changelog section extraction
//! - **version_file**: declared version from a project's version-of-record
//! - **gate**: ordered admit/deny decision for a candidate
//! - **orchestrator**: tag, tarball, sign, publish

pub mod changelog;
pub mod gate;
pub mod orchestrator;
pub mod version;
pub mod version_file;

pub use changelog::ChangelogResolver;
pub use gate::{GateVerdict, ReleaseCandidate, ReleaseGate};
pub use orchestrator::{ReleaseOptions, ReleaseOrchestrator, ReleaseOutcome};
