//! Core building blocks shared by every command
//!
//! - **config**: project registry (relman.toml) parsing and validation
//! - **context**: registry plus collaborators, built once in main
//! - **error**: error types, exit codes and contextual help
//! - **vcs**: source-control abstraction (SystemGit)

pub mod config;
pub mod context;
pub mod error;
#[cfg(test)]
pub mod fakes;
pub mod vcs;
