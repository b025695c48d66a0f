//! svn-cascade - multi-stage SVN branch merges
//!
//! Merges revisions from an upstream branch through a chain of downstream
//! branches, one step at a time. Each step merges, resolves, confirms and
//! commits every mapped sub-directory, then hands the new revisions and
//! commit messages to the next step.
//!
//! # Architecture
//!
//! - [`revision`] - revision specifiers and range coalescing
//! - [`svn`] - svn client facade (command-line and HTTP backends)
//! - [`config`] - profiles, profile storage and runtime settings
//! - [`pipeline`] - the merge pipeline orchestrator
//! - [`history`] - history browsing for revision picking

pub mod config;
pub mod error;
pub mod history;
pub mod paths;
pub mod pipeline;
pub mod revision;
pub mod svn;
pub mod types;

pub use error::{Error, Result};
