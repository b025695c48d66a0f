//! SVN client facade
//!
//! Provides a single interface over the two ways of reaching svn: spawning
//! the command-line client directly, or calling the JSON merge backend.

mod cli;
mod factory;
mod http;
pub mod parse;

pub use cli::SvnCli;
pub use factory::create_svn_service;
pub use http::HttpSvnService;

use crate::error::Result;
use crate::revision::RevisionSpec;
use crate::types::{LogEntry, MergeOutput, ResolveChoice};
use async_trait::async_trait;

/// SVN operations consumed by the merge pipeline
///
/// Paths are passed as strings because sources may be repository URLs.
/// Every mutating call targets a local working copy.
#[async_trait]
pub trait SvnService: Send + Sync {
    /// Merge `revisions` from `source` into the working copy at `target`
    ///
    /// A merge that leaves conflicts is a success with a non-empty
    /// [`MergeOutput::conflicts`].
    async fn merge(&self, source: &str, target: &str, revisions: &RevisionSpec)
    -> Result<MergeOutput>;

    /// Update a working copy to head
    async fn update(&self, path: &str) -> Result<String>;

    /// Recursively revert local modifications
    async fn revert(&self, path: &str) -> Result<String>;

    /// Commit a working copy, returning the tool output
    async fn commit(&self, path: &str, message: &str) -> Result<String>;

    /// Resolve one conflicted file inside the working copy at `path`
    async fn resolve(&self, path: &str, file: &str, choice: ResolveChoice) -> Result<()>;

    /// Preview of outstanding changes in a working copy
    async fn status(&self, path: &str) -> Result<String>;

    /// Most recent history entries, newest first
    async fn log_entries(&self, target: &str, limit: u32) -> Result<Vec<LogEntry>>;

    /// Revisions of `source` already merged into `target`
    async fn merged_revisions(&self, source: &str, target: &str) -> Result<Vec<u64>>;

    /// Log message of `revision` (or of the latest revision)
    async fn last_message(&self, target: &str, revision: Option<u64>) -> Result<String>;
}

/// SVN operations with distinct exit-code handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `svn merge`
    Merge,
    /// `svn update`
    Update,
    /// `svn revert`
    Revert,
    /// `svn commit`
    Commit,
    /// `svn resolve`
    Resolve,
    /// `svn status`
    Status,
    /// `svn log`
    Log,
    /// `svn mergeinfo`
    MergeInfo,
    /// `svn info`
    Info,
}

impl Operation {
    /// Name used in errors and logs
    pub const fn name(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Update => "update",
            Self::Revert => "revert",
            Self::Commit => "commit",
            Self::Resolve => "resolve",
            Self::Status => "status",
            Self::Log => "log",
            Self::MergeInfo => "mergeinfo",
            Self::Info => "info",
        }
    }
}

/// How a process exit code maps to an outcome for one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Only 0 is success
    Strict,
    /// 0 and 1 pass the exit check; svn exits 1 when a merge leaves
    /// conflicts and for some non-fatal status notices
    ///
    /// svn also exits 1 for every real error, so callers narrow it further:
    /// a `merge` exiting 1 without a parsed conflict line fails, and a
    /// `status` exiting 1 with text on stderr fails.
    AllowNonFatal,
    /// Any exit code is treated as success with whatever was printed
    ///
    /// `svn mergeinfo` errors when the paths share no merge history; that
    /// is read as "nothing merged yet". This is the one ambiguous call
    /// site: a genuine transport error is indistinguishable and is only
    /// logged.
    Lenient,
}

impl ExitPolicy {
    /// The exit-code table
    pub const fn for_operation(operation: Operation) -> Self {
        match operation {
            Operation::Merge | Operation::Status => Self::AllowNonFatal,
            Operation::MergeInfo => Self::Lenient,
            Operation::Update
            | Operation::Revert
            | Operation::Commit
            | Operation::Resolve
            | Operation::Log
            | Operation::Info => Self::Strict,
        }
    }

    /// Whether `code` counts as success (`None` means killed by a signal)
    pub const fn accepts(self, code: Option<i32>) -> bool {
        match (self, code) {
            (Self::Lenient, _) | (_, Some(0)) | (Self::AllowNonFatal, Some(1)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_policy_table() {
        let cases = [
            (Operation::Merge, ExitPolicy::AllowNonFatal),
            (Operation::Status, ExitPolicy::AllowNonFatal),
            (Operation::MergeInfo, ExitPolicy::Lenient),
            (Operation::Update, ExitPolicy::Strict),
            (Operation::Revert, ExitPolicy::Strict),
            (Operation::Commit, ExitPolicy::Strict),
            (Operation::Resolve, ExitPolicy::Strict),
            (Operation::Log, ExitPolicy::Strict),
            (Operation::Info, ExitPolicy::Strict),
        ];
        for (operation, policy) in cases {
            assert_eq!(ExitPolicy::for_operation(operation), policy, "{}", operation.name());
        }
    }

    #[test]
    fn test_exit_policy_accepts() {
        assert!(ExitPolicy::Strict.accepts(Some(0)));
        assert!(!ExitPolicy::Strict.accepts(Some(1)));
        assert!(!ExitPolicy::Strict.accepts(None));

        assert!(ExitPolicy::AllowNonFatal.accepts(Some(0)));
        assert!(ExitPolicy::AllowNonFatal.accepts(Some(1)));
        assert!(!ExitPolicy::AllowNonFatal.accepts(Some(2)));
        assert!(!ExitPolicy::AllowNonFatal.accepts(None));

        assert!(ExitPolicy::Lenient.accepts(Some(1)));
        assert!(ExitPolicy::Lenient.accepts(Some(255)));
        assert!(ExitPolicy::Lenient.accepts(None));
    }
}
