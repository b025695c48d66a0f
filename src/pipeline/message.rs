//! Commit message composition
//!
//! The first step of a chain wraps the original log message of the merged
//! revision(s). Every later step wraps the message the previous step
//! committed for the same directory, adding one attribution layer per hop.

use crate::revision::RevisionSpec;
use crate::svn::SvnService;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Revisions beyond this many in one specifier are summarised, not fetched
pub const MAX_FETCHED_LOGS: usize = 20;

/// What a proposed message wraps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBasis {
    /// Fetch the original log message from the source root
    Original {
        /// Root of the source environment
        source_root: String,
    },
    /// Wrap the previous hop's message for this directory
    Chained(String),
}

/// Wrap `inner` in one merge-attribution layer
pub fn compose(revisions: &RevisionSpec, source_label: &str, inner: &str) -> String {
    format!("Merged revision(s) {revisions} from {source_label}:\n{inner}")
}

/// Stand-in used when a log message cannot be fetched
pub fn unavailable(revision: u64) -> String {
    format!("(unable to fetch log for revision {revision})")
}

/// Builds proposed messages for one step
///
/// Original log messages are cached by revision so directories merging the
/// same revision only fetch it once per step.
pub struct MessageComposer<'a> {
    svn: &'a dyn SvnService,
    source_label: String,
    cache: HashMap<u64, String>,
}

impl<'a> MessageComposer<'a> {
    /// Composer for a step whose source environment is labelled `source_label`
    pub fn new(svn: &'a dyn SvnService, source_label: impl Into<String>) -> Self {
        Self {
            svn,
            source_label: source_label.into(),
            cache: HashMap::new(),
        }
    }

    /// Number of cached log messages
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Proposed message for merging `revisions` on top of `basis`
    pub async fn propose(&mut self, revisions: &RevisionSpec, basis: &MessageBasis) -> String {
        let inner = match basis {
            MessageBasis::Chained(previous) => previous.clone(),
            MessageBasis::Original { source_root } => {
                self.original_message(source_root, revisions).await
            }
        };
        compose(revisions, &self.source_label, &inner)
    }

    async fn original_message(&mut self, source_root: &str, revisions: &RevisionSpec) -> String {
        let mut messages = Vec::new();
        for revision in revisions.lowest(MAX_FETCHED_LOGS) {
            messages.push(self.log_for(source_root, revision).await);
        }
        let remaining = revisions.count().saturating_sub(MAX_FETCHED_LOGS as u64);
        if remaining > 0 {
            messages.push(format!("(+{remaining} more revisions)"));
        }
        messages.join("\n")
    }

    async fn log_for(&mut self, source_root: &str, revision: u64) -> String {
        if let Some(cached) = self.cache.get(&revision) {
            debug!(revision, "log message cache hit");
            return cached.clone();
        }
        let message = match self.svn.last_message(source_root, Some(revision)).await {
            Ok(message) => message.trim_end().to_string(),
            Err(e) => {
                warn!(revision, error = %e, "could not fetch original log message");
                unavailable(revision)
            }
        };
        self.cache.insert(revision, message.clone());
        message
    }
}
