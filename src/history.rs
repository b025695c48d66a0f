//! History browsing for revision picking
//!
//! Read-only: runs outside the pipeline's mutual exclusion and may overlap
//! a running step.

use crate::config::Profile;
use crate::error::{Error, Result};
use crate::paths::{display, source_path, working_copy_path};
use crate::svn::SvnService;
use crate::types::{LogEntry, Namespace, Step};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// A log entry annotated with whether the target already has it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// The log entry
    pub entry: LogEntry,
    /// Already merged into the target
    pub merged: bool,
}

/// Paths browsed for one directory of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPaths {
    /// Source path or URL whose log is listed
    pub source: String,
    /// Working copy checked for merge-info, when its root is configured
    pub target: Option<String>,
    /// Source label
    pub source_label: String,
}

/// Resolve the source and target paths for directory `index` of `step`
pub fn history_paths(profile: &Profile, step: &Step, index: usize) -> Result<HistoryPaths> {
    let mapping = profile.directories.get(index).ok_or_else(|| {
        Error::InvalidRevision(format!(
            "directory index {index} out of range (profile has {} directories)",
            profile.directories.len()
        ))
    })?;
    let source_env = profile
        .environment(Namespace::Remote, &step.source)
        .filter(|env| env.is_configured())
        .ok_or_else(|| Error::Environment {
            step: step.id.clone(),
            namespace: Namespace::Remote.to_string(),
            key: step.source.clone(),
        })?;

    let target = profile
        .environment(Namespace::Local, &step.target)
        .filter(|env| env.is_configured())
        .map(|env| display(&working_copy_path(&env.root, &mapping.target)));

    Ok(HistoryPaths {
        source: source_path(&source_env.root, profile.source_sub_path(step, mapping)),
        target,
        source_label: source_env.label(&step.source).to_string(),
    })
}

/// Fetch the latest `limit` log entries of `source`, marking merged ones
///
/// Log and merge-info are fetched concurrently. A merge-info failure
/// degrades to "nothing merged"; a log failure is returned.
pub async fn fetch_history(
    svn: &dyn SvnService,
    source: &str,
    target: Option<&str>,
    limit: u32,
) -> Result<Vec<HistoryEntry>> {
    let merged_fut = async {
        match target {
            Some(target) => svn.merged_revisions(source, target).await,
            None => Ok(Vec::new()),
        }
    };
    let (log, merged) = tokio::join!(svn.log_entries(source, limit), merged_fut);

    let entries = log?;
    let merged: BTreeSet<u64> = match merged {
        Ok(revisions) => revisions.into_iter().collect(),
        Err(e) => {
            warn!(source, error = %e, "merge-info unavailable, treating as nothing merged");
            BTreeSet::new()
        }
    };
    debug!(source, entries = entries.len(), merged = merged.len(), "history fetched");

    Ok(entries
        .into_iter()
        .map(|entry| HistoryEntry {
            merged: merged.contains(&entry.revision),
            entry,
        })
        .collect())
}
