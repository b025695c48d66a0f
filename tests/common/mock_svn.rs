//! Mock svn service for testing
//!
//! These are test utilities - not all may be used in current tests but are
//! available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use svn_cascade::error::{Error, Result};
use svn_cascade::revision::RevisionSpec;
use svn_cascade::svn::SvnService;
use svn_cascade::types::{LogEntry, MergeOutput, ResolveChoice};

/// Call record for `merge`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCall {
    pub source: String,
    pub target: String,
    pub revisions: String,
}

/// Call record for `commit`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitCall {
    pub path: String,
    pub message: String,
}

/// Call record for `resolve`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveCall {
    pub path: String,
    pub file: String,
    pub choice: ResolveChoice,
}

fn svn_error(operation: &'static str, message: &str) -> Error {
    Error::Svn {
        operation,
        message: message.to_string(),
        output: String::new(),
    }
}

/// Simple mock svn service for testing
///
/// Features:
/// - Auto-incrementing committed revisions
/// - Call tracking for verification
/// - Configurable conflicts per target and log messages per revision
/// - Error injection for failure path testing
pub struct MockSvnService {
    next_revision: AtomicU64,
    total_calls: AtomicUsize,
    operations: Mutex<Vec<String>>,
    conflicts: Mutex<HashMap<String, Vec<String>>>,
    log_messages: Mutex<HashMap<u64, String>>,
    log_entries: Mutex<HashMap<String, Vec<LogEntry>>>,
    merged: Mutex<HashMap<String, Vec<u64>>>,
    status_output: Mutex<String>,
    // Call tracking
    merge_calls: Mutex<Vec<MergeCall>>,
    commit_calls: Mutex<Vec<CommitCall>>,
    resolve_calls: Mutex<Vec<ResolveCall>>,
    update_calls: Mutex<Vec<String>>,
    revert_calls: Mutex<Vec<String>>,
    status_calls: Mutex<Vec<String>>,
    last_message_calls: Mutex<Vec<(String, Option<u64>)>>,
    // Error injection
    error_on_update: Mutex<Option<String>>,
    error_on_revert: Mutex<Option<String>>,
    error_on_merge: Mutex<Option<String>>,
    error_on_merge_into: Mutex<HashMap<String, String>>,
    error_on_commit: Mutex<Option<String>>,
    error_on_resolve: Mutex<Option<String>>,
    error_on_status: Mutex<Option<String>>,
    error_on_mergeinfo: Mutex<Option<String>>,
}

impl Default for MockSvnService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSvnService {
    /// Create a mock whose first commit produces revision 1000
    pub fn new() -> Self {
        Self::starting_at(1000)
    }

    /// Create a mock whose first commit produces `revision`
    pub fn starting_at(revision: u64) -> Self {
        Self {
            next_revision: AtomicU64::new(revision),
            total_calls: AtomicUsize::new(0),
            operations: Mutex::new(Vec::new()),
            conflicts: Mutex::new(HashMap::new()),
            log_messages: Mutex::new(HashMap::new()),
            log_entries: Mutex::new(HashMap::new()),
            merged: Mutex::new(HashMap::new()),
            status_output: Mutex::new("M       file.txt".to_string()),
            merge_calls: Mutex::new(Vec::new()),
            commit_calls: Mutex::new(Vec::new()),
            resolve_calls: Mutex::new(Vec::new()),
            update_calls: Mutex::new(Vec::new()),
            revert_calls: Mutex::new(Vec::new()),
            status_calls: Mutex::new(Vec::new()),
            last_message_calls: Mutex::new(Vec::new()),
            error_on_update: Mutex::new(None),
            error_on_revert: Mutex::new(None),
            error_on_merge: Mutex::new(None),
            error_on_merge_into: Mutex::new(HashMap::new()),
            error_on_commit: Mutex::new(None),
            error_on_resolve: Mutex::new(None),
            error_on_status: Mutex::new(None),
            error_on_mergeinfo: Mutex::new(None),
        }
    }

    // === Error injection methods ===

    /// Make `update` return an error
    pub fn fail_update(&self, msg: &str) {
        *self.error_on_update.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `revert` return an error
    pub fn fail_revert(&self, msg: &str) {
        *self.error_on_revert.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `merge` return an error
    pub fn fail_merge(&self, msg: &str) {
        *self.error_on_merge.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `merge` into `target` return an error
    pub fn fail_merge_into(&self, target: &str, msg: &str) {
        self.error_on_merge_into
            .lock()
            .unwrap()
            .insert(target.to_string(), msg.to_string());
    }

    /// Make `commit` return an error
    pub fn fail_commit(&self, msg: &str) {
        *self.error_on_commit.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `resolve` return an error
    pub fn fail_resolve(&self, msg: &str) {
        *self.error_on_resolve.lock().unwrap() = Some(msg.to_string());
    }

    /// Clear a previously injected `resolve` error
    pub fn allow_resolve(&self) {
        *self.error_on_resolve.lock().unwrap() = None;
    }

    /// Make `status` return an error
    pub fn fail_status(&self, msg: &str) {
        *self.error_on_status.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `merged_revisions` return an error
    pub fn fail_mergeinfo(&self, msg: &str) {
        *self.error_on_mergeinfo.lock().unwrap() = Some(msg.to_string());
    }

    // === Response configuration ===

    /// Report `files` as conflicted when merging into `target`
    pub fn set_conflicts(&self, target: &str, files: &[&str]) {
        self.conflicts.lock().unwrap().insert(
            target.to_string(),
            files.iter().map(|f| (*f).to_string()).collect(),
        );
    }

    /// Log message returned for `revision`; unknown revisions fail
    pub fn set_log_message(&self, revision: u64, message: &str) {
        self.log_messages
            .lock()
            .unwrap()
            .insert(revision, message.to_string());
    }

    /// History returned for `source`
    pub fn set_log_entries(&self, source: &str, entries: Vec<LogEntry>) {
        self.log_entries
            .lock()
            .unwrap()
            .insert(source.to_string(), entries);
    }

    /// Revisions reported as merged into `target`
    pub fn set_merged(&self, target: &str, revisions: &[u64]) {
        self.merged
            .lock()
            .unwrap()
            .insert(target.to_string(), revisions.to_vec());
    }

    /// Output returned by `status`
    pub fn set_status_output(&self, output: &str) {
        *self.status_output.lock().unwrap() = output.to_string();
    }

    // === Call inspection ===

    /// Total svn calls of any kind
    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    pub fn merge_calls(&self) -> Vec<MergeCall> {
        self.merge_calls.lock().unwrap().clone()
    }

    pub fn commit_calls(&self) -> Vec<CommitCall> {
        self.commit_calls.lock().unwrap().clone()
    }

    pub fn resolve_calls(&self) -> Vec<ResolveCall> {
        self.resolve_calls.lock().unwrap().clone()
    }

    pub fn update_calls(&self) -> Vec<String> {
        self.update_calls.lock().unwrap().clone()
    }

    pub fn revert_calls(&self) -> Vec<String> {
        self.revert_calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> Vec<String> {
        self.status_calls.lock().unwrap().clone()
    }

    pub fn last_message_calls(&self) -> Vec<(String, Option<u64>)> {
        self.last_message_calls.lock().unwrap().clone()
    }

    /// Every call as `operation path`, in call order
    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().unwrap().clone()
    }

    fn count(&self, operation: &str, path: &str) {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        self.operations
            .lock()
            .unwrap()
            .push(format!("{operation} {path}"));
    }

    fn injected(slot: &Mutex<Option<String>>, operation: &'static str) -> Result<()> {
        match slot.lock().unwrap().as_deref() {
            Some(msg) => Err(svn_error(operation, msg)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SvnService for MockSvnService {
    async fn merge(
        &self,
        source: &str,
        target: &str,
        revisions: &RevisionSpec,
    ) -> Result<MergeOutput> {
        self.count("merge", target);
        self.merge_calls.lock().unwrap().push(MergeCall {
            source: source.to_string(),
            target: target.to_string(),
            revisions: revisions.to_string(),
        });
        Self::injected(&self.error_on_merge, "merge")?;
        if let Some(msg) = self.error_on_merge_into.lock().unwrap().get(target) {
            return Err(svn_error("merge", msg));
        }

        let conflicts = self
            .conflicts
            .lock()
            .unwrap()
            .get(target)
            .cloned()
            .unwrap_or_default();
        let output = conflicts
            .iter()
            .map(|f| format!("C    {f}"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(MergeOutput { output, conflicts })
    }

    async fn update(&self, path: &str) -> Result<String> {
        self.count("update", path);
        self.update_calls.lock().unwrap().push(path.to_string());
        Self::injected(&self.error_on_update, "update")?;
        Ok("At revision 1.".to_string())
    }

    async fn revert(&self, path: &str) -> Result<String> {
        self.count("revert", path);
        self.revert_calls.lock().unwrap().push(path.to_string());
        Self::injected(&self.error_on_revert, "revert")?;
        Ok(String::new())
    }

    async fn commit(&self, path: &str, message: &str) -> Result<String> {
        self.count("commit", path);
        self.commit_calls.lock().unwrap().push(CommitCall {
            path: path.to_string(),
            message: message.to_string(),
        });
        Self::injected(&self.error_on_commit, "commit")?;
        let revision = self.next_revision.fetch_add(1, Ordering::SeqCst);
        Ok(format!("Sending        file.txt\nCommitted revision {revision}."))
    }

    async fn resolve(&self, path: &str, file: &str, choice: ResolveChoice) -> Result<()> {
        self.count("resolve", file);
        self.resolve_calls.lock().unwrap().push(ResolveCall {
            path: path.to_string(),
            file: file.to_string(),
            choice,
        });
        Self::injected(&self.error_on_resolve, "resolve")
    }

    async fn status(&self, path: &str) -> Result<String> {
        self.count("status", path);
        self.status_calls.lock().unwrap().push(path.to_string());
        Self::injected(&self.error_on_status, "status")?;
        Ok(self.status_output.lock().unwrap().clone())
    }

    async fn log_entries(&self, target: &str, limit: u32) -> Result<Vec<LogEntry>> {
        self.count("log", target);
        let entries = self
            .log_entries
            .lock()
            .unwrap()
            .get(target)
            .cloned()
            .ok_or_else(|| svn_error("log", &format!("no history for {target}")))?;
        Ok(entries.into_iter().take(limit as usize).collect())
    }

    async fn merged_revisions(&self, _source: &str, target: &str) -> Result<Vec<u64>> {
        self.count("mergeinfo", target);
        Self::injected(&self.error_on_mergeinfo, "mergeinfo")?;
        Ok(self
            .merged
            .lock()
            .unwrap()
            .get(target)
            .cloned()
            .unwrap_or_default())
    }

    async fn last_message(&self, target: &str, revision: Option<u64>) -> Result<String> {
        self.count("last-message", target);
        self.last_message_calls
            .lock()
            .unwrap()
            .push((target.to_string(), revision));
        revision
            .and_then(|rev| self.log_messages.lock().unwrap().get(&rev).cloned())
            .ok_or_else(|| svn_error("log", "no such revision"))
    }
}
