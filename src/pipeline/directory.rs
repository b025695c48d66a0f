//! Per-Directory Merge Executor
//!
//! Drives one directory through merge, conflict resolution, status preview,
//! commit confirmation and commit. All side effects go through the
//! [`SvnService`] and the [`InteractionGateway`].

use crate::error::Result;
use crate::pipeline::events::{PipelineEvent, Reporter};
use crate::pipeline::gateway::{ConfirmationRequest, ConflictSession, InteractionGateway};
use crate::pipeline::message::{MessageBasis, MessageComposer};
use crate::revision::RevisionSpec;
use crate::svn::{SvnService, parse};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One directory's work within a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTask {
    /// Directory index in the profile
    pub index: usize,
    /// Full source path or URL
    pub source: String,
    /// Full working copy path
    pub target: String,
    /// Label shown to the operator (the target sub-path)
    pub label: String,
    /// Revisions to merge
    pub revisions: RevisionSpec,
    /// What the commit message wraps
    pub basis: MessageBasis,
}

/// How one directory ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryOutcome {
    /// Merged and committed
    Committed {
        /// Revision created by the commit
        revision: u64,
        /// Message committed
        message: String,
    },
    /// The operator declined a confirmation or aborted conflict resolution
    Aborted,
    /// A svn call failed
    Failed {
        /// Underlying error
        reason: String,
    },
}

impl DirectoryOutcome {
    /// Whether the directory reached a commit
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Runs [`DirectoryTask`]s
pub struct DirectoryExecutor<'a> {
    svn: &'a Arc<dyn SvnService>,
    gateway: &'a InteractionGateway,
    reporter: &'a Reporter,
}

impl<'a> DirectoryExecutor<'a> {
    /// Create an executor
    pub const fn new(
        svn: &'a Arc<dyn SvnService>,
        gateway: &'a InteractionGateway,
        reporter: &'a Reporter,
    ) -> Self {
        Self {
            svn,
            gateway,
            reporter,
        }
    }

    /// Run one directory to an outcome
    ///
    /// Errors never escape: a failing svn call becomes
    /// [`DirectoryOutcome::Failed`].
    pub async fn run(
        &self,
        task: &DirectoryTask,
        composer: &mut MessageComposer<'_>,
    ) -> DirectoryOutcome {
        match self.try_run(task, composer).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(directory = task.index, target = %task.target, error = %e, "directory failed");
                self.reporter
                    .error(format!("[{}] failed: {e}", task.label))
                    .await;
                DirectoryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_run(
        &self,
        task: &DirectoryTask,
        composer: &mut MessageComposer<'_>,
    ) -> Result<DirectoryOutcome> {
        let label = &task.label;
        self.reporter
            .info(format!("[{label}] merging revision(s) {}", task.revisions))
            .await;

        let merge = self
            .svn
            .merge(&task.source, &task.target, &task.revisions)
            .await?;

        if merge.has_conflicts() {
            self.reporter
                .warn(format!(
                    "[{label}] conflicts: {}",
                    merge.conflicts.join(", ")
                ))
                .await;
            if !self.resolve_conflicts(task, merge.conflicts).await? {
                self.reporter
                    .warn(format!("[{label}] conflict resolution aborted"))
                    .await;
                return Ok(DirectoryOutcome::Aborted);
            }
            self.reporter
                .success(format!("[{label}] conflicts resolved"))
                .await;
        }
        self.reporter.success(format!("[{label}] merge done")).await;

        let status_preview = self.svn.status(&task.target).await?;
        let message = composer.propose(&task.revisions, &task.basis).await;

        let request = ConfirmationRequest {
            message: message.clone(),
            status_preview,
            target_label: label.clone(),
        };
        self.reporter
            .emit(PipelineEvent::ConfirmationRequested {
                target_label: request.target_label.clone(),
                message: request.message.clone(),
                status_preview: request.status_preview.clone(),
            })
            .await;
        if !self.gateway.request_confirmation(request).await? {
            self.reporter
                .warn(format!("[{label}] commit declined, stopping"))
                .await;
            return Ok(DirectoryOutcome::Aborted);
        }

        self.reporter.info(format!("[{label}] committing")).await;
        let output = self.svn.commit(&task.target, &message).await?;
        let revision = parse::committed_revision(&output)?;

        info!(directory = task.index, revision, "committed");
        self.reporter
            .success(format!("[{label}] committed revision {revision}"))
            .await;
        Ok(DirectoryOutcome::Committed { revision, message })
    }

    async fn resolve_conflicts(&self, task: &DirectoryTask, files: Vec<String>) -> Result<bool> {
        debug!(target = %task.target, count = files.len(), "opening conflict session");
        self.reporter
            .emit(PipelineEvent::ConflictSessionOpened {
                target_path: task.target.clone(),
                files: files.clone(),
            })
            .await;

        let session = ConflictSession {
            files,
            target_path: task.target.clone(),
        };
        let resolved = self
            .gateway
            .request_conflict_resolution(session, Arc::clone(self.svn), self.reporter.clone())
            .await?;

        self.reporter
            .emit(PipelineEvent::ConflictSessionClosed {
                target_path: task.target.clone(),
                resolved,
            })
            .await;
        Ok(resolved)
    }
}
