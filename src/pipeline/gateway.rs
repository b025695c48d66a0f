//! Interaction Gateway
//!
//! The two points where a running step blocks on a human decision: commit
//! confirmation and conflict resolution. The pipeline side awaits
//! [`InteractionGateway::request_confirmation`] or
//! [`InteractionGateway::request_conflict_resolution`]; the UI side pulls
//! [`Interaction`]s off the [`InteractionQueue`] and answers them through
//! the handle. Each primitive is a single-outstanding-request slot.
//!
//! There is no timeout. Dropping a handle without answering declines it.

use crate::error::{Error, Result};
use crate::pipeline::events::{PipelineEvent, Reporter};
use crate::svn::SvnService;
use crate::types::ResolveChoice;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// A commit waiting for the operator's go-ahead
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    /// Proposed commit message
    pub message: String,
    /// Outstanding changes in the working copy
    pub status_preview: String,
    /// Directory being committed
    pub target_label: String,
}

/// Conflicted files left by a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictSession {
    /// Conflicted paths, in the order the merge reported them
    pub files: Vec<String>,
    /// Working copy the merge went into
    pub target_path: String,
}

/// A pending interaction delivered to the UI
pub enum Interaction {
    /// Accept or reject a commit
    Confirm(ConfirmationHandle),
    /// Resolve every conflicted file or abort
    Conflicts(ConflictHandle),
}

/// UI-side answer channel for a confirmation
pub struct ConfirmationHandle {
    request: ConfirmationRequest,
    responder: oneshot::Sender<bool>,
}

impl ConfirmationHandle {
    /// What is being confirmed
    pub const fn request(&self) -> &ConfirmationRequest {
        &self.request
    }

    /// Let the commit proceed
    pub fn accept(self) {
        let _ = self.responder.send(true);
    }

    /// Reject the commit; the rest of the step is aborted
    pub fn reject(self) {
        let _ = self.responder.send(false);
    }
}

/// UI-side handle for an open conflict session
pub struct ConflictHandle {
    session: ConflictSession,
    svn: Arc<dyn SvnService>,
    reporter: Reporter,
    responder: Option<oneshot::Sender<bool>>,
}

impl ConflictHandle {
    /// Files still conflicted
    pub fn files(&self) -> &[String] {
        &self.session.files
    }

    /// Working copy holding the conflicts
    pub fn target_path(&self) -> &str {
        &self.session.target_path
    }

    /// Whether every file has received a choice
    pub fn is_resolved(&self) -> bool {
        self.session.files.is_empty()
    }

    /// Apply `choice` to `file` and drop it from the session
    ///
    /// A failed resolve leaves the file in the session so it can be retried
    /// with another choice.
    pub async fn resolve(&mut self, file: &str, choice: ResolveChoice) -> Result<()> {
        let position = self
            .session
            .files
            .iter()
            .position(|f| f == file)
            .ok_or_else(|| Error::Internal(format!("'{file}' is not in the conflict session")))?;

        self.svn
            .resolve(&self.session.target_path, file, choice)
            .await?;
        self.session.files.remove(position);
        debug!(file, %choice, remaining = self.session.files.len(), "conflict resolved");

        self.reporter
            .emit(PipelineEvent::ConflictSessionUpdated {
                target_path: self.session.target_path.clone(),
                remaining: self.session.files.clone(),
            })
            .await;
        Ok(())
    }

    /// Close the session and let the step continue
    ///
    /// Fails while any file is still conflicted.
    pub fn finish(&mut self) -> Result<()> {
        if !self.is_resolved() {
            return Err(Error::ConflictsRemain(self.session.files.len()));
        }
        if let Some(responder) = self.responder.take() {
            let _ = responder.send(true);
        }
        Ok(())
    }

    /// Give up on the session; the step fails
    pub fn abort(mut self) {
        if let Some(responder) = self.responder.take() {
            let _ = responder.send(false);
        }
    }
}

/// Receiving end of the gateway, owned by the UI
pub struct InteractionQueue {
    receiver: mpsc::UnboundedReceiver<Interaction>,
}

impl InteractionQueue {
    /// Wait for the next interaction; `None` once the gateway is gone
    pub async fn next(&mut self) -> Option<Interaction> {
        self.receiver.recv().await
    }
}

/// Releases a slot when the waiting request ends
struct SlotGuard(Arc<AtomicBool>);

impl SlotGuard {
    fn acquire(slot: &Arc<AtomicBool>, name: &'static str) -> Result<Self> {
        slot.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::GatewayBusy(name))?;
        Ok(Self(Arc::clone(slot)))
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Pipeline side of the gateway
#[derive(Clone)]
pub struct InteractionGateway {
    sender: mpsc::UnboundedSender<Interaction>,
    confirmation_slot: Arc<AtomicBool>,
    conflict_slot: Arc<AtomicBool>,
}

impl InteractionGateway {
    /// Create a gateway and the queue the UI reads from
    pub fn new() -> (Self, InteractionQueue) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let gateway = Self {
            sender,
            confirmation_slot: Arc::new(AtomicBool::new(false)),
            conflict_slot: Arc::new(AtomicBool::new(false)),
        };
        (gateway, InteractionQueue { receiver })
    }

    /// Ask the operator to confirm a commit
    ///
    /// Resolves to `false` when rejected, or when the UI has gone away.
    pub async fn request_confirmation(&self, request: ConfirmationRequest) -> Result<bool> {
        let _slot = SlotGuard::acquire(&self.confirmation_slot, "confirmation")?;
        let (responder, answer) = oneshot::channel();

        let target = request.target_label.clone();
        if self
            .sender
            .send(Interaction::Confirm(ConfirmationHandle { request, responder }))
            .is_err()
        {
            warn!(target = %target, "no interaction handler, declining confirmation");
            return Ok(false);
        }

        Ok(answer.await.unwrap_or(false))
    }

    /// Ask the operator to resolve every file in `session`
    ///
    /// Resolves to `true` once the session is finished with no files left,
    /// `false` on abort.
    pub async fn request_conflict_resolution(
        &self,
        session: ConflictSession,
        svn: Arc<dyn SvnService>,
        reporter: Reporter,
    ) -> Result<bool> {
        let _slot = SlotGuard::acquire(&self.conflict_slot, "conflict resolution")?;
        let (responder, answer) = oneshot::channel();

        let target = session.target_path.clone();
        let handle = ConflictHandle {
            session,
            svn,
            reporter,
            responder: Some(responder),
        };
        if self.sender.send(Interaction::Conflicts(handle)).is_err() {
            warn!(target = %target, "no interaction handler, aborting conflict session");
            return Ok(false);
        }

        Ok(answer.await.unwrap_or(false))
    }
}
