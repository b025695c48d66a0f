//! Presentation-facing pipeline events

use crate::revision::RevisionSpec;
use crate::types::StepStatus;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Severity of an operator log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Progress
    Info,
    /// Something finished successfully
    Success,
    /// Degraded but continuing
    Warning,
    /// A step or directory failed
    Error,
}

/// Event emitted by the pipeline for the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A step changed status
    StepStatusChanged {
        /// Step id
        step_id: String,
        /// New status
        status: StepStatus,
    },
    /// Operator log line
    Log {
        /// Severity
        level: LogLevel,
        /// Text
        message: String,
    },
    /// A commit is waiting for confirmation
    ConfirmationRequested {
        /// Directory being committed
        target_label: String,
        /// Proposed commit message
        message: String,
        /// Status preview of the working copy
        status_preview: String,
    },
    /// A merge left conflicts and a session was opened
    ConflictSessionOpened {
        /// Working copy holding the conflicts
        target_path: String,
        /// Conflicted files
        files: Vec<String>,
    },
    /// A file in the open session was resolved
    ConflictSessionUpdated {
        /// Working copy holding the conflicts
        target_path: String,
        /// Files still conflicted
        remaining: Vec<String>,
    },
    /// The session ended
    ConflictSessionClosed {
        /// Working copy holding the conflicts
        target_path: String,
        /// `true` if every file was resolved, `false` on abort
        resolved: bool,
    },
    /// Picked history entries were coalesced into a specifier
    RevisionRangeSelected {
        /// Directory index
        directory: usize,
        /// Coalesced specifier
        spec: RevisionSpec,
    },
}

/// Receiver of pipeline events
#[async_trait]
pub trait PipelineObserver: Send + Sync {
    /// Called for every event, in emission order
    async fn on_event(&self, event: PipelineEvent);
}

/// Observer that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl PipelineObserver for NoopObserver {
    async fn on_event(&self, _event: PipelineEvent) {}
}

/// Observer that forwards events into a channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl PipelineObserver for ChannelObserver {
    async fn on_event(&self, event: PipelineEvent) {
        // A closed receiver just means nobody is watching any more
        let _ = self.sender.send(event);
    }
}

/// Convenience wrapper for emitting events and log lines
#[derive(Clone)]
pub struct Reporter {
    observer: Arc<dyn PipelineObserver>,
}

impl Reporter {
    /// Wrap an observer
    pub fn new(observer: Arc<dyn PipelineObserver>) -> Self {
        Self { observer }
    }

    /// The wrapped observer
    pub fn observer(&self) -> Arc<dyn PipelineObserver> {
        Arc::clone(&self.observer)
    }

    /// Emit an event
    pub async fn emit(&self, event: PipelineEvent) {
        self.observer.on_event(event).await;
    }

    /// Emit a log line
    pub async fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(PipelineEvent::Log {
            level,
            message: message.into(),
        })
        .await;
    }

    /// Emit an info log line
    pub async fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message).await;
    }

    /// Emit a success log line
    pub async fn success(&self, message: impl Into<String>) {
        self.log(LogLevel::Success, message).await;
    }

    /// Emit a warning log line
    pub async fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message).await;
    }

    /// Emit an error log line
    pub async fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message).await;
    }

    /// Emit a status change
    pub async fn status(&self, step_id: &str, status: StepStatus) {
        self.emit(PipelineEvent::StepStatusChanged {
            step_id: step_id.to_string(),
            status,
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_observer_preserves_order() {
        let (observer, mut rx) = ChannelObserver::new();
        let reporter = Reporter::new(Arc::new(observer));

        reporter.info("first").await;
        reporter.status("1", StepStatus::Running).await;

        assert_eq!(
            rx.recv().await,
            Some(PipelineEvent::Log {
                level: LogLevel::Info,
                message: "first".to_string()
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(PipelineEvent::StepStatusChanged {
                step_id: "1".to_string(),
                status: StepStatus::Running
            })
        );
    }

    #[tokio::test]
    async fn test_channel_observer_survives_closed_receiver() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.on_event(PipelineEvent::Log {
            level: LogLevel::Warning,
            message: "nobody listening".to_string(),
        })
        .await;
    }
}
