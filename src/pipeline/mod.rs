//! Merge Pipeline Orchestrator
//!
//! Layered bottom-up:
//! - [`gateway`] - the two human decision points (confirm, resolve conflicts)
//! - [`message`] - commit message composition with a per-step log cache
//! - [`directory`] - one directory: merge, resolve, preview, confirm, commit
//! - [`step`] - one step over its directories, stopping at the first failure
//! - [`scheduler`] - statuses, chaining and auto-advance across steps
//!
//! Progress is reported through a [`PipelineObserver`].

pub mod directory;
pub mod events;
pub mod gateway;
pub mod message;
pub mod scheduler;
pub mod step;

pub use directory::{DirectoryExecutor, DirectoryOutcome, DirectoryTask};
pub use events::{ChannelObserver, LogLevel, NoopObserver, PipelineEvent, PipelineObserver, Reporter};
pub use gateway::{
    ConfirmationHandle, ConfirmationRequest, ConflictHandle, ConflictSession, Interaction,
    InteractionGateway, InteractionQueue,
};
pub use message::{MessageBasis, MessageComposer, compose};
pub use scheduler::{RunReport, RunState, Scheduler, next_auto_step};
pub use step::{
    CommittedDirectory, StepExecutor, StepFailure, StepInput, StepPlan, StepReport, plan_step,
};
