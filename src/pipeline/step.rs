//! Step Executor
//!
//! Two phases, following the plan/execute split used elsewhere:
//! 1. Plan - resolve environments and pair each directory with its
//!    revisions ([`plan_step`], pure)
//! 2. Execute - revert, update, then run directories one at a time,
//!    stopping at the first one that does not commit ([`StepExecutor`])

use crate::config::Profile;
use crate::error::{Error, Result};
use crate::paths::{display, source_path, working_copy_path};
use crate::pipeline::directory::{DirectoryExecutor, DirectoryOutcome, DirectoryTask};
use crate::pipeline::events::Reporter;
use crate::pipeline::gateway::InteractionGateway;
use crate::pipeline::message::{MessageBasis, MessageComposer};
use crate::revision::RevisionSpec;
use crate::svn::SvnService;
use crate::types::{Environment, Namespace, Step, StepStatus};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-directory input for one step run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepInput {
    /// Revisions to merge, by directory index; absent directories are skipped
    pub revisions: BTreeMap<usize, RevisionSpec>,
    /// Previous hop's commit messages, by directory index
    pub messages: BTreeMap<usize, String>,
}

/// Resolved work for one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    /// Source environment root
    pub source_root: String,
    /// Target working copy root
    pub target_root: String,
    /// Source label used in commit messages
    pub source_label: String,
    /// Directories to run, in index order
    pub tasks: Vec<DirectoryTask>,
    /// Directories without revisions
    pub skipped: Vec<usize>,
}

fn configured_env<'a>(
    profile: &'a Profile,
    step: &Step,
    namespace: Namespace,
    key: &str,
) -> Result<&'a Environment> {
    profile
        .environment(namespace, key)
        .filter(|env| env.is_configured())
        .ok_or_else(|| Error::Environment {
            step: step.id.clone(),
            namespace: namespace.to_string(),
            key: key.to_string(),
        })
}

/// Resolve environments and build the directory tasks (PURE)
///
/// Fails on a missing environment root, an out-of-range directory index, or
/// when no directory has revisions. No svn call is made.
pub fn plan_step(profile: &Profile, step: &Step, input: &StepInput) -> Result<StepPlan> {
    let source_env = configured_env(profile, step, Namespace::Remote, &step.source)?;
    let target_env = configured_env(profile, step, Namespace::Local, &step.target)?;

    let count = profile.directories.len();
    if let Some(index) = input.revisions.keys().find(|i| **i >= count) {
        return Err(Error::InvalidRevision(format!(
            "directory index {index} out of range (profile has {count} directories)"
        )));
    }

    let source_root = source_path(&source_env.root, "");
    let target_root = display(&working_copy_path(&target_env.root, ""));

    let mut tasks = Vec::new();
    let mut skipped = Vec::new();
    for (index, mapping) in profile.directories.iter().enumerate() {
        let Some(revisions) = input.revisions.get(&index) else {
            skipped.push(index);
            continue;
        };
        let basis = input.messages.get(&index).map_or_else(
            || MessageBasis::Original {
                source_root: source_root.clone(),
            },
            |previous| MessageBasis::Chained(previous.clone()),
        );
        tasks.push(DirectoryTask {
            index,
            source: source_path(&source_env.root, profile.source_sub_path(step, mapping)),
            target: display(&working_copy_path(&target_env.root, &mapping.target)),
            label: mapping.target.clone(),
            revisions: revisions.clone(),
            basis,
        });
    }

    if tasks.is_empty() {
        return Err(Error::InvalidRevision(format!(
            "no revisions to merge for step '{}'",
            step.id
        )));
    }

    Ok(StepPlan {
        source_root,
        target_root,
        source_label: source_env.label(&step.source).to_string(),
        tasks,
        skipped,
    })
}

/// A directory committed by a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedDirectory {
    /// New revision
    pub revision: u64,
    /// Message committed
    pub message: String,
}

/// Why a step did not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    /// Nothing was merged: misconfiguration, bad input, or update failure
    Setup {
        /// Underlying error
        reason: String,
    },
    /// A directory aborted or failed; earlier directories stay committed
    Directory {
        /// Directory index
        index: usize,
        /// How it ended
        outcome: DirectoryOutcome,
    },
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Setup { reason } => write!(f, "{reason}"),
            Self::Directory {
                index,
                outcome: DirectoryOutcome::Failed { reason },
            } => write!(f, "directory {index} failed: {reason}"),
            Self::Directory { index, .. } => write!(f, "directory {index} aborted by operator"),
        }
    }
}

/// Result of one step run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Step id
    pub step_id: String,
    /// Committed directories, by index
    pub committed: BTreeMap<usize, CommittedDirectory>,
    /// Directories skipped for lack of revisions
    pub skipped: Vec<usize>,
    /// Set when the step did not complete
    pub failure: Option<StepFailure>,
}

impl StepReport {
    fn new(step_id: &str) -> Self {
        Self {
            step_id: step_id.to_string(),
            committed: BTreeMap::new(),
            skipped: Vec::new(),
            failure: None,
        }
    }

    /// Completed only if every attempted directory committed
    pub const fn status(&self) -> StepStatus {
        if self.failure.is_none() {
            StepStatus::Completed
        } else {
            StepStatus::Failed
        }
    }

    /// Whether the step completed
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Runs one step over its directories (EFFECTFUL)
pub struct StepExecutor<'a> {
    svn: &'a Arc<dyn SvnService>,
    gateway: &'a InteractionGateway,
    reporter: &'a Reporter,
}

impl<'a> StepExecutor<'a> {
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

    /// Run `step` to completion or to its first failing directory
    pub async fn run(&self, profile: &Profile, step: &Step, input: &StepInput) -> StepReport {
        let mut report = StepReport::new(&step.id);

        let plan = match plan_step(profile, step, input) {
            Ok(plan) => plan,
            Err(e) => return self.setup_failed(report, step, &e).await,
        };
        report.skipped.clone_from(&plan.skipped);
        debug!(
            step = %step.id,
            directories = plan.tasks.len(),
            skipped = plan.skipped.len(),
            "step planned"
        );

        if let Err(e) = self.prepare(&plan.target_root).await {
            return self.setup_failed(report, step, &e).await;
        }

        let mut composer = MessageComposer::new(&**self.svn, plan.source_label.clone());
        let directory = DirectoryExecutor::new(self.svn, self.gateway, self.reporter);

        for task in &plan.tasks {
            match directory.run(task, &mut composer).await {
                DirectoryOutcome::Committed { revision, message } => {
                    report
                        .committed
                        .insert(task.index, CommittedDirectory { revision, message });
                }
                outcome => {
                    // Earlier commits in this step are kept
                    report.failure = Some(StepFailure::Directory {
                        index: task.index,
                        outcome,
                    });
                    break;
                }
            }
        }

        report
    }

    /// Revert then update the target root; only the update is fatal
    async fn prepare(&self, target_root: &str) -> Result<()> {
        self.reporter
            .info(format!("reverting local changes in {target_root}"))
            .await;
        if let Err(e) = self.svn.revert(target_root).await {
            warn!(target = target_root, error = %e, "revert failed, continuing");
            self.reporter.warn(format!("revert failed: {e}")).await;
        }

        self.reporter
            .info(format!("updating {target_root}"))
            .await;
        self.svn.update(target_root).await?;
        Ok(())
    }

    async fn setup_failed(&self, mut report: StepReport, step: &Step, error: &Error) -> StepReport {
        warn!(step = %step.id, error = %error, "step could not start");
        self.reporter
            .error(format!("step '{}' failed: {error}", step.name))
            .await;
        report.failure = Some(StepFailure::Setup {
            reason: error.to_string(),
        });
        report
    }
}
