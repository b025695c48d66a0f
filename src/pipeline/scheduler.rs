//! Pipeline Scheduler
//!
//! Owns step statuses, operator revisions and the chained revisions and
//! messages carried between steps. At most one step runs at a time. After a
//! step completes, the active step sequence is scanned again and the next
//! eligible auto step is started in the same run.

use crate::config::Profile;
use crate::error::{Error, Result};
use crate::pipeline::events::{PipelineEvent, PipelineObserver, Reporter};
use crate::pipeline::gateway::InteractionGateway;
use crate::pipeline::step::{StepExecutor, StepInput, StepReport};
use crate::revision::{RevisionSpec, coalesce_ids};
use crate::svn::SvnService;
use crate::types::{Step, StepKind, StepStatus};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Transient state of the standing pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// Status by step id; absent means pending
    pub step_statuses: BTreeMap<String, StepStatus>,
    /// Operator-entered specifiers by directory index, for manual steps
    pub requested_revisions: BTreeMap<usize, String>,
    /// Revisions committed by the last completed step, by directory index
    pub chained_revisions: BTreeMap<usize, u64>,
    /// Messages committed by the last completed step, by directory index
    pub chained_messages: BTreeMap<usize, String>,
}

impl RunState {
    /// Status of one step
    pub fn status(&self, step_id: &str) -> StepStatus {
        self.step_statuses
            .get(step_id)
            .copied()
            .unwrap_or_default()
    }

    /// The step currently running, if any
    pub fn running_step(&self) -> Option<&str> {
        self.step_statuses
            .iter()
            .find(|(_, status)| **status == StepStatus::Running)
            .map(|(id, _)| id.as_str())
    }
}

/// Outcome of one trigger: the requested step plus any auto-advanced steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Steps run, in order
    pub steps: Vec<StepReport>,
}

impl RunReport {
    /// Whether every step run completed
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(StepReport::is_success)
    }

    /// Report for one step
    pub fn step(&self, step_id: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    /// Ids of the steps run, in order
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step_id.as_str()).collect()
    }
}

/// Next auto step eligible to start (PURE)
///
/// Nothing is eligible while any step is running. A step is eligible when
/// it is pending, auto, and the step before it in `active` is completed.
/// The first active step never is.
pub fn next_auto_step<'a>(
    active: &[&'a Step],
    statuses: &BTreeMap<String, StepStatus>,
) -> Option<&'a Step> {
    let status = |step: &Step| statuses.get(&step.id).copied().unwrap_or_default();

    if statuses.values().any(|s| *s == StepStatus::Running) {
        return None;
    }

    active
        .windows(2)
        .find(|pair| {
            pair[1].kind == StepKind::Auto
                && status(pair[1]) == StepStatus::Pending
                && status(pair[0]) == StepStatus::Completed
        })
        .map(|pair| pair[1])
}

struct Shared {
    run: RunState,
    include_hotfix: bool,
    generation: u64,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Input for `step` from the current state
///
/// Manual steps read operator specifiers; auto steps read the chain.
fn step_input(run: &RunState, step: &Step) -> Result<StepInput> {
    match step.kind {
        StepKind::Manual => requested_input(run),
        StepKind::Auto => Ok(chained_input(run)),
    }
}

/// Input for a step the operator triggered directly
///
/// An auto step with nothing chained (a retry in a fresh run) falls back
/// to the operator's specifiers.
fn triggered_input(run: &RunState, step: &Step) -> Result<StepInput> {
    let input = step_input(run, step)?;
    if step.kind == StepKind::Auto && input.revisions.is_empty() {
        debug!(step = %step.id, "nothing chained, using requested revisions");
        return requested_input(run);
    }
    Ok(input)
}

fn requested_input(run: &RunState) -> Result<StepInput> {
    let mut revisions = BTreeMap::new();
    for (index, text) in &run.requested_revisions {
        if let Some(spec) = RevisionSpec::parse_optional(text)? {
            revisions.insert(*index, spec);
        }
    }
    Ok(StepInput {
        revisions,
        messages: BTreeMap::new(),
    })
}

fn chained_input(run: &RunState) -> StepInput {
    StepInput {
        revisions: run
            .chained_revisions
            .iter()
            .map(|(index, rev)| (*index, RevisionSpec::single(*rev)))
            .collect(),
        messages: run.chained_messages.clone(),
    }
}

/// Sequences steps over a standing [`RunState`]
pub struct Scheduler {
    svn: Arc<dyn SvnService>,
    gateway: InteractionGateway,
    reporter: Reporter,
    shared: Arc<Mutex<Shared>>,
    rest_delay: Duration,
}

impl Scheduler {
    /// Create a scheduler with all steps pending
    pub fn new(
        svn: Arc<dyn SvnService>,
        gateway: InteractionGateway,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            svn,
            gateway,
            reporter: Reporter::new(observer),
            shared: Arc::new(Mutex::new(Shared {
                run: RunState::default(),
                include_hotfix: false,
                generation: 0,
            })),
            rest_delay: crate::config::DEFAULT_REST_DELAY,
        }
    }

    /// How long completed steps show as completed before returning to
    /// pending; zero returns them synchronously at the end of the run
    #[must_use]
    pub const fn with_rest_delay(mut self, delay: Duration) -> Self {
        self.rest_delay = delay;
        self
    }

    /// Whether hotfix steps are part of the active sequence
    pub fn include_hotfix(&self) -> bool {
        lock(&self.shared).include_hotfix
    }

    /// Include or exclude hotfix steps from the next scan
    pub fn set_include_hotfix(&self, include: bool) {
        lock(&self.shared).include_hotfix = include;
    }

    /// Active step sequence of `profile` under the current hotfix setting
    pub fn active_steps<'p>(&self, profile: &'p Profile) -> Vec<&'p Step> {
        profile.active_steps(self.include_hotfix())
    }

    /// Set the operator specifier for one directory; blank clears it
    pub fn set_requested_revision(&self, directory: usize, text: impl Into<String>) {
        let text = text.into();
        let mut shared = lock(&self.shared);
        if text.trim().is_empty() {
            shared.run.requested_revisions.remove(&directory);
        } else {
            shared.run.requested_revisions.insert(directory, text);
        }
    }

    /// Coalesce picked history ids into the specifier for one directory
    pub async fn select_revisions<S: AsRef<str> + Sync>(
        &self,
        directory: usize,
        ids: &[S],
    ) -> Result<RevisionSpec> {
        let spec = RevisionSpec::from(coalesce_ids(ids)?);
        self.set_requested_revision(directory, spec.to_string());
        self.reporter
            .emit(PipelineEvent::RevisionRangeSelected {
                directory,
                spec: spec.clone(),
            })
            .await;
        Ok(spec)
    }

    /// Forget operator specifiers and the chain
    pub fn clear_revisions(&self) {
        let mut shared = lock(&self.shared);
        shared.run.requested_revisions.clear();
        shared.run.chained_revisions.clear();
        shared.run.chained_messages.clear();
    }

    /// Current status of every step that has one
    pub fn statuses(&self) -> BTreeMap<String, StepStatus> {
        lock(&self.shared).run.step_statuses.clone()
    }

    /// Status of one step
    pub fn status(&self, step_id: &str) -> StepStatus {
        lock(&self.shared).run.status(step_id)
    }

    /// Snapshot of the run state; may be stale as soon as it returns
    pub fn run_state(&self) -> RunState {
        lock(&self.shared).run.clone()
    }

    /// Run `step_id`, then every auto step that becomes eligible
    ///
    /// Rejected without touching svn when another step is running, when the
    /// step is not in the active sequence, or when its revisions are
    /// missing or malformed.
    pub async fn trigger(&self, profile: &Profile, step_id: &str) -> Result<RunReport> {
        let step = profile
            .step(step_id)
            .ok_or_else(|| Error::StepNotFound(step_id.to_string()))?;

        let (input, generation, rested) = {
            let mut shared = lock(&self.shared);
            if step.is_hotfix && !shared.include_hotfix {
                return Err(Error::StepNotFound(format!(
                    "{step_id} (hotfix steps are excluded)"
                )));
            }
            if let Some(running) = shared.run.running_step() {
                return Err(Error::PipelineBusy(running.to_string()));
            }
            let input = triggered_input(&shared.run, step)?;
            if input.revisions.is_empty() {
                return Err(Error::InvalidRevision(
                    "no revisions entered for any directory".to_string(),
                ));
            }

            // A fresh run starts from rest
            let mut rested = Vec::new();
            for (id, status) in &mut shared.run.step_statuses {
                if *status == StepStatus::Completed {
                    *status = StepStatus::Pending;
                    rested.push(id.clone());
                }
            }
            shared.generation += 1;
            shared
                .run
                .step_statuses
                .insert(step.id.clone(), StepStatus::Running);
            (input, shared.generation, rested)
        };

        for id in &rested {
            self.reporter.status(id, StepStatus::Pending).await;
        }
        self.reporter.status(&step.id, StepStatus::Running).await;
        info!(step = %step.id, "step started");
        self.reporter
            .info(format!(">>> starting {}", step.name))
            .await;

        let executor = StepExecutor::new(&self.svn, &self.gateway, &self.reporter);
        let mut report = RunReport::default();
        let mut current = step.clone();
        let mut input = input;

        loop {
            let step_report = executor.run(profile, &current, &input).await;
            let status = step_report.status();
            let finished = self.record(profile, &current, &step_report);

            info!(step = %current.id, %status, "step finished");
            self.reporter.status(&current.id, status).await;
            match &step_report.failure {
                None => {
                    self.reporter
                        .success(format!("step complete: {}", current.name))
                        .await;
                }
                Some(failure) => {
                    self.reporter
                        .error(format!("step failed: {}: {failure}", current.name))
                        .await;
                }
            }
            if finished {
                self.reporter
                    .success("pipeline finished, revisions cleared")
                    .await;
            }
            report.steps.push(step_report);

            if status != StepStatus::Completed {
                break;
            }
            let Some((next, next_input)) = self.claim_next(profile) else {
                break;
            };

            self.reporter.status(&next.id, StepStatus::Running).await;
            info!(step = %next.id, "auto-advancing");
            self.reporter
                .info(format!(">>> auto-triggering {}", next.name))
                .await;
            current = next;
            input = next_input;
        }

        let completed = report
            .steps
            .iter()
            .filter(|s| s.is_success())
            .map(|s| s.step_id.clone())
            .collect();
        self.rest(completed, generation).await;

        Ok(report)
    }

    /// Store a finished step's status and, on success, its chain
    ///
    /// A failed step leaves the chain untouched. Returns whether the step was
    /// the last active step, in which case revisions and chain are cleared.
    fn record(&self, profile: &Profile, step: &Step, report: &StepReport) -> bool {
        let mut shared = lock(&self.shared);
        shared
            .run
            .step_statuses
            .insert(step.id.clone(), report.status());
        if !report.is_success() {
            return false;
        }

        shared.run.chained_revisions = report
            .committed
            .iter()
            .map(|(index, c)| (*index, c.revision))
            .collect();
        shared.run.chained_messages = report
            .committed
            .iter()
            .map(|(index, c)| (*index, c.message.clone()))
            .collect();

        let is_last = profile
            .active_steps(shared.include_hotfix)
            .last()
            .is_some_and(|last| last.id == step.id);
        if is_last {
            debug!(step = %step.id, "last active step completed, clearing revisions");
            shared.run.requested_revisions.clear();
            shared.run.chained_revisions.clear();
            shared.run.chained_messages.clear();
        }
        is_last
    }

    /// Scan for the next auto step and mark it running
    fn claim_next(&self, profile: &Profile) -> Option<(Step, StepInput)> {
        let mut shared = lock(&self.shared);
        let active = profile.active_steps(shared.include_hotfix);
        let next = next_auto_step(&active, &shared.run.step_statuses)?.clone();
        let input = step_input(&shared.run, &next).ok()?;
        shared
            .run
            .step_statuses
            .insert(next.id.clone(), StepStatus::Running);
        Some((next, input))
    }

    /// Return completed steps to pending after the rest delay
    async fn rest(&self, completed: Vec<String>, generation: u64) {
        if completed.is_empty() {
            return;
        }
        if self.rest_delay.is_zero() {
            for id in return_to_pending(&self.shared, &completed, generation) {
                self.reporter.status(&id, StepStatus::Pending).await;
            }
            return;
        }

        let shared = Arc::clone(&self.shared);
        let reporter = self.reporter.clone();
        let delay = self.rest_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            for id in return_to_pending(&shared, &completed, generation) {
                reporter.status(&id, StepStatus::Pending).await;
            }
        });
    }
}

/// Flip still-completed steps back to pending unless a newer run started
fn return_to_pending(shared: &Mutex<Shared>, ids: &[String], generation: u64) -> Vec<String> {
    let mut guard = lock(shared);
    if guard.generation != generation {
        return Vec::new();
    }
    let mut changed = Vec::new();
    for id in ids {
        if guard.run.status(id) == StepStatus::Completed {
            guard.run.step_statuses.insert(id.clone(), StepStatus::Pending);
            changed.push(id.clone());
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps() -> Vec<Step> {
        vec![
            Step::new("a", "A", "internal", "release", StepKind::Manual),
            Step::new("b", "B", "release", "stable", StepKind::Auto),
            Step::new("c", "C", "stable", "hotfix", StepKind::Auto).hotfix(),
            Step::new("d", "D", "stable", "stable2022", StepKind::Auto),
        ]
    }

    fn statuses(pairs: &[(&str, StepStatus)]) -> BTreeMap<String, StepStatus> {
        pairs
            .iter()
            .map(|(id, s)| ((*id).to_string(), *s))
            .collect()
    }

    fn active(all: &[Step], include_hotfix: bool) -> Vec<&Step> {
        all.iter().filter(|s| include_hotfix || !s.is_hotfix).collect()
    }

    #[test]
    fn test_first_step_never_auto_started() {
        let all = steps();
        assert!(next_auto_step(&active(&all, false), &BTreeMap::new()).is_none());
    }

    #[test]
    fn test_hotfix_excluded_skips_c() {
        let all = steps();
        let s = statuses(&[("a", StepStatus::Completed), ("b", StepStatus::Completed)]);
        assert_eq!(next_auto_step(&active(&all, false), &s).unwrap().id, "d");
    }

    #[test]
    fn test_hotfix_included_runs_c_first() {
        let all = steps();
        let s = statuses(&[("a", StepStatus::Completed), ("b", StepStatus::Completed)]);
        assert_eq!(next_auto_step(&active(&all, true), &s).unwrap().id, "c");
    }

    #[test]
    fn test_nothing_starts_while_running() {
        let all = steps();
        let s = statuses(&[("a", StepStatus::Completed), ("d", StepStatus::Running)]);
        assert!(next_auto_step(&active(&all, false), &s).is_none());
    }

    #[test]
    fn test_failed_predecessor_blocks() {
        let all = steps();
        let s = statuses(&[("a", StepStatus::Failed)]);
        assert!(next_auto_step(&active(&all, false), &s).is_none());
    }

    #[test]
    fn test_manual_input_rejects_malformed_spec() {
        let mut run = RunState::default();
        run.requested_revisions.insert(0, "12-x".to_string());
        let step = Step::new("a", "A", "internal", "release", StepKind::Manual);
        assert!(matches!(
            step_input(&run, &step),
            Err(Error::InvalidRevision(_))
        ));
    }

    #[test]
    fn test_auto_input_reads_chain() {
        let mut run = RunState::default();
        run.requested_revisions.insert(0, "5".to_string());
        run.chained_revisions.insert(2, 1420);
        run.chained_messages.insert(2, "msg".to_string());
        let step = Step::new("b", "B", "release", "stable", StepKind::Auto);

        let input = step_input(&run, &step).unwrap();
        assert_eq!(input.revisions.len(), 1);
        assert_eq!(input.revisions[&2], RevisionSpec::single(1420));
        assert_eq!(input.messages[&2], "msg");

        // A direct trigger still prefers the chain
        let triggered = triggered_input(&run, &step).unwrap();
        assert_eq!(triggered.revisions[&2], RevisionSpec::single(1420));
    }

    #[test]
    fn test_triggered_auto_step_without_chain_reads_requests() {
        let mut run = RunState::default();
        run.requested_revisions.insert(0, "1420".to_string());
        let step = Step::new("b", "B", "release", "stable", StepKind::Auto);

        assert!(step_input(&run, &step).unwrap().revisions.is_empty());
        let input = triggered_input(&run, &step).unwrap();
        assert_eq!(input.revisions[&0], RevisionSpec::single(1420));
        assert!(input.messages.is_empty());
    }
}
