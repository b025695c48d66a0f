//! Run command - trigger a step and answer its prompts

use crate::cli::CliObserver;
use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check, cross};
use anstream::println;
use dialoguer::{Confirm, Select};
use std::sync::Arc;
use svn_cascade::error::{Error, Result};
use svn_cascade::pipeline::{
    ConfirmationHandle, ConflictHandle, Interaction, InteractionGateway, InteractionQueue,
    RunReport, Scheduler, StepFailure,
};
use svn_cascade::revision::RevisionSpec;
use svn_cascade::types::ResolveChoice;
use tracing::debug;

/// Options for the run command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Step to trigger; defaults to the first active step
    pub step: Option<String>,
    /// `IDX=SPEC` revision assignments
    pub revisions: Vec<String>,
    /// Include hotfix steps
    pub hotfix: bool,
}

/// Parse `IDX=SPEC`
fn parse_assignment(text: &str) -> Result<(usize, RevisionSpec)> {
    let (index, spec) = text.split_once('=').ok_or_else(|| {
        Error::InvalidRevision(format!("'{text}' is not of the form IDX=SPEC"))
    })?;
    let index = index
        .trim()
        .parse()
        .map_err(|_| Error::InvalidRevision(format!("'{index}' is not a directory index")))?;
    Ok((index, spec.parse()?))
}

/// Run the run command
///
/// Returns whether every step that ran completed.
pub async fn run_step(ctx: &CommandContext, options: RunOptions) -> Result<bool> {
    let profile = ctx.profile()?.clone();
    let assignments = options
        .revisions
        .iter()
        .map(|a| parse_assignment(a))
        .collect::<Result<Vec<_>>>()?;

    let (gateway, queue) = InteractionGateway::new();
    let scheduler = Scheduler::new(ctx.svn()?, gateway, Arc::new(CliObserver))
        .with_rest_delay(ctx.settings.rest_delay);
    scheduler.set_include_hotfix(options.hotfix);
    for (index, spec) in &assignments {
        scheduler.set_requested_revision(*index, spec.to_string());
    }

    let step_id = match options.step {
        Some(id) => id,
        None => scheduler
            .active_steps(&profile)
            .first()
            .map(|s| s.id.clone())
            .ok_or_else(|| Error::StepNotFound("profile has no steps".to_string()))?,
    };

    println!(
        "{} {} {}",
        "Running".emphasis(),
        step_id.accent(),
        format!("({})", profile.name).muted()
    );

    let prompts = tokio::spawn(answer_interactions(queue));
    let result = scheduler.trigger(&profile, &step_id).await;
    prompts.abort();

    let report = result?;
    print_summary(&report);
    Ok(report.is_success())
}

/// Answer confirmations and conflict sessions from the terminal
async fn answer_interactions(mut queue: InteractionQueue) {
    while let Some(interaction) = queue.next().await {
        let outcome = match interaction {
            Interaction::Confirm(handle) => confirm_commit(handle).await,
            Interaction::Conflicts(handle) => resolve_conflicts(handle).await,
        };
        if let Err(e) = outcome {
            println!("{} {}", cross(), e.to_string().error());
        }
    }
}

async fn confirm_commit(handle: ConfirmationHandle) -> Result<()> {
    let request = handle.request().clone();
    println!();
    println!("{} {}", "Commit".emphasis(), request.target_label.accent());
    println!("{}", "Changes:".emphasis());
    if request.status_preview.trim().is_empty() {
        println!("  {}", "(no changes)".muted());
    } else {
        for line in request.status_preview.lines() {
            println!("  {line}");
        }
    }
    println!("{}", "Message:".emphasis());
    for line in request.message.lines() {
        println!("  {}", line.muted());
    }

    let accepted = prompt(move || {
        Confirm::new()
            .with_prompt("Commit these changes?")
            .default(true)
            .interact()
    })
    .await?;

    if accepted {
        handle.accept();
    } else {
        handle.reject();
    }
    Ok(())
}

async fn resolve_conflicts(mut handle: ConflictHandle) -> Result<()> {
    let mut items: Vec<String> = ResolveChoice::OFFERED
        .iter()
        .map(|c| format!("{:<16} {}", c.svn_accept(), c.description()))
        .collect();
    items.push("abort merge".to_string());

    while let Some(file) = handle.files().first().cloned() {
        println!("{} {}", "Conflict:".warn(), file.accent());
        let choices = items.clone();
        let prompt_file = file.clone();
        let picked = prompt(move || {
            Select::new()
                .with_prompt(format!("Resolve {prompt_file}"))
                .items(&choices)
                .default(0)
                .interact()
        })
        .await?;

        let Some(choice) = ResolveChoice::OFFERED.get(picked).copied() else {
            handle.abort();
            return Ok(());
        };
        if let Err(e) = handle.resolve(&file, choice).await {
            // The file stays in the session; ask again
            println!("{} {}", cross(), e.to_string().error());
        }
    }

    println!("{} all conflicts resolved", check());
    handle.finish()
}

/// Run a blocking dialoguer prompt off the async workers
async fn prompt<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> dialoguer::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("prompt task failed: {e}")))?
        .map_err(|e| Error::Internal(format!("failed to read input: {e}")))
}

fn print_summary(report: &RunReport) {
    println!();
    for step in &report.steps {
        debug!(step = %step.step_id, committed = step.committed.len(), "step summary");
        match &step.failure {
            None => println!(
                "{} step {}: {} director{} committed",
                check(),
                step.step_id.accent(),
                step.committed.len().accent(),
                if step.committed.len() == 1 { "y" } else { "ies" }
            ),
            Some(failure) => {
                println!("{} step {}: {}", cross(), step.step_id.accent(), failure.error());
                if let StepFailure::Directory { .. } = failure
                    && !step.committed.is_empty()
                {
                    println!(
                        "  {}",
                        "directories committed before the failure were kept".muted()
                    );
                }
            }
        }
        for (index, dir) in &step.committed {
            println!("  [{index}] r{}", dir.revision.accent());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        let (index, spec) = parse_assignment("2=101-103,107").unwrap();
        assert_eq!(index, 2);
        assert_eq!(spec.to_string(), "101-103,107");
        assert!(parse_assignment("2:100").is_err());
        assert!(parse_assignment("x=100").is_err());
    }
}
