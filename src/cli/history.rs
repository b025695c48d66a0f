//! History command - browse source history and pick revisions

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check, spinner_style};
use anstream::println;
use dialoguer::MultiSelect;
use indicatif::ProgressBar;
use std::time::Duration;
use svn_cascade::error::{Error, Result};
use svn_cascade::history::{HistoryEntry, fetch_history, history_paths};
use svn_cascade::revision::{RevisionSpec, coalesce};

/// Options for the history command
#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    /// Directory index
    pub directory: usize,
    /// Step whose source is browsed; defaults to the first step
    pub step: Option<String>,
    /// Entries to fetch; defaults to the configured limit
    pub limit: Option<u32>,
    /// Pick entries and print the coalesced specifier
    pub pick: bool,
}

/// Run the history command
pub async fn run_history(ctx: &CommandContext, options: HistoryOptions) -> Result<()> {
    let profile = ctx.profile()?;
    let step = match &options.step {
        Some(id) => profile
            .step(id)
            .ok_or_else(|| Error::StepNotFound(id.clone()))?,
        None => profile
            .steps
            .first()
            .ok_or_else(|| Error::StepNotFound("profile has no steps".to_string()))?,
    };
    let paths = history_paths(profile, step, options.directory)?;
    let limit = options.limit.unwrap_or(ctx.settings.log_limit);
    let svn = ctx.svn()?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.set_message(format!("Fetching history of {}...", paths.source.emphasis()));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let entries = match fetch_history(svn.as_ref(), &paths.source, paths.target.as_deref(), limit).await {
        Ok(entries) => entries,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };
    spinner.finish_with_message(format!(
        "{} {} entries from {}",
        check(),
        entries.len().accent(),
        paths.source_label.emphasis()
    ));

    if entries.is_empty() {
        println!("{}", "No history found.".muted());
        return Ok(());
    }

    if options.pick {
        pick(&entries).await
    } else {
        for entry in &entries {
            println!("{}", describe(entry));
        }
        Ok(())
    }
}

fn describe(item: &HistoryEntry) -> String {
    let entry = &item.entry;
    let date = entry
        .date
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let summary = entry.message.lines().next().unwrap_or_default();
    let marker = if item.merged {
        "merged".muted()
    } else {
        "      ".to_string()
    };
    format!(
        "{} {marker} {:<12} {} {summary}",
        format!("r{:<8}", entry.revision).accent(),
        entry.author,
        date.muted()
    )
}

async fn pick(entries: &[HistoryEntry]) -> Result<()> {
    let items: Vec<String> = entries.iter().map(describe).collect();
    let revisions: Vec<u64> = entries.iter().map(|e| e.entry.revision).collect();

    let picked = tokio::task::spawn_blocking(move || {
        MultiSelect::new()
            .with_prompt("Pick revisions to merge (space to toggle)")
            .items(&items)
            .interact()
    })
    .await
    .map_err(|e| Error::Internal(format!("prompt task failed: {e}")))?
    .map_err(|e| Error::Internal(format!("failed to read selection: {e}")))?;

    if picked.is_empty() {
        println!("{}", "Nothing picked.".muted());
        return Ok(());
    }

    let spec = RevisionSpec::from(coalesce(picked.into_iter().map(|i| revisions[i])));
    println!("{}", spec.accent());
    Ok(())
}
