//! Command-line interface

pub mod context;
pub mod history;
pub mod profile;
pub mod run;
pub mod steps;
pub mod style;

use anstream::println;
use async_trait::async_trait;
use style::{Stylize, arrow, check, cross};
use svn_cascade::pipeline::{LogLevel, PipelineEvent, PipelineObserver};
use svn_cascade::types::StepStatus;

/// Prints pipeline events to the terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct CliObserver;

#[async_trait]
impl PipelineObserver for CliObserver {
    async fn on_event(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::Log { level, message } => match level {
                LogLevel::Info => println!("  {} {}", arrow(), message.muted()),
                LogLevel::Success => println!("  {} {message}", check()),
                LogLevel::Warning => println!("  {} {}", "!".warn(), message.warn()),
                LogLevel::Error => println!("  {} {}", cross(), message.error()),
            },
            PipelineEvent::StepStatusChanged { step_id, status } => match status {
                StepStatus::Running => println!("{} {}", "Step".emphasis(), step_id.accent()),
                StepStatus::Completed => {
                    println!("{} step {} completed", check(), step_id.accent());
                }
                StepStatus::Failed => println!("{} step {} failed", cross(), step_id.accent()),
                StepStatus::Pending => {}
            },
            PipelineEvent::ConflictSessionOpened { target_path, files } => {
                println!(
                    "{} {} conflicted file(s) in {}",
                    "!".warn(),
                    files.len().accent(),
                    target_path.accent()
                );
            }
            PipelineEvent::ConflictSessionUpdated { remaining, .. } => {
                println!("  {}", format!("{} file(s) left", remaining.len()).muted());
            }
            PipelineEvent::ConflictSessionClosed { resolved, .. } => {
                if !resolved {
                    println!("  {}", "conflict resolution aborted".warn());
                }
            }
            PipelineEvent::RevisionRangeSelected { directory, spec } => {
                println!("  directory {directory}: {}", spec.accent());
            }
            // Shown by the confirmation prompt itself
            PipelineEvent::ConfirmationRequested { .. } => {}
        }
    }
}
