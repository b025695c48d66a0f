//! Steps command - show the active step sequence

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, arrow};
use anstream::println;
use svn_cascade::error::Result;
use svn_cascade::types::{Namespace, StepKind};

/// Run the steps command
pub fn run_steps(ctx: &CommandContext, include_hotfix: bool) -> Result<()> {
    let profile = ctx.profile()?;
    println!("{} {}", "Profile".emphasis(), profile.name.accent());

    for step in profile.active_steps(include_hotfix) {
        let kind = match step.kind {
            StepKind::Manual => "manual".warn(),
            StepKind::Auto => "auto".muted(),
        };
        let hotfix = if step.is_hotfix { " hotfix".warn() } else { String::new() };
        let configured = |ns, key: &str| {
            profile
                .environment(ns, key)
                .is_some_and(svn_cascade::types::Environment::is_configured)
        };
        let missing = if configured(Namespace::Remote, &step.source)
            && configured(Namespace::Local, &step.target)
        {
            String::new()
        } else {
            " (environment not configured)".error()
        };

        println!(
            "  {} {} {} [{kind}{hotfix}]{missing}",
            arrow(),
            step.id.accent(),
            step.name
        );
    }
    Ok(())
}
