//! Profile command - manage saved profiles

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, arrow, check};
use anstream::println;
use svn_cascade::config::{EnvironmentField, PRESET_IDS, Profile};
use svn_cascade::error::{Error, Result};
use svn_cascade::types::Namespace;

/// Profile subcommand
#[derive(Debug, Clone)]
pub enum ProfileAction {
    /// List profiles
    List,
    /// Show one profile
    Show(Option<String>),
    /// Make a profile active
    Use(String),
    /// Copy a profile under a new name
    Create {
        /// New profile name
        name: String,
        /// Profile to copy
        base: String,
    },
    /// Delete a profile
    Delete(String),
    /// Restore a built-in profile
    Reset(String),
    /// Set an environment root or display name
    SetEnv {
        /// Namespace
        namespace: Namespace,
        /// Environment key
        key: String,
        /// New root
        root: Option<String>,
        /// New display name (empty clears it)
        name: Option<String>,
    },
}

/// Run a profile subcommand
pub fn run_profile(ctx: &mut CommandContext, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::List => {
            for profile in ctx.book.profiles.values() {
                let marker = if profile.id == ctx.book.active { "*" } else { " " };
                let builtin = if PRESET_IDS.contains(&profile.id.as_str()) {
                    " (built-in)".muted()
                } else {
                    String::new()
                };
                println!(
                    "{} {} {}{builtin}",
                    marker.success(),
                    profile.id.accent(),
                    profile.name
                );
            }
            Ok(())
        }
        ProfileAction::Show(id) => {
            let profile = match id {
                Some(id) => ctx.book.get(&id)?,
                None => ctx.profile()?,
            };
            show(profile);
            Ok(())
        }
        ProfileAction::Use(id) => {
            ctx.book.switch(&id)?;
            ctx.save()?;
            println!("{} active profile is now {}", check(), id.accent());
            Ok(())
        }
        ProfileAction::Create { name, base } => {
            let id = ctx.book.create(&name, &base)?;
            ctx.save()?;
            println!("{} created {} ({})", check(), name.accent(), id.muted());
            Ok(())
        }
        ProfileAction::Delete(id) => {
            ctx.book.delete(&id)?;
            ctx.save()?;
            println!("{} deleted {}", check(), id.accent());
            Ok(())
        }
        ProfileAction::Reset(id) => {
            ctx.book.reset(&id)?;
            ctx.save()?;
            println!("{} reset {}", check(), id.accent());
            Ok(())
        }
        ProfileAction::SetEnv {
            namespace,
            key,
            root,
            name,
        } => {
            if root.is_none() && name.is_none() {
                return Err(Error::Config(
                    "nothing to set: pass --root and/or --name".to_string(),
                ));
            }
            let profile_id = ctx.profile_id()?;
            if let Some(root) = &root {
                ctx.book.update_environment(
                    &profile_id,
                    namespace,
                    &key,
                    EnvironmentField::Root,
                    root,
                )?;
            }
            if let Some(name) = &name {
                ctx.book.update_environment(
                    &profile_id,
                    namespace,
                    &key,
                    EnvironmentField::Name,
                    name,
                )?;
            }
            ctx.save()?;
            println!(
                "{} updated {namespace} environment {} in {}",
                check(),
                key.accent(),
                profile_id.accent()
            );
            Ok(())
        }
    }
}

fn show(profile: &Profile) {
    println!("{} {}", profile.name.emphasis(), format!("({})", profile.id).muted());
    if !profile.description.is_empty() {
        println!("  {}", profile.description.muted());
    }

    println!("{}", "Steps:".emphasis());
    for step in &profile.steps {
        let hotfix = if step.is_hotfix { " hotfix" } else { "" };
        println!(
            "  {} {} {} {} {} [{}{hotfix}]",
            arrow(),
            step.id.accent(),
            step.source,
            "->".muted(),
            step.target,
            step.kind
        );
    }

    println!("{}", "Directories:".emphasis());
    for (index, dir) in profile.directories.iter().enumerate() {
        println!("  [{index}] {} {} {}", dir.source, "->".muted(), dir.target);
    }

    for namespace in [Namespace::Remote, Namespace::Local] {
        println!("{}", format!("{namespace} environments:").emphasis());
        for (key, env) in profile.environments.namespace(namespace) {
            let root = if env.is_configured() {
                env.root.clone()
            } else {
                "(not set)".warn()
            };
            println!("  {} {} {root}", format!("{key:<12}").accent(), env.label(key).muted());
        }
    }
}
