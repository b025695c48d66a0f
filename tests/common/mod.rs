//! Shared test fixtures

#![allow(dead_code)]

mod mock_svn;

pub use mock_svn::{CommitCall, MergeCall, MockSvnService, ResolveCall};

use std::sync::{Arc, Mutex};
use svn_cascade::config::{Environments, Profile};
use svn_cascade::paths::{display, working_copy_path};
use svn_cascade::pipeline::{ConfirmationRequest, Interaction, InteractionQueue};
use svn_cascade::types::{DirectoryMapping, Environment, ResolveChoice, Step, StepKind};
use tokio::task::JoinHandle;

/// Branch keys used by [`cascade_profile`], upstream first
pub const BRANCHES: [(&str, &str); 5] = [
    ("internal", "MobileAnime"),
    ("release", "Release"),
    ("stable", "Stable"),
    ("hotfix", "Hotfix"),
    ("stable2022", "Stable2022"),
];

/// Profile with steps `a(manual) -> b(auto) -> c(auto, hotfix) -> d(auto)`
/// over three directories, every root configured
pub fn cascade_profile() -> Profile {
    let mut environments = Environments::default();
    for (key, name) in BRANCHES {
        environments.remote.insert(
            key.to_string(),
            Environment {
                root: format!("svn://host/{key}"),
                name: Some(name.to_string()),
            },
        );
        if key != "internal" {
            environments
                .local
                .insert(key.to_string(), Environment::with_root(&format!("/wc/{key}")));
        }
    }

    Profile {
        id: "test".to_string(),
        name: "Test".to_string(),
        description: String::new(),
        upstream: "internal".to_string(),
        directories: vec![
            DirectoryMapping::new("Client/data_en", "Client/data"),
            DirectoryMapping::new("Client/art", "Client/art"),
            DirectoryMapping::new("Server/Design_en", "Server/Design"),
        ],
        steps: vec![
            Step::new("a", "Internal >>> Release", "internal", "release", StepKind::Manual),
            Step::new("b", "Release >>> Stable", "release", "stable", StepKind::Auto),
            Step::new("c", "Stable >>> Hotfix", "stable", "hotfix", StepKind::Auto).hotfix(),
            Step::new("d", "Stable >>> Stable2022", "stable", "stable2022", StepKind::Auto),
        ],
        environments,
    }
}

/// Working copy path of directory `sub` in local branch `key`
pub fn wc(key: &str, sub: &str) -> String {
    display(&working_copy_path(&format!("/wc/{key}"), sub))
}

/// How the scripted operator answers conflict sessions
#[derive(Debug, Clone, Copy)]
pub enum ConflictAnswer {
    /// Resolve every file with this choice, then finish
    Resolve(ResolveChoice),
    /// Abort the session
    Abort,
}

/// Scripted operator answering the interaction queue
pub struct ScriptedOperator {
    /// Accept commit confirmations
    pub accept: bool,
    /// Answer to conflict sessions
    pub conflicts: ConflictAnswer,
}

impl ScriptedOperator {
    /// Accept every commit and resolve conflicts with the working copy
    pub const fn accepting() -> Self {
        Self {
            accept: true,
            conflicts: ConflictAnswer::Resolve(ResolveChoice::UseWorkingCopy),
        }
    }

    /// Answer `queue` until the gateway goes away
    ///
    /// Returns the confirmation requests seen, in order.
    pub fn spawn(
        self,
        mut queue: InteractionQueue,
    ) -> (Arc<Mutex<Vec<ConfirmationRequest>>>, JoinHandle<()>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let handle = tokio::spawn(async move {
            while let Some(interaction) = queue.next().await {
                match interaction {
                    Interaction::Confirm(handle) => {
                        record.lock().unwrap().push(handle.request().clone());
                        if self.accept {
                            handle.accept();
                        } else {
                            handle.reject();
                        }
                    }
                    Interaction::Conflicts(mut handle) => match self.conflicts {
                        ConflictAnswer::Resolve(choice) => {
                            for file in handle.files().to_vec() {
                                handle.resolve(&file, choice).await.unwrap();
                            }
                            handle.finish().unwrap();
                        }
                        ConflictAnswer::Abort => handle.abort(),
                    },
                }
            }
        });
        (seen, handle)
    }
}
