//! Profiles: step chains, directory maps and environment roots

use crate::types::{DirectoryMapping, Environment, Namespace, Step, StepKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_upstream() -> String {
    "internal".to_string()
}

/// Environment roots by namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environments {
    /// Repository roots merged from, by key
    #[serde(default)]
    pub remote: BTreeMap<String, Environment>,
    /// Working copies merged into, by key
    #[serde(default)]
    pub local: BTreeMap<String, Environment>,
}

impl Environments {
    /// Environments in one namespace
    pub const fn namespace(&self, namespace: Namespace) -> &BTreeMap<String, Environment> {
        match namespace {
            Namespace::Remote => &self.remote,
            Namespace::Local => &self.local,
        }
    }

    /// Mutable environments in one namespace
    pub const fn namespace_mut(
        &mut self,
        namespace: Namespace,
    ) -> &mut BTreeMap<String, Environment> {
        match namespace {
            Namespace::Remote => &mut self.remote,
            Namespace::Local => &mut self.local,
        }
    }

    /// Blank every root, keeping keys and display names
    pub fn clear_roots(&mut self) {
        for env in self.remote.values_mut().chain(self.local.values_mut()) {
            env.root.clear();
        }
    }
}

/// Named bundle of steps, directory mappings and environments
///
/// The pipeline reads a snapshot per run and never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile id
    pub id: String,
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Remote key of the upstream branch; steps merging from it use
    /// [`DirectoryMapping::source`] sub-paths
    #[serde(default = "default_upstream")]
    pub upstream: String,
    /// Directory mappings, in display order
    pub directories: Vec<DirectoryMapping>,
    /// Steps, in pipeline order
    pub steps: Vec<Step>,
    /// Environment roots
    #[serde(default)]
    pub environments: Environments,
}

impl Profile {
    /// Look up a step by id
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Steps that take part in a run with the given hotfix setting
    pub fn active_steps(&self, include_hotfix: bool) -> Vec<&Step> {
        self.steps
            .iter()
            .filter(|s| include_hotfix || !s.is_hotfix)
            .collect()
    }

    /// Look up an environment
    pub fn environment(&self, namespace: Namespace, key: &str) -> Option<&Environment> {
        self.environments.namespace(namespace).get(key)
    }

    /// Sub-path to merge from for `mapping` in `step`
    pub fn source_sub_path<'a>(&self, step: &Step, mapping: &'a DirectoryMapping) -> &'a str {
        if step.source == self.upstream {
            &mapping.source
        } else {
            &mapping.target
        }
    }
}

/// Ids of the built-in profiles
pub const PRESET_IDS: [&str; 3] = ["default", "japan", "china"];

fn dirs(entries: &[(&str, &str)]) -> Vec<DirectoryMapping> {
    entries
        .iter()
        .map(|(source, target)| DirectoryMapping::new(source, target))
        .collect()
}

fn suffixed_dirs(suffix: &str) -> Vec<DirectoryMapping> {
    let data = format!("Client/Assets/Game/data{suffix}");
    let design = format!("Client/Assets/Game/design{suffix}");
    let server_data = format!("Server/Data{suffix}");
    let server_design = format!("Server/Design{suffix}");
    dirs(&[
        ("Client/Assets/Game/art", "Client/Assets/Game/art"),
        ("Client/Assets/Game/audio", "Client/Assets/Game/audio"),
        (&data, "Client/Assets/Game/data"),
        (&design, "Client/Assets/Game/design"),
        ("Client/Assets/Game/ngui", "Client/Assets/Game/ngui"),
        ("Client/BundleBuild/Pandora", "Client/BundleBuild/Pandora"),
        (&server_data, "Server/Data"),
        (&server_design, "Server/Design"),
    ])
}

fn environments(remote: &[(&str, &str)]) -> Environments {
    let mut envs = Environments::default();
    for (key, name) in remote {
        envs.remote.insert((*key).to_string(), Environment::named(name));
        if *key != "internal" {
            envs.local.insert((*key).to_string(), Environment::default());
        }
    }
    envs
}

/// Built-in profile by id
pub fn preset(id: &str) -> Option<Profile> {
    use StepKind::{Auto, Manual};

    let profile = match id {
        "default" => Profile {
            id: id.to_string(),
            name: "International".to_string(),
            description: "International flow (_en sources, Release -> Stable -> Stable2022)"
                .to_string(),
            upstream: default_upstream(),
            directories: suffixed_dirs("_en"),
            steps: vec![
                Step::new("1", "Internal >>> Release", "internal", "release", Manual),
                Step::new("2", "Release >>> Stable", "release", "stable", Auto),
                Step::new("3", "Stable >>> Stable2022", "stable", "stable2022", Auto),
                Step::new("4", "Stable >>> Hotfix", "stable", "hotfix", Auto).hotfix(),
                Step::new("5", "Hotfix >>> Hotfix2022", "stable2022", "hotfix2022", Auto)
                    .hotfix(),
            ],
            environments: environments(&[
                ("internal", "MobileAnime"),
                ("release", "Release"),
                ("stable", "Stable"),
                ("stable2022", "Stable2022"),
                ("hotfix", "Hotfix"),
                ("hotfix2022", "Hotfix2022"),
            ]),
        },
        "japan" => Profile {
            id: id.to_string(),
            name: "Japan".to_string(),
            description: "Japan flow (no suffix, Release -> Stable2022)".to_string(),
            upstream: default_upstream(),
            directories: suffixed_dirs(""),
            steps: vec![
                Step::new("1", "Internal >>> Release", "internal", "release", Manual),
                Step::new("2", "Release >>> Stable2022", "release", "stable2022", Auto),
                Step::new("3", "Stable2022 >>> Hotfix2022", "stable2022", "hotfix2022", Auto)
                    .hotfix(),
            ],
            environments: environments(&[
                ("internal", "MobileAnime_JP"),
                ("release", "Release_JP"),
                ("stable2022", "Stable2022_JP"),
                ("hotfix2022", "Hotfix2022_JP"),
            ]),
        },
        "china" => Profile {
            id: id.to_string(),
            name: "China".to_string(),
            description: "China flow (_cn sources, Release -> Stable)".to_string(),
            upstream: default_upstream(),
            directories: suffixed_dirs("_cn"),
            steps: vec![
                Step::new("1", "Internal >>> Release", "internal", "release", Manual),
                Step::new("2", "Release >>> Stable", "release", "stable", Auto),
                Step::new("3", "Stable >>> Hotfix", "stable", "hotfix", Auto).hotfix(),
            ],
            environments: environments(&[
                ("internal", "MobileAnime_CN"),
                ("release", "Release_CN"),
                ("stable", "Stable_CN"),
                ("hotfix", "Hotfix_CN"),
            ]),
        },
        _ => return None,
    };
    Some(profile)
}
