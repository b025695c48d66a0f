//! Core types for svn-cascade

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// How a step is started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Only started by the operator
    Manual,
    /// Started automatically once its predecessor completes
    Auto,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// One directed source -> target merge stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Stable step id
    pub id: String,
    /// Display name
    pub name: String,
    /// Remote environment key merged from
    pub source: String,
    /// Local environment key merged into
    pub target: String,
    /// Manual or auto
    pub kind: StepKind,
    /// Hotfix steps only run when hotfix inclusion is enabled
    #[serde(default)]
    pub is_hotfix: bool,
}

impl Step {
    /// Create a non-hotfix step
    pub fn new(id: &str, name: &str, source: &str, target: &str, kind: StepKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            kind,
            is_hotfix: false,
        }
    }

    /// Mark this step as a hotfix step
    #[must_use]
    pub const fn hotfix(mut self) -> Self {
        self.is_hotfix = true;
        self
    }
}

/// Execution status of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not started (or at rest after a completed run)
    #[default]
    Pending,
    /// Currently running
    Running,
    /// Every attempted directory was committed
    Completed,
    /// Aborted, failed, or misconfigured
    Failed,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A pair of corresponding sub-paths merged independently within a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryMapping {
    /// Sub-path in the upstream repository
    pub source: String,
    /// Sub-path in every downstream branch
    pub target: String,
}

impl DirectoryMapping {
    /// Create a mapping
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

/// An environment root (repository URL or working copy)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Root path or URL; empty when not configured
    #[serde(default)]
    pub root: String,
    /// Display name used in commit messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Environment {
    /// Environment with a root and no display name
    pub fn with_root(root: &str) -> Self {
        Self {
            root: root.to_string(),
            name: None,
        }
    }

    /// Environment with a display name and no root yet
    pub fn named(name: &str) -> Self {
        Self {
            root: String::new(),
            name: Some(name.to_string()),
        }
    }

    /// Whether a root has been configured
    pub fn is_configured(&self) -> bool {
        !self.root.trim().is_empty()
    }

    /// Label for commit messages, falling back to the environment key
    pub fn label<'a>(&'a self, key: &'a str) -> &'a str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(key)
    }
}

/// Environment namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Repository roots merged from
    Remote,
    /// Working copies merged into and committed
    Local,
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Local => write!(f, "local"),
        }
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote" | "svn" => Ok(Self::Remote),
            "local" => Ok(Self::Local),
            other => Err(Error::Config(format!(
                "unknown namespace '{other}' (expected remote or local)"
            ))),
        }
    }
}

/// A path changed by a revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedPath {
    /// Action letter (A, M, D, R)
    pub action: String,
    /// Repository path
    pub path: String,
}

/// A history entry from svn log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Revision number
    pub revision: u64,
    /// Author name
    pub author: String,
    /// Commit timestamp, if it parsed
    pub date: Option<DateTime<Utc>>,
    /// Full log message
    pub message: String,
    /// Changed paths (verbose log only)
    pub changed_paths: Vec<ChangedPath>,
}

/// Result of a merge that did not fail outright
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutput {
    /// Tool output
    pub output: String,
    /// Conflicted paths (empty when the merge was clean)
    pub conflicts: Vec<String>,
}

impl MergeOutput {
    /// Whether the merge left conflicts behind
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Resolution choice for one conflicted path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveChoice {
    /// Leave marked as conflicted and deal with it later
    Defer,
    /// Take the base revision
    Base,
    /// Keep the local file entirely
    KeepLocalFull,
    /// Take the incoming file entirely
    KeepIncomingFull,
    /// Keep local text only for conflicted hunks
    UseLocalConflictHunk,
    /// Take incoming text only for conflicted hunks
    UseIncomingConflictHunk,
    /// Accept the working copy as edited
    UseWorkingCopy,
}

impl ResolveChoice {
    /// Choices offered to the operator, in display order
    pub const OFFERED: [Self; 6] = [
        Self::Defer,
        Self::KeepLocalFull,
        Self::KeepIncomingFull,
        Self::UseLocalConflictHunk,
        Self::UseIncomingConflictHunk,
        Self::UseWorkingCopy,
    ];

    /// The `svn resolve --accept` argument
    pub const fn svn_accept(self) -> &'static str {
        match self {
            Self::Defer => "postpone",
            Self::Base => "base",
            Self::KeepLocalFull => "mine-full",
            Self::KeepIncomingFull => "theirs-full",
            Self::UseLocalConflictHunk => "mine-conflict",
            Self::UseIncomingConflictHunk => "theirs-conflict",
            Self::UseWorkingCopy => "working",
        }
    }

    /// Short operator-facing description
    pub const fn description(self) -> &'static str {
        match self {
            Self::Defer => "postpone (leave conflicted)",
            Self::Base => "use base revision",
            Self::KeepLocalFull => "keep mine (full file)",
            Self::KeepIncomingFull => "take theirs (full file)",
            Self::UseLocalConflictHunk => "keep mine (conflicted hunks)",
            Self::UseIncomingConflictHunk => "take theirs (conflicted hunks)",
            Self::UseWorkingCopy => "use working copy as edited",
        }
    }
}

impl std::fmt::Display for ResolveChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.svn_accept())
    }
}

impl FromStr for ResolveChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postpone" | "defer" => Ok(Self::Defer),
            "base" => Ok(Self::Base),
            "mine-full" => Ok(Self::KeepLocalFull),
            "theirs-full" => Ok(Self::KeepIncomingFull),
            "mine-conflict" => Ok(Self::UseLocalConflictHunk),
            "theirs-conflict" => Ok(Self::UseIncomingConflictHunk),
            "working" => Ok(Self::UseWorkingCopy),
            other => Err(Error::Internal(format!("invalid resolve choice: {other}"))),
        }
    }
}
