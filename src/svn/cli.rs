//! SVN service backed by the `svn` command-line client

use crate::error::{Error, Result};
use crate::paths::is_repository_url;
use crate::revision::RevisionSpec;
use crate::svn::{ExitPolicy, Operation, SvnService, parse};
use crate::types::{LogEntry, MergeOutput, ResolveChoice};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured result of one svn invocation
#[derive(Debug)]
struct ToolOutput {
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl ToolOutput {
    /// stdout followed by any stderr, for display
    fn combined(&self) -> String {
        if self.stderr.trim().is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\nSTDERR: {}", self.stdout, self.stderr)
        }
    }

    /// Error for an exit that the operation treats as a failure
    fn failure(&self, operation: Operation) -> Error {
        let message = match self.stderr.trim() {
            "" => format!("exited with {}", describe_code(self.code)),
            stderr => stderr.to_string(),
        };
        Error::Svn {
            operation: operation.name(),
            message,
            output: self.combined(),
        }
    }
}

/// SVN service that spawns the svn binary
pub struct SvnCli {
    program: String,
}

impl SvnCli {
    /// Create a service using `program` as the svn executable
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run svn and apply the exit-code table for `operation`
    async fn run(&self, operation: Operation, args: &[&str]) -> Result<ToolOutput> {
        debug!(operation = operation.name(), ?args, "running svn");

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Svn {
                operation: operation.name(),
                message: format!("failed to spawn {}: {e}", self.program),
                output: String::new(),
            })?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if ExitPolicy::for_operation(operation).accepts(result.code) {
            if result.code != Some(0) {
                debug!(operation = operation.name(), code = ?result.code, "accepted non-zero exit");
            }
            Ok(result)
        } else {
            Err(result.failure(operation))
        }
    }

    /// Resolve a local working copy to its repository URL
    ///
    /// Falls back to the path itself when `svn info` fails, so the caller
    /// still gets a meaningful error from the real operation.
    async fn repository_url(&self, path: &str) -> String {
        if is_repository_url(path) {
            return path.to_string();
        }
        let normalized = path.replace('\\', "/");
        match self
            .run(Operation::Info, &["info", &normalized, "--xml", "--non-interactive"])
            .await
        {
            Ok(out) => parse::info_url(&out.stdout).map_or(normalized, |url| {
                debug!(path, %url, "resolved working copy to URL");
                url
            }),
            Err(e) => {
                debug!(path, error = %e, "svn info failed, using path as-is");
                normalized
            }
        }
    }
}

fn describe_code(code: Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("code {c}"))
}

#[async_trait]
impl SvnService for SvnCli {
    async fn merge(
        &self,
        source: &str,
        target: &str,
        revisions: &RevisionSpec,
    ) -> Result<MergeOutput> {
        let source = self.repository_url(source).await;
        let spec = revisions.to_string();
        debug!(%source, target, revisions = %spec, "merging");

        let out = self
            .run(
                Operation::Merge,
                &["merge", "-c", &spec, &source, target, "--non-interactive"],
            )
            .await?;

        let conflicts = parse::merge_conflicts(&out.stdout);
        if out.code != Some(0) && conflicts.is_empty() {
            return Err(out.failure(Operation::Merge));
        }
        Ok(MergeOutput {
            conflicts,
            output: out.combined(),
        })
    }

    async fn update(&self, path: &str) -> Result<String> {
        debug!(path, "updating working copy");
        let out = self
            .run(Operation::Update, &["update", path, "--non-interactive"])
            .await?;
        Ok(out.combined())
    }

    async fn revert(&self, path: &str) -> Result<String> {
        debug!(path, "reverting working copy");
        let out = self
            .run(Operation::Revert, &["revert", "-R", path, "--non-interactive"])
            .await?;
        Ok(out.combined())
    }

    async fn commit(&self, path: &str, message: &str) -> Result<String> {
        // Messages go through a file so multi-line text and encoding survive
        let message_file = tempfile::Builder::new()
            .prefix("svn-cascade-msg-")
            .suffix(".txt")
            .tempfile()?;
        tokio::fs::write(message_file.path(), message).await?;
        let message_path = message_file.path().to_string_lossy().into_owned();

        debug!(path, message_len = message.len(), "committing");
        let out = self
            .run(
                Operation::Commit,
                &[
                    "commit",
                    path,
                    "-F",
                    &message_path,
                    "--encoding",
                    "UTF-8",
                    "--non-interactive",
                ],
            )
            .await?;
        Ok(out.combined())
    }

    async fn resolve(&self, path: &str, file: &str, choice: ResolveChoice) -> Result<()> {
        let file_path = if Path::new(file).is_absolute() || path.is_empty() {
            file.to_string()
        } else {
            Path::new(path).join(file).to_string_lossy().into_owned()
        };
        debug!(file = %file_path, %choice, "resolving conflict");
        self.run(
            Operation::Resolve,
            &[
                "resolve",
                "--accept",
                choice.svn_accept(),
                &file_path,
                "--non-interactive",
            ],
        )
        .await?;
        Ok(())
    }

    async fn status(&self, path: &str) -> Result<String> {
        let out = self
            .run(Operation::Status, &["status", path, "--non-interactive"])
            .await?;
        if out.code != Some(0) && !out.stderr.trim().is_empty() {
            return Err(out.failure(Operation::Status));
        }
        Ok(out.stdout)
    }

    async fn log_entries(&self, target: &str, limit: u32) -> Result<Vec<LogEntry>> {
        let target = self.repository_url(target).await;
        let limit = limit.to_string();
        let out = self
            .run(
                Operation::Log,
                &[
                    "log",
                    &target,
                    "--limit",
                    &limit,
                    "--xml",
                    "--verbose",
                    "--non-interactive",
                ],
            )
            .await?;
        let entries = parse::log_entries(&out.stdout);
        debug!(%target, count = entries.len(), "fetched log entries");
        Ok(entries)
    }

    async fn merged_revisions(&self, source: &str, target: &str) -> Result<Vec<u64>> {
        let out = self
            .run(
                Operation::MergeInfo,
                &[
                    "mergeinfo",
                    "--show-revs",
                    "merged",
                    source,
                    target,
                    "--non-interactive",
                ],
            )
            .await?;
        if out.code != Some(0) {
            warn!(
                source,
                target,
                code = ?out.code,
                "svn mergeinfo failed, treating as nothing merged"
            );
        }
        Ok(parse::merged_revisions(&out.stdout))
    }

    async fn last_message(&self, target: &str, revision: Option<u64>) -> Result<String> {
        let range = revision.map_or_else(|| "1".to_string(), |r| r.to_string());
        let selector = if revision.is_some() { "-r" } else { "-l" };
        let out = self
            .run(
                Operation::Log,
                &["log", selector, &range, "--xml", target, "--non-interactive"],
            )
            .await?;
        Ok(parse::last_message(&out.stdout))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write an executable stand-in for svn that prints and exits as told
    fn fake_svn(dir: &TempDir, name: &str, stdout: &str, stderr: &str, code: i32) -> SvnCli {
        let path = dir.path().join(name);
        let script = format!(
            "#!/bin/sh\nprintf '%s' '{stdout}'\nprintf '%s' '{stderr}' >&2\nexit {code}\n"
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        SvnCli::new(path.to_string_lossy().into_owned())
    }

    fn spec() -> RevisionSpec {
        RevisionSpec::single(900)
    }

    // One test so scripts are never written while another test spawns
    #[tokio::test]
    async fn test_exit_codes_against_fake_binary() {
        let dir = TempDir::new().unwrap();
        let not_found = "svn: E160013: Path /bad/url not found";

        let svn = fake_svn(&dir, "merge-error", "", not_found, 1);
        let err = svn.merge("svn://host/internal", "/wc", &spec()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Svn { operation: "merge", ref message, .. } if message.contains("E160013")
        ));

        let svn = fake_svn(&dir, "merge-conflict", "C    a.txt", "", 1);
        let merged = svn.merge("svn://host/internal", "/wc", &spec()).await.unwrap();
        assert_eq!(merged.conflicts, vec!["a.txt".to_string()]);

        let svn = fake_svn(&dir, "merge-clean", "U    b.txt", "", 0);
        let merged = svn.merge("svn://host/internal", "/wc", &spec()).await.unwrap();
        assert!(merged.conflicts.is_empty());

        let svn = fake_svn(&dir, "merge-crash", "C    a.txt", "", 2);
        assert!(svn.merge("svn://host/internal", "/wc", &spec()).await.is_err());

        let svn = fake_svn(&dir, "status-error", "", not_found, 1);
        let err = svn.status("/wc").await.unwrap_err();
        assert!(matches!(err, Error::Svn { operation: "status", .. }));

        let svn = fake_svn(&dir, "status-notice", "M       file.txt", "", 1);
        assert_eq!(svn.status("/wc").await.unwrap(), "M       file.txt");

        let svn = fake_svn(&dir, "update-error", "", "svn: E155004: locked", 1);
        let err = svn.update("/wc").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Svn { operation: "update", ref message, .. } if message.contains("E155004")
        ));

        let svn = fake_svn(&dir, "mergeinfo-error", "", not_found, 1);
        assert!(svn.merged_revisions("svn://a", "/wc").await.unwrap().is_empty());
    }
}
