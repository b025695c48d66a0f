//! SVN service backed by the JSON merge backend
//!
//! The backend runs next to the working copies and exposes each svn
//! operation as an endpoint under a common base URL (`.../api`).

use crate::error::{Error, Result};
use crate::revision::{RevisionSpec, parse_revision_number};
use crate::svn::{Operation, SvnService};
use crate::types::{ChangedPath, LogEntry, MergeOutput, ResolveChoice};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

/// Response shape of the mutating endpoints
#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    output: String,
    error: Option<String>,
    conflicts: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct LogsResponse {
    #[serde(default)]
    logs: Vec<BackendLogEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendLogEntry {
    revision: Option<String>,
    #[serde(default)]
    author: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    changed_files: Vec<ChangedPath>,
}

impl BackendLogEntry {
    fn into_entry(self) -> Option<LogEntry> {
        let revision = parse_revision_number(self.revision.as_deref()?).ok()?;
        Some(LogEntry {
            revision,
            author: self.author,
            date: DateTime::parse_from_rfc3339(&self.date)
                .ok()
                .map(|d| d.with_timezone(&Utc)),
            message: self.msg,
            changed_paths: self.changed_files,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MergeInfoResponse {
    #[serde(default)]
    revisions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: String,
}

/// SVN service talking to the merge backend over HTTP
pub struct HttpSvnService {
    client: Client,
    base_url: String,
}

impl HttpSvnService {
    /// Create a service for the backend at `base_url` (e.g. `http://127.0.0.1:3001/api`)
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("svn-cascade")
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    async fn post(
        &self,
        operation: Operation,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<CommandResponse> {
        debug!(endpoint, "POST to merge backend");
        let response = self.client.post(self.url(endpoint)).json(&body).send().await?;
        let parsed: CommandResponse = read_json(operation, response).await?;

        if parsed.success {
            Ok(parsed)
        } else {
            Err(Error::Svn {
                operation: operation.name(),
                message: parsed
                    .error
                    .unwrap_or_else(|| "backend reported failure".to_string()),
                output: parsed.output,
            })
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        operation: Operation,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!(endpoint, "GET from merge backend");
        let response = self
            .client
            .get(self.url(endpoint))
            .query(query)
            .send()
            .await?;
        read_json(operation, response).await
    }
}

/// Decode a JSON body, mapping HTTP and content-type failures to `Error::Svn`
async fn read_json<T: DeserializeOwned>(operation: Operation, response: Response) -> Result<T> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));

    if !is_json {
        return Err(Error::Svn {
            operation: operation.name(),
            message: format!("backend returned non-JSON response (HTTP {status})"),
            output: String::new(),
        });
    }

    if !status.is_success() {
        let body: CommandResponse =
            response.json().await.unwrap_or_else(|_| CommandResponse {
                success: false,
                output: String::new(),
                error: None,
                conflicts: None,
            });
        return Err(Error::Svn {
            operation: operation.name(),
            message: body
                .error
                .map_or_else(|| format!("HTTP {status}"), |e| format!("HTTP {status}: {e}")),
            output: body.output,
        });
    }

    response
        .json()
        .await
        .map_err(|e| Error::Parse(format!("invalid {} response: {e}", operation.name())))
}

#[async_trait]
impl SvnService for HttpSvnService {
    async fn merge(
        &self,
        source: &str,
        target: &str,
        revisions: &RevisionSpec,
    ) -> Result<MergeOutput> {
        let body = json!({
            "sourcePath": source,
            "targetPath": target,
            "revision": revisions.to_string(),
        });
        let response = self.post(Operation::Merge, "merge", body).await?;
        Ok(MergeOutput {
            output: response.output,
            conflicts: response.conflicts.unwrap_or_default(),
        })
    }

    async fn update(&self, path: &str) -> Result<String> {
        let response = self
            .post(Operation::Update, "update", json!({ "path": path }))
            .await?;
        Ok(response.output)
    }

    async fn revert(&self, path: &str) -> Result<String> {
        let response = self
            .post(Operation::Revert, "revert", json!({ "path": path }))
            .await?;
        Ok(response.output)
    }

    async fn commit(&self, path: &str, message: &str) -> Result<String> {
        let response = self
            .post(
                Operation::Commit,
                "commit",
                json!({ "path": path, "message": message }),
            )
            .await?;
        Ok(response.output)
    }

    async fn resolve(&self, path: &str, file: &str, choice: ResolveChoice) -> Result<()> {
        self.post(
            Operation::Resolve,
            "resolve",
            json!({ "path": path, "file": file, "choice": choice.svn_accept() }),
        )
        .await?;
        Ok(())
    }

    async fn status(&self, path: &str) -> Result<String> {
        let response = self
            .post(Operation::Status, "status", json!({ "path": path }))
            .await?;
        Ok(response.output)
    }

    async fn log_entries(&self, target: &str, limit: u32) -> Result<Vec<LogEntry>> {
        let response: LogsResponse = self
            .get(
                Operation::Log,
                "logs-list",
                &[("path", target.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(response
            .logs
            .into_iter()
            .filter_map(BackendLogEntry::into_entry)
            .collect())
    }

    async fn merged_revisions(&self, source: &str, target: &str) -> Result<Vec<u64>> {
        let response: MergeInfoResponse = self
            .get(
                Operation::MergeInfo,
                "mergeinfo",
                &[("source", source.to_string()), ("target", target.to_string())],
            )
            .await?;
        Ok(response
            .revisions
            .iter()
            .filter_map(|r| parse_revision_number(r).ok())
            .collect())
    }

    async fn last_message(&self, target: &str, revision: Option<u64>) -> Result<String> {
        let mut query = vec![("path", target.to_string())];
        if let Some(rev) = revision {
            query.push(("revision", rev.to_string()));
        }
        let response: MessageResponse = self
            .get(Operation::Log, "last-message", &query)
            .await?;
        if response.success {
            Ok(response.message)
        } else {
            Err(Error::Parse(format!(
                "backend returned no message for {target}"
            )))
        }
    }
}
