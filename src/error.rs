//! Error types for svn-cascade

use thiserror::Error;

/// Errors raised by the merge pipeline and its collaborators
///
/// Merge conflicts and operator cancellations are not errors; they are
/// reported through [`DirectoryOutcome`](crate::pipeline::DirectoryOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// A step references an environment without a root path
    #[error("step '{step}': {namespace} environment '{key}' has no root path configured")]
    Environment {
        /// Step id
        step: String,
        /// Environment namespace ("remote" or "local")
        namespace: String,
        /// Environment key referenced by the step
        key: String,
    },

    /// The svn tool (or the merge backend) failed
    #[error("svn {operation} failed: {message}")]
    Svn {
        /// Operation name (merge, update, commit, ...)
        operation: &'static str,
        /// Error message
        message: String,
        /// Captured tool output, possibly empty
        output: String,
    },

    /// Tool output could not be parsed where the value is required
    #[error("failed to parse svn output: {0}")]
    Parse(String),

    /// Malformed revision specifier
    #[error("invalid revision specifier: {0}")]
    InvalidRevision(String),

    /// Step id not present in the profile
    #[error("step not found: {0}")]
    StepNotFound(String),

    /// Another step is already running
    #[error("pipeline busy: step '{0}' is running")]
    PipelineBusy(String),

    /// An interaction slot is already occupied
    #[error("an interaction is already pending: {0}")]
    GatewayBusy(&'static str),

    /// A conflict session was finished with files still conflicted
    #[error("{0} conflicted file(s) still unresolved")]
    ConflictsRemain(usize),

    /// Profile book error
    #[error("profile error: {0}")]
    Profile(String),

    /// Settings or profile file error
    #[error("config error: {0}")]
    Config(String),

    /// HTTP transport error talking to the merge backend
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for svn-cascade
pub type Result<T> = std::result::Result<T, Error>;
