//! Error types for Scrumboard
//!
//! A crate-wide error enum plus the typed errors each capability surfaces
//! (authentication, queries, flag mutations, transport).
//! Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Result type alias for Scrumboard operations
pub type Result<T> = std::result::Result<T, ScrumboardError>;

/// Comprehensive error type for Scrumboard operations
#[derive(Error, Debug)]
pub enum ScrumboardError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No provider registered under this identifier
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Search errors
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Flag mutation errors
    #[error("Flag error: {0}")]
    Mutation(#[from] MutationError),

    /// The provider could not be reached or answered garbage
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The provider answered with a non-success status
    #[error("Provider error: HTTP {status}: {message}")]
    Provider { status: u16, message: String },

    /// Parsing errors (provider payloads, identifiers)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Filter session store errors
    #[error("Session error: {0}")]
    Session(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),

    /// Anyhow errors (for more context)
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Failure of a single outbound provider call.
///
/// Raised by [`ProviderClient`](crate::integrations::client::ProviderClient)
/// implementations; raw reqwest errors never cross this boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid response body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_decode() || e.is_body() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("provider unreachable: {0}")]
    ProviderUnreachable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Neither keys, sprint nor raw query produced a usable query
    #[error("no search filters: select issues, a sprint or enter a query")]
    EmptyFilters,

    /// The first page could not be fetched
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// A later page failed; the issues fetched before it are still returned
    #[error("partial result after {fetched} issues: {reason}")]
    PartialFailure { fetched: usize, reason: String },

    /// The caller cancelled the search between two page requests
    #[error("search cancelled after {fetched} issues")]
    Cancelled { fetched: usize },
}

/// One issue the printed label could not be applied to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagFailure {
    pub issue_id: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to flag {} issue(s): {}", .failures.len(), join_ids(.failures))]
pub struct MutationError {
    pub failures: Vec<FlagFailure>,
}

impl MutationError {
    /// Identifiers of the issues that were not flagged
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.issue_id.as_str()).collect()
    }
}

fn join_ids(failures: &[FlagFailure]) -> String {
    failures
        .iter()
        .map(|f| f.issue_id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
