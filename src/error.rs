use thiserror::Error;

/// Errors surfaced by the client core.
///
/// Most of these never reach the user: conflicts are resolved by resyncing and
/// background failures are logged and retried. Only a failed initial load is
/// expected to be rendered by the shell.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("lock version conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("game {0} is already finished")]
    GameFinished(u64),
    #[error("invalid api url: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Map a non-success HTTP status onto the error taxonomy.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            409 => ClientError::Conflict(body),
            404 => ClientError::NotFound(body),
            401 | 403 => ClientError::Unauthorized(body),
            _ => ClientError::Status { status, body },
        }
    }

    /// Expected divergence: the server moved on without us. Resolved by a resync.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Conflict(_) | ClientError::GameFinished(_))
    }
}
