use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Skipping invalid repo entry: {0}")]
    InvalidEntity(String),

    #[error("Network error calling {path}: {message}")]
    Transport { path: String, message: String },

    #[error("GitHub API error {status} for {path}: {body}")]
    Upstream { status: u16, path: String, body: String },

    #[error("Unexpected payload from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Failures that came from talking to the remote API.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            LedgerError::Transport { .. }
                | LedgerError::Upstream { .. }
                | LedgerError::Decode { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
