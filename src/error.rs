use thiserror::Error;

use crate::fetch::FetchError;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Request error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Empty response from {url}")]
    EmptyDocument { url: String },

    #[error("Group {0} not found")]
    UnknownParent(i64),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl ExtractError {
    pub fn from_fetch(url: &str, err: FetchError) -> Self {
        ExtractError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
