use thiserror::Error;

/// Failure of a remote call, classified the way the server reports it.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("server responded with {status}: {message}")]
    Server { status: u16, message: String },

    #[error("could not reach the server: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// Classifies an error response from its status code and envelope message.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 422 => ClientError::InvalidInput(message),
            404 => ClientError::NotFound(message),
            409 => ClientError::Conflict(message),
            _ => ClientError::Server { status, message },
        }
    }

    /// Whether the server answered at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
