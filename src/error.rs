use thiserror::Error;

use crate::cloudflare::DecodeError;
use crate::http::TransportError;

/// Custom error types for the Cloudflare WAF toolkit
#[derive(Error, Debug)]
pub enum CfwafError {
    /// Missing or contradictory credentials, bad base URL, bad header values
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Settings loading errors
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Network-level failures while talking to the Cloudflare API
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Malformed or unexpected API response envelopes
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Block-list parsing errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Cloudflare WAF toolkit operations
pub type CfwafResult<T> = Result<T, CfwafError>;

impl From<reqwest::Error> for CfwafError {
    fn from(err: reqwest::Error) -> Self {
        CfwafError::Transport(TransportError::from(err))
    }
}
