//! Error taxonomy of the market-data core

use thiserror::Error;

/// Failure talking to the upstream market API. Always recoverable: callers
/// keep serving whatever they had before the call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} answered with HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Rejected write of a portfolio row.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Coin id must not be empty")]
    EmptyIdentifier,

    #[error("Invalid CoinGecko coin id: {input}")]
    InvalidIdentifier { input: String },

    #[error("Another row already tracks {identifier}")]
    DuplicateIdentifier { identifier: String },

    #[error("No portfolio row with id {id}")]
    RowNotFound { id: u64 },

    #[error("Failed to write portfolio row: {0:#}")]
    Storage(anyhow::Error),
}
