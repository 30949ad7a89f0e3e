//! Error types for the contract-read and wallet capabilities.
//!
//! Decode mismatches are not errors: the decoders in [crate::decode] return `None`.
//! Confirmation timeouts are not errors either; see [crate::workflow::StackStatus].

use thiserror::Error;

/// Failure of a read-only contract call (network, node, or payload).
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    /// Node answered but rejected the call (`okay: false`).
    #[error("read-only call rejected: {0}")]
    Rejected(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Failure of the external wallet capability.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet not available")]
    Unavailable,
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Submission(String),
}

impl WalletError {
    /// Human-readable message, or `fallback` when the wallet gave none.
    pub fn message_or(&self, fallback: &str) -> String {
        let msg = self.to_string();
        if msg.trim().is_empty() {
            fallback.to_string()
        } else {
            msg
        }
    }
}
