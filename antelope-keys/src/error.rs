//! Error types for the antelope-keys library

use thiserror::Error;

/// Custom error type for key derivation operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Invalid derivation path: {0}")]
    InvalidPath(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Key encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result type for antelope-keys operations
pub type Result<T> = std::result::Result<T, Error>;
