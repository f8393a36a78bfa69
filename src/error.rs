//! Error types for imap-connection

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("IMAP response error: {0}")]
    Response(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown stream metadata key: {0}")]
    UnknownMetaKey(String),

    #[error("Stream metadata `{key}` holds a {expected} value, got {actual}")]
    MetaShape {
        key: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Invalid character {0:?} in command argument")]
    Validate(char),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),
}

pub type Result<T> = std::result::Result<T, Error>;
