//! Errors for parsing directory documents.

use std::sync::Arc;

use thiserror::Error;

/// An error produced while parsing a directory document or one of its items.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A key was asked for as a repeated item, but appeared only once.
    #[error("Item {0:?} was not repeated in this document")]
    NotArrayItem(String),

    /// A required key was not present in the document.
    #[error("Missing item {0:?}")]
    MissingKey(String),

    /// A `valid-until` (or similar) timestamp could not be parsed.
    #[error("Malformed date {0:?}")]
    MalformedDate(String),

    /// A document line was too short, or one of its arguments was unusable.
    #[error("Malformed {0:?} line")]
    MalformedItem(String),

    /// A port policy summary could not be parsed.
    #[error("Malformed port policy {0:?}")]
    BadPolicy(String),

    /// A relay identity could not be decoded.
    #[error("Malformed fingerprint {0:?}")]
    BadFingerprint(String),

    /// A directory authority line could not be parsed.
    #[error("Malformed authority line {0:?}")]
    BadAuthority(String),

    /// The document could not be read, or was not valid UTF-8.
    #[error("Unable to read document")]
    Io(#[source] Arc<std::io::Error>),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

/// A `Result` whose error type is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
