//! Declare an error type for the tor-consensus crate.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tor_dirdoc::Fingerprint;
use tor_dirfetch::{ConfigBuildError, RequestFailedError};

/// An error returned while loading a consensus or attaching keys to it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No directory source gave us the document we wanted.
    #[error("Unable to download directory document")]
    Fetch(#[from] tor_dirfetch::Error),

    /// A request to one particular directory failed.
    #[error("Directory request failed")]
    Request(#[from] RequestFailedError),

    /// The consensus had a `valid-until` line we could not understand.
    ///
    /// The previous table is kept.
    #[error("Malformed valid-until date {0:?} in consensus")]
    MalformedDate(String),

    /// We could not read or write the on-disk consensus cache.
    #[error("Unable to access consensus cache at {}", path.display())]
    CacheIo {
        /// The file we were using.
        path: PathBuf,
        /// What went wrong.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A relay's descriptor held key material we could not use.
    #[error("Unable to decode onion key for relay {fingerprint}")]
    DecodeError {
        /// The relay whose key was bad.
        fingerprint: Fingerprint,
        /// What was wrong with it.
        #[source]
        source: tor_relaydir::Error,
    },

    /// An operation needed a consensus, and none has been loaded yet.
    #[error("No consensus has been loaded")]
    NoConsensus,

    /// The relay asked about is not in the current consensus.
    #[error("Relay {0} is not in the current consensus")]
    UnknownRelay(Fingerprint),

    /// A document could not be read or parsed.
    #[error("Unable to read directory document")]
    Document(#[from] tor_dirdoc::Error),

    /// A relay lookup or selection failed.
    #[error("Relay lookup failed")]
    Relay(#[from] tor_relaydir::Error),

    /// The configuration was unusable.
    #[error("Invalid consensus configuration")]
    Config(#[from] ConfigBuildError),
}

impl Error {
    /// Wrap an IO error that happened while using the cache file at `path`.
    pub(crate) fn cache_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Error::CacheIo {
            path: path.into(),
            source: Arc::new(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Document(e.into())
    }
}

/// A `Result` whose error type is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
