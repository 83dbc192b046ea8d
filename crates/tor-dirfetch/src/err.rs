//! Declare dirfetch-specific errors.

use std::error::Error as StdError;
use std::sync::Arc;

use retry_error::RetryError;
use thiserror::Error;

use crate::DirSource;

/// An error from a single request to a single directory source.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum RequestError {
    /// We couldn't reach the source at all.
    #[error("Network unavailable")]
    NetworkUnavailable(#[source] Arc<std::io::Error>),

    /// Got an HTTP status other than 200.
    #[error("Unexpected HTTP status {0:?} {1:?}")]
    HttpStatus(Option<u16>, Option<String>),

    /// We got an EOF before we were done with the headers.
    #[error("Truncated HTTP headers")]
    TruncatedHeaders,

    /// Error when parsing HTTP.
    #[error("Couldn't parse HTTP headers")]
    Httparse(#[from] httparse::Error),

    /// Error while creating an HTTP request.
    #[error("Couldn't create HTTP request")]
    Http(#[source] Arc<http::Error>),

    /// IO error after the connection was made.
    #[error("IO error")]
    Io(#[source] Arc<std::io::Error>),

    /// The chosen relay does not serve directory requests.
    #[error("Relay has no directory port")]
    NoDirPort,
}

impl RequestError {
    /// Return true if this error happened while reaching the source, rather
    /// than while talking to it.
    ///
    /// Network errors are not worth retrying against the same source.
    pub fn is_network(&self) -> bool {
        matches!(self, RequestError::NetworkUnavailable(_))
    }
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<http::Error> for RequestError {
    fn from(err: http::Error) -> Self {
        Self::Http(Arc::new(err))
    }
}

/// A [`RequestError`] together with the source it came from.
#[derive(Error, Debug, Clone)]
#[error("Request to {source_desc} failed")]
pub struct RequestFailedError {
    /// Where we sent the request.
    source_desc: DirSource,
    /// What went wrong.
    #[source]
    error: RequestError,
}

impl RequestFailedError {
    /// Wrap `error`, which happened while talking to `source`.
    pub fn new(source: DirSource, error: RequestError) -> Self {
        RequestFailedError {
            source_desc: source,
            error,
        }
    }

    /// Return the source the request went to.
    pub fn dir_source(&self) -> &DirSource {
        &self.source_desc
    }

    /// Return the underlying error.
    pub fn error(&self) -> &RequestError {
        &self.error
    }
}

impl AsRef<dyn StdError + 'static> for RequestFailedError {
    fn as_ref(&self) -> &(dyn StdError + 'static) {
        self
    }
}

/// An error from trying to fetch a document.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Every attempt in every phase failed.
    #[error("Unable to fetch {path} after {tries} tries")]
    FetchExhausted {
        /// The path we asked for.
        path: String,
        /// How many attempts we made.
        tries: usize,
        /// The error from each attempt.
        #[source]
        errors: RetryError<RequestFailedError>,
    },

    /// The configuration was unusable.
    #[error("Invalid fetch configuration")]
    Config(#[from] ConfigBuildError),
}

/// A problem building a [`FetchConfig`](crate::FetchConfig).
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum ConfigBuildError {
    /// A field was not set and had no default.
    #[error("Field was not provided: {field}")]
    MissingField {
        /// The field.
        field: String,
    },
    /// A field was set to something we can't use.
    #[error("Value of {field} was incorrect: {problem}")]
    Invalid {
        /// The field.
        field: String,
        /// What's wrong with it.
        problem: String,
    },
}

impl From<derive_builder::UninitializedFieldError> for ConfigBuildError {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        ConfigBuildError::MissingField {
            field: e.field_name().to_owned(),
        }
    }
}

/// A `Result` whose error type is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
