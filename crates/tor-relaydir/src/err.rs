//! Declare an error type for the tor-relaydir crate.

use std::net::IpAddr;

use thiserror::Error;

/// An error returned while looking up or selecting relays.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No relay has the requested nickname.
    #[error("No relay named {0:?}")]
    NicknameNotFound(String),

    /// No relay listens at the requested address and port.
    #[error("No relay at {0}:{1}")]
    AddrNotFound(IpAddr, u16),

    /// Selection found nothing that met every requirement.
    #[error("No relay matched: {0}")]
    NoMatchingRelay(String),

    /// Onion key material could not be decoded.
    #[error("Unable to decode onion key: {0}")]
    KeyDecode(String),
}

impl Error {
    /// Return true if this is a lookup miss rather than some other failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NicknameNotFound(_) | Error::AddrNotFound(..))
    }
}

/// A `Result` whose error type is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
