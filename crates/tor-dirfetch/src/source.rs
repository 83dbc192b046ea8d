//! Where a directory request goes.

use std::fmt;
use std::net::SocketAddr;

/// What kind of directory a [`DirSource`] is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SourceKind {
    /// An ordinary relay that caches directory documents.
    Cache,
    /// One of the compiled-in directory authorities.
    Authority,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Cache => write!(f, "cache"),
            SourceKind::Authority => write!(f, "authority"),
        }
    }
}

/// A directory server that we can send a request to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DirSource {
    /// Cache or authority.
    kind: SourceKind,
    /// Nickname, for logging.
    nickname: String,
    /// Address of the directory port.
    addr: SocketAddr,
}

impl DirSource {
    /// Describe a directory server.
    pub fn new(kind: SourceKind, nickname: impl Into<String>, addr: SocketAddr) -> Self {
        DirSource {
            kind,
            nickname: nickname.into(),
            addr,
        }
    }

    /// Return whether this is a cache or an authority.
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Return the server's nickname.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Return the address to connect to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl fmt::Display for DirSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} at {}", self.kind, self.nickname, self.addr)
    }
}
