//! Retrying fetches across caches and authorities.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use flate2::read::ZlibDecoder;
use rand::{CryptoRng, Rng};
use retry_error::RetryError;
use tor_relaydir::{Relay, RelayTable};
use tracing::{debug, trace, warn};

use crate::{
    Authority, DirBody, DirSource, DirTransport, Error, FetchConfig, HttpTransport,
    RequestError, RequestFailedError, Result, SourceKind,
};

/// Suffix naming the zlib-compressed variant of a resource.
const COMPRESSED_SUFFIX: &str = ".z";

/// Flags a relay must carry to be counted as a directory cache.
const CACHE_FLAGS: &[&str] = &["V2Dir", "Running", "Valid"];

/// Flags a relay must carry to be asked for a document.
const CACHE_PICK_FLAGS: &[&str] = &["V2Dir", "Running", "Valid", "Fast"];

/// A successful fetch: the body and where it came from.
pub struct DirResponse {
    /// The directory that answered.
    source: DirSource,
    /// The (already decompressed) body.
    body: DirBody,
}

impl DirResponse {
    /// Return the directory that answered.
    pub fn source(&self) -> &DirSource {
        &self.source
    }

    /// Split into the source and the body.
    pub fn into_parts(self) -> (DirSource, DirBody) {
        (self.source, self.body)
    }

    /// Return the body.
    pub fn into_body(self) -> DirBody {
        self.body
    }
}

impl fmt::Debug for DirResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirResponse")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Fetches documents from caches, falling back to authorities.
pub struct DirFetcher<T = HttpTransport> {
    /// How we talk to a single directory.
    transport: T,
    /// Authorities to fall back to.  Never empty.
    authorities: Vec<Authority>,
    /// Most attempts per phase.
    max_tries: usize,
    /// If set, skip the cache phase.
    authorities_only: AtomicBool,
}

impl DirFetcher<HttpTransport> {
    /// Build a fetcher that talks HTTP over TCP, configured by `cfg`.
    pub fn from_config(cfg: &FetchConfig) -> Result<Self> {
        Self::with_transport(cfg, HttpTransport::from_config(cfg))
    }
}

impl<T: DirTransport> DirFetcher<T> {
    /// Build a fetcher configured by `cfg` that uses `transport`.
    pub fn with_transport(cfg: &FetchConfig, transport: T) -> Result<Self> {
        Ok(DirFetcher {
            transport,
            authorities: cfg.authorities()?,
            max_tries: cfg.max_tries(),
            authorities_only: AtomicBool::new(cfg.authorities_only()),
        })
    }

    /// Return the transport in use.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Return the authorities we fall back to.
    pub fn authorities(&self) -> &[Authority] {
        &self.authorities
    }

    /// Choose whether to skip directory caches and ask authorities only.
    pub fn set_authorities_only(&self, only: bool) {
        self.authorities_only.store(only, Ordering::Relaxed);
    }

    /// Return true if we are skipping directory caches.
    pub fn authorities_only(&self) -> bool {
        self.authorities_only.load(Ordering::Relaxed)
    }

    /// Fetch `path`, trying caches from `table` and then authorities.
    ///
    /// Caches are only tried if `table` is given and we are not in
    /// authorities-only mode.  Each phase makes at most
    /// `min(candidates, max_tries)` attempts, each against a source chosen
    /// independently at random.
    pub fn fetch<R: Rng + CryptoRng>(
        &self,
        path: &str,
        table: Option<&RelayTable>,
        rng: &mut R,
    ) -> Result<DirResponse> {
        let mut errors = RetryError::in_attempt_to(format!("fetch {}", path));

        if let Some(table) = table.filter(|_| !self.authorities_only()) {
            let n_caches = table.with_flags(CACHE_FLAGS, true).len();
            let tries = n_caches.min(self.max_tries);
            debug!("Trying {} of {} directory caches for {}", tries, n_caches, path);
            for _ in 0..tries {
                let relay = match table.random_with_flags(CACHE_PICK_FLAGS, 0, true, rng) {
                    Ok(relay) => relay,
                    Err(e) => {
                        debug!("No directory cache to ask: {}", e);
                        break;
                    }
                };
                let source = cache_source(relay);
                match self.attempt(relay.dir_port(), &source, path) {
                    Ok(body) => return Ok(DirResponse { source, body }),
                    Err(e) => self.note_failure(&mut errors, source, e, path),
                }
            }
        }

        let tries = self.authorities.len().min(self.max_tries);
        debug!("Trying {} directory authorities for {}", tries, path);
        for _ in 0..tries {
            let auth = &self.authorities[rng.random_range(0..self.authorities.len())];
            let source = auth.dir_source();
            match self.fetch_from(&source, path) {
                Ok(body) => return Ok(DirResponse { source, body }),
                Err(e) => self.note_failure(&mut errors, source, e, path),
            }
        }

        Err(Error::FetchExhausted {
            path: path.to_owned(),
            tries: errors.len(),
            errors,
        })
    }

    /// Make one attempt against a cache, unless it has no directory port.
    fn attempt(
        &self,
        dir_port: u16,
        source: &DirSource,
        path: &str,
    ) -> std::result::Result<DirBody, RequestError> {
        if dir_port == 0 {
            return Err(RequestError::NoDirPort);
        }
        self.fetch_from(source, path)
    }

    /// Log a failed attempt and remember it.
    fn note_failure(
        &self,
        errors: &mut RetryError<RequestFailedError>,
        source: DirSource,
        error: RequestError,
        path: &str,
    ) {
        warn!(
            "Unable to fetch {} from {} {} ({}): {}",
            path,
            source.kind(),
            source.nickname(),
            source.addr(),
            error
        );
        errors.push(RequestFailedError::new(source, error));
    }

    /// Fetch `path` from one directory, negotiating compression.
    ///
    /// A path ending in `.z` is fetched as is and inflated.  For any other
    /// path we first ask for the `.z` variant; if we can't reach the server
    /// we give up on it, and if the server refuses the compressed variant we
    /// ask it for the plain path instead.
    pub fn fetch_from(
        &self,
        source: &DirSource,
        path: &str,
    ) -> std::result::Result<DirBody, RequestError> {
        if path.ends_with(COMPRESSED_SUFFIX) {
            trace!("Fetching {} from {}", path, source);
            let body = self.transport.get(source, path)?;
            return Ok(inflate(body));
        }

        let zpath = format!("{}{}", path, COMPRESSED_SUFFIX);
        trace!("Fetching {} from {}", zpath, source);
        match self.transport.get(source, &zpath) {
            Ok(body) => Ok(inflate(body)),
            Err(e) if e.is_network() => Err(e),
            Err(e) => {
                debug!(
                    "{} refused {}: {}; asking for uncompressed {}",
                    source, zpath, e, path
                );
                self.transport.get(source, path)
            }
        }
    }
}

/// Wrap `body` so that reading from it inflates zlib data.
fn inflate(body: DirBody) -> DirBody {
    Box::new(ZlibDecoder::new(body))
}

/// Describe `relay` as a directory cache.
fn cache_source(relay: &Relay) -> DirSource {
    DirSource::new(
        SourceKind::Cache,
        relay.nickname(),
        std::net::SocketAddr::new(relay.addr(), relay.dir_port()),
    )
}

impl<T> fmt::Debug for DirFetcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirFetcher")
            .field("authorities", &self.authorities.len())
            .field("max_tries", &self.max_tries)
            .field("authorities_only", &self.authorities_only)
            .finish_non_exhaustive()
    }
}
