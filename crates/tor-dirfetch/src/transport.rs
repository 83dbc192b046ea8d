//! Sending one request to one directory.

use std::io::{BufReader, Read, Write as _};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::util::{encode_request, read_headers};
use crate::{DirSource, FetchConfig, RequestError};

/// A response body, positioned after the HTTP headers.
pub type DirBody = Box<dyn Read + Send>;

/// Something that can send a GET request to a directory server.
///
/// Implementations report failures to reach the server at all as
/// [`RequestError::NetworkUnavailable`]; the retry logic treats those
/// differently from other failures.
pub trait DirTransport: Send + Sync {
    /// Ask `source` for `path` and return the body of a 200 response.
    fn get(&self, source: &DirSource, path: &str) -> Result<DirBody, RequestError>;
}

impl<T: DirTransport + ?Sized> DirTransport for Arc<T> {
    fn get(&self, source: &DirSource, path: &str) -> Result<DirBody, RequestError> {
        (**self).get(source, path)
    }
}

/// Blocking HTTP/1.0 over a direct TCP connection.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    /// Limit on establishing the connection.
    connect_timeout: Duration,
    /// Limit on any single read or write.
    read_timeout: Duration,
}

impl HttpTransport {
    /// Return a transport with the given timeouts.
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        HttpTransport {
            connect_timeout,
            read_timeout,
        }
    }

    /// Return a transport using the timeouts from `cfg`.
    pub fn from_config(cfg: &FetchConfig) -> Self {
        Self::new(cfg.connect_timeout(), cfg.read_timeout())
    }
}

impl DirTransport for HttpTransport {
    fn get(&self, source: &DirSource, path: &str) -> Result<DirBody, RequestError> {
        let req = http::Request::builder()
            .method("GET")
            .uri(path)
            .body(())?;

        trace!("Connecting to {} for {}", source, path);
        let network = |e| RequestError::NetworkUnavailable(Arc::new(e));
        let mut stream =
            TcpStream::connect_timeout(&source.addr(), self.connect_timeout).map_err(network)?;
        stream.set_read_timeout(Some(self.read_timeout))?;
        stream.set_write_timeout(Some(self.read_timeout))?;
        stream
            .write_all(encode_request(&req).as_bytes())
            .map_err(network)?;

        let mut reader = BufReader::new(stream);
        read_headers(&mut reader).map_err(lost_connection)?;
        Ok(Box::new(reader))
    }
}

/// Reclassify an IO error that means the connection went away, or the
/// server stopped answering, as a network failure.
fn lost_connection(err: RequestError) -> RequestError {
    use std::io::ErrorKind as K;
    match err {
        RequestError::Io(e)
            if matches!(
                e.kind(),
                K::TimedOut
                    | K::WouldBlock
                    | K::ConnectionReset
                    | K::ConnectionAborted
                    | K::BrokenPipe
                    | K::NotConnected
            ) =>
        {
            RequestError::NetworkUnavailable(e)
        }
        other => other,
    }
}
