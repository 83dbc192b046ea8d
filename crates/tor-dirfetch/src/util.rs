//! Helper functions for speaking just enough HTTP to a directory.

use std::fmt::Write as _;
use std::io::BufRead;

use crate::RequestError;

/// Longest status line or header line we will accept.
const MAX_HEADER_LINE: usize = 2048;

/// Most total header bytes we will accept.
const MAX_HEADER_BYTES: usize = 16384;

/// Encode an HTTP request in a quick and dirty HTTP 1.0 format.
pub(crate) fn encode_request(req: &http::Request<()>) -> String {
    let mut s = format!("{} {} HTTP/1.0\r\n", req.method(), req.uri());
    for (key, val) in req.headers() {
        let _ = write!(s, "{}: {}\r\n", key, String::from_utf8_lossy(val.as_bytes()));
    }
    s.push_str("\r\n");
    s
}

/// Read bytes from `stream` into `buf` until `byte` has been read, the
/// stream is at EOF, or `max` bytes have been read.
///
/// Return the number of bytes added.
fn read_until_limited<S: BufRead>(
    stream: &mut S,
    byte: u8,
    max: usize,
    buf: &mut Vec<u8>,
) -> std::io::Result<usize> {
    let mut n_added = 0;
    loop {
        let data = stream.fill_buf()?;
        if data.is_empty() {
            return Ok(n_added);
        }
        let (available, found_byte) = match data.iter().position(|b| *b == byte) {
            Some(idx) => (idx + 1, true),
            None => (data.len(), false),
        };
        let n_to_copy = std::cmp::min(max - n_added, available);
        buf.extend_from_slice(&data[..n_to_copy]);
        stream.consume(n_to_copy);
        n_added += n_to_copy;
        if found_byte || n_added == max {
            return Ok(n_added);
        }
    }
}

/// Read and check the status line and headers of an HTTP response.
///
/// On success, `stream` is left at the start of the body.
pub(crate) fn read_headers<S: BufRead>(stream: &mut S) -> Result<(), RequestError> {
    let mut buf = Vec::with_capacity(1024);

    loop {
        let n = read_until_limited(stream, b'\n', MAX_HEADER_LINE, &mut buf)?;

        let mut headers = [httparse::EMPTY_HEADER; 32];
        let mut response = httparse::Response::new(&mut headers);

        match response.parse(&buf[..])? {
            httparse::Status::Partial => {
                if n == 0 {
                    return Err(RequestError::TruncatedHeaders);
                }
                if buf.len() >= MAX_HEADER_BYTES {
                    return Err(httparse::Error::TooManyHeaders.into());
                }
            }
            httparse::Status::Complete(_) => {
                if response.code != Some(200) {
                    return Err(RequestError::HttpStatus(
                        response.code,
                        response.reason.map(str::to_owned),
                    ));
                }
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod test {
    // @@ begin test lint list maintained by maint/add_warning @@
    #![allow(clippy::bool_assert_comparison)]
    #![allow(clippy::clone_on_copy)]
    #![allow(clippy::dbg_macro)]
    #![allow(clippy::mixed_attributes_style)]
    #![allow(clippy::print_stderr)]
    #![allow(clippy::print_stdout)]
    #![allow(clippy::single_char_pattern)]
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::unchecked_time_subtraction)]
    #![allow(clippy::useless_vec)]
    #![allow(clippy::needless_pass_by_value)]
    //! <!-- @@ end test lint list maintained by maint/add_warning @@ -->
    use super::*;
    use std::io::Read;

    #[test]
    fn format() {
        let req = http::Request::builder()
            .method("GET")
            .uri("/tor/server/all.z")
            .body(())
            .unwrap();
        assert_eq!(encode_request(&req), "GET /tor/server/all.z HTTP/1.0\r\n\r\n");

        let req = http::Request::builder()
            .uri("/tor/status-vote/current/consensus")
            .header("X-Marsupial", "Opossum")
            .body(())
            .unwrap();
        assert_eq!(
            encode_request(&req),
            "GET /tor/status-vote/current/consensus HTTP/1.0\r\nx-marsupial: Opossum\r\n\r\n"
        );
    }

    #[test]
    fn headers_ok() {
        let mut s = &b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\nbody\nmore"[..];
        read_headers(&mut s).unwrap();
        let mut rest = String::new();
        s.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "body\nmore");
    }

    #[test]
    fn headers_bad() {
        let mut s = &b"HTTP/1.0 404 Not found\r\n\r\n"[..];
        assert!(matches!(
            read_headers(&mut s),
            Err(RequestError::HttpStatus(Some(404), Some(r))) if r == "Not found"
        ));

        let mut s = &b"HTTP/1.0 200 OK\r\nContent-Type: text"[..];
        assert!(matches!(read_headers(&mut s), Err(RequestError::TruncatedHeaders)));

        let mut s = &b"\x00\x01garbage\r\n\r\n"[..];
        assert!(matches!(read_headers(&mut s), Err(RequestError::Httparse(_))));
    }
}
