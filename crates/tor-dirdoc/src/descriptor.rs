//! Router descriptors, as served from `/tor/server/...`.
//!
//! A response may hold any number of descriptors back to back.  Each one
//! starts with a `router` line; [`DescriptorBlocks`] splits a stream at those
//! lines, and [`RouterDescriptor`] pulls out the fields we need from one
//! block.

use std::io::BufRead;

use crate::{Error, Fingerprint, ParsedDocument, Result};

/// Keyword that opens every router descriptor.
const ROUTER_KEYWORD: &str = "router";

/// Return true if `line` opens a new descriptor.
fn starts_descriptor(line: &str) -> bool {
    line.strip_prefix(ROUTER_KEYWORD)
        .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

/// Iterator splitting a stream of concatenated descriptors into the text of
/// each one.
///
/// Anything before the first `router` line is discarded.
#[derive(Debug)]
pub struct DescriptorBlocks<R> {
    /// Where we read lines from.
    reader: R,
    /// The `router` line of the next block, if we have already read it.
    pending: Option<String>,
    /// Set once the reader is exhausted or has failed.
    done: bool,
}

impl<R: BufRead> DescriptorBlocks<R> {
    /// Split the descriptors read from `reader`.
    pub fn new(reader: R) -> Self {
        DescriptorBlocks {
            reader,
            pending: None,
            done: false,
        }
    }

    /// Read one line, without its terminator.  `None` at end of input.
    fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(len);
        Ok(Some(line))
    }
}

impl<R: BufRead> Iterator for DescriptorBlocks<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut block = self.pending.take();
        loop {
            let line = match self.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.done = true;
                    return block.map(Ok);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(Error::from(e)));
                }
            };
            if starts_descriptor(&line) {
                if let Some(finished) = block {
                    self.pending = Some(line);
                    return Some(Ok(finished));
                }
                block = Some(line);
            } else if let Some(b) = block.as_mut() {
                b.push('\n');
                b.push_str(&line);
            }
        }
    }
}

/// The parts of a router descriptor that we use.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct RouterDescriptor {
    /// Nickname from the `router` line.
    pub nickname: String,
    /// Identity from the `fingerprint` line, if there was one.
    pub fingerprint: Option<Fingerprint>,
    /// Base64 body of the `onion-key` object, if present.
    pub onion_key: Option<String>,
    /// Argument of the `ntor-onion-key` line, if present.
    pub ntor_onion_key: Option<String>,
    /// Argument of the `platform` line, if present.
    pub platform: Option<String>,
    /// Every item in the descriptor.
    pub document: ParsedDocument,
}

impl RouterDescriptor {
    /// Extract a descriptor from the text of one block.
    ///
    /// Only the `router` line is required.  A `fingerprint` line that is
    /// present must decode.
    pub fn parse(text: &str) -> Result<Self> {
        let document = ParsedDocument::parse(text);
        let router = document.require(ROUTER_KEYWORD)?;
        let nickname = router
            .split_whitespace()
            .next()
            .ok_or_else(|| Error::MalformedItem(ROUTER_KEYWORD.to_owned()))?
            .to_owned();
        let fingerprint = document
            .get("fingerprint")
            .map(Fingerprint::from_hex)
            .transpose()?;
        let owned = |k: &str| document.get(k).filter(|v| !v.is_empty()).map(str::to_owned);

        Ok(RouterDescriptor {
            nickname,
            fingerprint,
            onion_key: owned("onion-key"),
            ntor_onion_key: owned("ntor-onion-key"),
            platform: owned("platform"),
            document,
        })
    }
}
