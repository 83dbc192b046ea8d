//! Relay identity fingerprints.
//!
//! A consensus lists each relay's identity as the unpadded base64 form of a
//! 20-byte RSA identity digest; descriptors and humans use hex.

use std::fmt::{self, Display};
use std::str::FromStr;

use base64ct::{Base64Unpadded, Encoding as _};

use crate::{Error, Result};

/// Length of a relay identity digest, in bytes.
pub const FINGERPRINT_LEN: usize = 20;

/// The RSA identity digest of a relay.
///
/// Displays as lowercase hex; see [`Fingerprint::to_hex_upper`] for the form
/// used in directory request paths.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Wrap a raw identity digest.
    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Fingerprint(bytes)
    }

    /// Decode the base64 identity field of a consensus `r` line.
    ///
    /// Trailing `=` padding is tolerated but not required.
    pub fn from_base64(s: &str) -> Result<Self> {
        let trimmed = s.trim_end_matches('=');
        let mut out = [0_u8; FINGERPRINT_LEN];
        let decoded = Base64Unpadded::decode(trimmed, &mut out)
            .map_err(|_| Error::BadFingerprint(s.to_owned()))?;
        if decoded.len() != FINGERPRINT_LEN {
            return Err(Error::BadFingerprint(s.to_owned()));
        }
        Ok(Fingerprint(out))
    }

    /// Decode a hex fingerprint, ignoring case and any embedded whitespace.
    ///
    /// This accepts the spaced-out form found on descriptor `fingerprint`
    /// lines as well as a plain 40-digit string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let mut out = [0_u8; FINGERPRINT_LEN];
        hex::decode_to_slice(&compact, &mut out)
            .map_err(|_| Error::BadFingerprint(s.to_owned()))?;
        Ok(Fingerprint(out))
    }

    /// Return the raw digest.
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Return this fingerprint as uppercase hex.
    pub fn to_hex_upper(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl From<[u8; FINGERPRINT_LEN]> for Fingerprint {
    fn from(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Fingerprint(bytes)
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

impl FromStr for Fingerprint {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s.strip_prefix('$').unwrap_or(s))
    }
}
