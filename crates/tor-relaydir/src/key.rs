//! Onion keys, attached to relays once their descriptors are fetched.

use std::fmt;

use base64ct::{Base64, Base64Unpadded, Encoding as _};
use rsa::pkcs1::DecodeRsaPublicKey as _;
use rsa::traits::PublicKeyParts as _;

use crate::{Error, Result};

/// A relay's RSA onion key: the raw DER bytes and the decoded key.
#[derive(Clone, PartialEq, Eq)]
pub struct OnionKey {
    /// PKCS#1 DER encoding, as found in the descriptor.
    der: Vec<u8>,
    /// The decoded public key.
    key: rsa::RsaPublicKey,
}

impl OnionKey {
    /// Decode a PKCS#1 `RSAPublicKey` from its DER bytes.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let key = rsa::RsaPublicKey::from_pkcs1_der(der)
            .map_err(|e| Error::KeyDecode(e.to_string()))?;
        Ok(OnionKey {
            der: der.to_vec(),
            key,
        })
    }

    /// Decode the base64 body of a descriptor's `onion-key` object.
    ///
    /// Padding is optional.
    pub fn from_base64(s: &str) -> Result<Self> {
        let s = s.trim();
        let der = if s.ends_with('=') {
            Base64::decode_vec(s)
        } else {
            Base64Unpadded::decode_vec(s)
        }
        .map_err(|e| Error::KeyDecode(e.to_string()))?;
        Self::from_der(&der)
    }

    /// Return the DER encoding of this key.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Return the decoded key.
    pub fn public_key(&self) -> &rsa::RsaPublicKey {
        &self.key
    }

    /// Return the size of the modulus, in bits.
    pub fn bits(&self) -> usize {
        self.key.n().bits()
    }
}

impl fmt::Debug for OnionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OnionKey({} bits)", self.bits())
    }
}

#[cfg(test)]
pub(crate) mod test {
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

    /// A 1024-bit onion key, as it appears in a descriptor.
    pub(crate) const ONION_KEY: &str = "\
MIGJAoGBAOI3UHrlrblEK5YtS1Mle5kt3IT2+2wyVfL4PeOR19WCeABIVojK/xHW\
lT21GOGgT3/wNk30ZaJKYj9aGY9rc0jGGWkiMSIebSjcjORWr2wffL98HpoT9UfT\
nqYdc6QzqAElo3iDZ6MWdGeswHtVDhqIyzc1sbK61DrENRekCFyjAgMBAAE=";

    #[test]
    fn decode() {
        let key = OnionKey::from_base64(ONION_KEY).unwrap();
        assert_eq!(key.bits(), 1024);
        assert_eq!(key.as_der().len(), 140);
        assert_eq!(format!("{:?}", key), "OnionKey(1024 bits)");

        let again = OnionKey::from_der(key.as_der()).unwrap();
        assert_eq!(again, key);
    }

    #[test]
    fn decode_errors() {
        assert!(matches!(
            OnionKey::from_base64("not base64!"),
            Err(Error::KeyDecode(_))
        ));
        // Valid base64, but not a key.
        assert!(matches!(
            OnionKey::from_base64("AAAA"),
            Err(Error::KeyDecode(_))
        ));
        assert!(OnionKey::from_der(&[]).is_err());
    }
}
