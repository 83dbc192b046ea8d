//! The compiled-in directory authorities.
//!
//! Each authority is described by one line:
//!
//! ```text
//! <nickname> orport=<port> [v3ident=<hex>] [ipv6=[addr]:port] [bridge] <ip>:<dirport> <fingerprint...>
//! ```
//!
//! The fingerprint is 40 hex digits, usually written in groups of four.

use std::net::SocketAddr;
use std::str::FromStr;

use itertools::Itertools;
use tor_dirdoc::{Error as DocError, Fingerprint};

use crate::{DirSource, SourceKind};

/// The authorities we fall back to when no cache will serve us.
pub const DEFAULT_AUTHORITY_LINES: &[&str] = &[
    "moria1 orport=9201 v3ident=F533C81CEF0BC0267857C99B2F471ADF249FA232 128.31.0.39:9231 1A25 C633 9E44 6EFC 97C3 93A0 8E37 7AA4 F0B7 2B3C",
    "tor26 orport=443 v3ident=2F3DF9CA0E5D36F2685A2DA67184EB8DCB8CBA8C ipv6=[2a02:16a8:662:2203::1]:443 217.196.147.77:80 847B 1F85 0344 D787 6491 A548 92F9 0493 4E4E B85D",
    "dizum orport=443 v3ident=E8A9C45EDE6D711294FADF8E7951F4DE6CA56B58 ipv6=[2a09:61c0::1337]:443 45.66.35.11:80 7EA6 EAD6 FD83 083C 538F 4403 8BBF A077 587D D755",
    "Serge orport=9001 bridge 66.111.2.131:9030 BA44 A889 E64B 93FA A2B1 14E0 2C2A 279A 8555 C533",
    "gabelmoo orport=443 v3ident=ED03BB616EB2F60BEC80151114BB25CEF515B226 ipv6=[2001:638:a000:4140::ffff:189]:443 131.188.40.189:80 F204 4413 DAC2 E02E 3D6B CF47 35A1 9BCA 1DE9 7281",
    "dannenberg orport=443 v3ident=0232AF901C31A04EE9848595AF9BB7620D4C5B2E ipv6=[2001:678:558:1000::244]:443 193.23.244.244:80 7BE6 83E6 5D48 1413 21C5 ED92 F075 C553 64AC 7123",
    "maatuska orport=80 v3ident=49015F787433103580E3B66A1707A00E60F2D15B ipv6=[2001:67c:289c::9]:80 171.25.193.9:443 BD6A 8292 55CB 08E6 6FBE 7D37 4836 3586 E46B 3810",
    "longclaw orport=443 v3ident=23D15D965BC35114467363C165C4F724B64B4F66 199.58.81.140:80 74A9 1064 6BCE EFBC D2E8 74FC 1DC9 9743 0F96 8145",
    "bastet orport=443 v3ident=27102BC123E7AF1D4741AE047E160C91ADC76B21 ipv6=[2620:13:4000:6000::1000:118]:443 204.13.164.118:80 24E2 F139 121D 4394 C54B 5BCC 368B 3B41 1857 C413",
    "faravahar orport=443 v3ident=70849B868D606BAECFB6128C5E3D782029AA394F ipv6=[2001:470:164:2::2]:443 216.218.219.41:80 E3E4 2D35 F801 C9D5 AB23 584E 0025 D56F E2B3 3396",
];

/// A directory authority, parsed from its line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authority {
    /// Nickname.
    nickname: String,
    /// Onion routing port.
    or_port: u16,
    /// Identity of the authority's v3 signing key, if it votes.
    v3ident: Option<Fingerprint>,
    /// IPv6 OR address, if listed.
    ipv6: Option<SocketAddr>,
    /// True for the bridge authority.
    bridge: bool,
    /// IPv4 directory address.
    dir_addr: SocketAddr,
    /// Relay identity fingerprint.
    fingerprint: Fingerprint,
}

impl Authority {
    /// Return the authority's nickname.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Return the authority's onion routing port.
    pub fn or_port(&self) -> u16 {
        self.or_port
    }

    /// Return the identity of the authority's v3 signing key, if any.
    pub fn v3ident(&self) -> Option<&Fingerprint> {
        self.v3ident.as_ref()
    }

    /// Return the authority's IPv6 OR address, if it listed one.
    pub fn ipv6(&self) -> Option<SocketAddr> {
        self.ipv6
    }

    /// Return true if this is a bridge authority.
    pub fn is_bridge(&self) -> bool {
        self.bridge
    }

    /// Return the address to send directory requests to.
    pub fn dir_addr(&self) -> SocketAddr {
        self.dir_addr
    }

    /// Return the authority's relay identity.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Return this authority as a place to send requests.
    pub fn dir_source(&self) -> DirSource {
        DirSource::new(SourceKind::Authority, &self.nickname, self.dir_addr)
    }
}

impl FromStr for Authority {
    type Err = DocError;

    fn from_str(line: &str) -> Result<Self, DocError> {
        let bad = || DocError::BadAuthority(line.to_owned());
        let mut tokens = line.split_whitespace();
        let nickname = tokens.next().ok_or_else(bad)?.to_owned();

        let mut or_port = None;
        let mut v3ident = None;
        let mut ipv6 = None;
        let mut bridge = false;
        let mut dir_addr = None;
        for tok in tokens.by_ref() {
            if let Some(p) = tok.strip_prefix("orport=") {
                or_port = Some(p.parse().map_err(|_| bad())?);
            } else if let Some(id) = tok.strip_prefix("v3ident=") {
                v3ident = Some(Fingerprint::from_hex(id)?);
            } else if let Some(a) = tok.strip_prefix("ipv6=") {
                ipv6 = Some(a.parse().map_err(|_| bad())?);
            } else if tok == "bridge" {
                bridge = true;
            } else {
                dir_addr = Some(tok.parse().map_err(|_| bad())?);
                break;
            }
        }
        let or_port = or_port.ok_or_else(bad)?;
        let dir_addr = dir_addr.ok_or_else(bad)?;
        let fingerprint = tokens.join("");
        if fingerprint.is_empty() {
            return Err(bad());
        }
        let fingerprint = Fingerprint::from_hex(&fingerprint)?;

        Ok(Authority {
            nickname,
            or_port,
            v3ident,
            ipv6,
            bridge,
            dir_addr,
            fingerprint,
        })
    }
}

/// Parse every line of [`DEFAULT_AUTHORITY_LINES`].
pub fn default_authorities() -> Vec<Authority> {
    DEFAULT_AUTHORITY_LINES
        .iter()
        .map(|line| line.parse().expect("Built-in authority line was unparsable!?"))
        .collect()
}
