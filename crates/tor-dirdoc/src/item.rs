//! Individual lines of a consensus document.
//!
//! A consensus is a long list of items.  We only care about a few of them:
//! the document's `valid-until` time, and, for each relay, the `r` line that
//! introduces it followed by its `s`, `p`, `v` and `w` lines.  Everything
//! else parses as [`ConsensusItem::Ignored`].

use std::net::IpAddr;
use std::time::SystemTime;

use itertools::Itertools;

use crate::{Error, Fingerprint, Result, parse_valid_until};

/// The identifying fields of a relay, from an `r` line.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct RouterLine {
    /// The relay's self-chosen name.  Not unique.
    pub nickname: String,
    /// The relay's RSA identity digest.
    pub fingerprint: Fingerprint,
    /// The relay's IPv4 (or, rarely, IPv6) address.
    pub addr: IpAddr,
    /// Port for onion routing connections.
    pub or_port: u16,
    /// Port for directory requests, or 0 if there is none.
    pub dir_port: u16,
}

/// One line of a consensus, classified by its keyword.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConsensusItem {
    /// `valid-until`: the time after which this consensus is stale.
    ValidUntil(SystemTime),
    /// `r`: the start of a new relay entry.
    Router(RouterLine),
    /// `s`: flags for the current relay.
    Flags(Vec<String>),
    /// `p`: exit policy summary for the current relay, as `accept 80,443`.
    Policy(String),
    /// `v`: software version of the current relay, as `Tor 0.4.8.9`.
    Version(String),
    /// `w`: the current relay's weight from its `Bandwidth=` argument.
    Bandwidth(u32),
    /// Any line whose keyword we don't use.
    Ignored,
}

/// Minimum number of fields (keyword included) on a usable `r` line.
const MIN_ROUTER_FIELDS: usize = 7;

impl ConsensusItem {
    /// Classify a single line.
    ///
    /// Blank lines and unknown keywords give [`ConsensusItem::Ignored`].
    /// A known keyword with too few or unusable arguments gives
    /// [`Error::MalformedItem`] (or [`Error::BadFingerprint`]), which callers
    /// are expected to skip; an unparsable `valid-until` gives
    /// [`Error::MalformedDate`], which they are not.
    pub fn parse_line(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            return Ok(ConsensusItem::Ignored);
        };
        let args: Vec<&str> = tokens.collect();
        let malformed = || Error::MalformedItem(keyword.to_owned());

        Ok(match keyword {
            "valid-until" => ConsensusItem::ValidUntil(parse_valid_until(&args.join(" "))?),
            "r" => {
                if args.len() + 1 < MIN_ROUTER_FIELDS {
                    return Err(malformed());
                }
                let [addr, or_port, dir_port] = &args[args.len() - 3..] else {
                    return Err(malformed());
                };
                ConsensusItem::Router(RouterLine {
                    nickname: args[0].to_owned(),
                    fingerprint: Fingerprint::from_base64(args[1])?,
                    addr: addr.parse().map_err(|_| malformed())?,
                    or_port: or_port.parse().map_err(|_| malformed())?,
                    dir_port: dir_port.parse().map_err(|_| malformed())?,
                })
            }
            "s" => ConsensusItem::Flags(args.iter().map(|s| (*s).to_owned()).collect()),
            "p" | "v" => {
                if args.len() < 2 {
                    return Err(malformed());
                }
                let value = args[..2].iter().join(" ");
                if keyword == "p" {
                    ConsensusItem::Policy(value)
                } else {
                    ConsensusItem::Version(value)
                }
            }
            "w" => {
                let bw = args
                    .iter()
                    .find_map(|a| a.strip_prefix("Bandwidth="))
                    .ok_or_else(malformed)?;
                ConsensusItem::Bandwidth(bw.parse().map_err(|_| malformed())?)
            }
            _ => ConsensusItem::Ignored,
        })
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

    fn router(line: &str) -> RouterLine {
        match ConsensusItem::parse_line(line).unwrap() {
            ConsensusItem::Router(r) => r,
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn short_router_line() {
        let r = router(
            "r Unnamed AAAAAAAAAAAAAAAAAAAAAAAAAAA= AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA 1.2.3.4 9001 9030",
        );
        assert_eq!(r.nickname, "Unnamed");
        assert_eq!(r.fingerprint.to_string(), "0".repeat(40));
        assert_eq!(r.addr, "1.2.3.4".parse::<IpAddr>().unwrap());
        assert_eq!(r.or_port, 9001);
        assert_eq!(r.dir_port, 9030);
    }

    #[test]
    fn full_router_line() {
        let r = router(
            "r seele AAoQ1DAR6kkoo19hBAX5K0QztNw sUtMC4MNoLPiAQ6Yw/3Eu4xjs3A 2038-08-16 03:14:08 104.53.221.159 9001 0",
        );
        assert_eq!(r.nickname, "seele");
        assert_eq!(r.fingerprint.to_hex_upper(), "000A10D43011EA4928A35F610405F92B4433B4DC");
        assert_eq!(r.or_port, 9001);
        assert_eq!(r.dir_port, 0);
    }

    #[test]
    fn bad_router_lines() {
        let too_short = "r Unnamed AAAAAAAAAAAAAAAAAAAAAAAAAAA 1.2.3.4 9001 9030";
        assert!(matches!(
            ConsensusItem::parse_line(too_short),
            Err(Error::MalformedItem(k)) if k == "r"
        ));
        let bad_ip = "r x AAAAAAAAAAAAAAAAAAAAAAAAAAA d 1.2.3 9001 9030";
        assert!(matches!(
            ConsensusItem::parse_line(bad_ip),
            Err(Error::MalformedItem(_))
        ));
        let bad_id = "r x AAAA d 1.2.3.4 9001 9030";
        assert!(matches!(
            ConsensusItem::parse_line(bad_id),
            Err(Error::BadFingerprint(_))
        ));
        let bad_port = "r x AAAAAAAAAAAAAAAAAAAAAAAAAAA d 1.2.3.4 90010 9030";
        assert!(ConsensusItem::parse_line(bad_port).is_err());
    }

    #[test]
    fn attribute_lines() {
        use ConsensusItem as CI;
        assert_eq!(
            CI::parse_line("s Exit Fast Running V2Dir Valid").unwrap(),
            CI::Flags(vec!["Exit".into(), "Fast".into(), "Running".into(), "V2Dir".into(), "Valid".into()])
        );
        assert_eq!(CI::parse_line("s").unwrap(), CI::Flags(vec![]));
        assert_eq!(
            CI::parse_line("p accept 20-23,80,443").unwrap(),
            CI::Policy("accept 20-23,80,443".into())
        );
        assert_eq!(
            CI::parse_line("v Tor 0.4.8.9").unwrap(),
            CI::Version("Tor 0.4.8.9".into())
        );
        assert_eq!(
            CI::parse_line("w Bandwidth=2000 Unmeasured=1").unwrap(),
            CI::Bandwidth(2000)
        );
        assert!(CI::parse_line("p accept").is_err());
        assert!(CI::parse_line("v Tor").is_err());
        assert!(CI::parse_line("w Measured=3").is_err());
    }

    #[test]
    fn dispatch_by_whole_keyword() {
        use ConsensusItem as CI;
        for line in [
            "",
            "   ",
            "valid-after 2024-01-01 00:00:00",
            "params CircuitPriorityHalflifeMsec=30000",
            "shared-rand-current-value 9 AAAA",
            "pr Cons=1-2 Desc=1-2",
            "directory-footer",
        ] {
            assert_eq!(CI::parse_line(line).unwrap(), CI::Ignored, "{line:?}");
        }
    }

    #[test]
    fn valid_until() {
        let expect = humantime::parse_rfc3339("2024-01-01T03:00:00Z").unwrap();
        assert_eq!(
            ConsensusItem::parse_line("valid-until 2024-01-01 03:00:00").unwrap(),
            ConsensusItem::ValidUntil(expect)
        );
        assert!(matches!(
            ConsensusItem::parse_line("valid-until soon"),
            Err(Error::MalformedDate(_))
        ));
    }
}
