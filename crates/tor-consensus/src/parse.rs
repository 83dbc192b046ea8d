//! Build a relay table from the text of a consensus.

use std::io::BufRead;

use tor_dirdoc::ConsensusItem;
use tor_relaydir::{RelayBuilder, RelayTable};
use tracing::{debug, warn};

use crate::cache::CacheWriter;
use crate::{Error, Result};

/// Read a consensus from `reader` and build a table of its relays.
///
/// Each `r` line starts a new relay; the `s`, `p`, `v` and `w` lines after
/// it fill in that relay.  Attribute lines with no relay before them, short
/// or malformed lines, and lines with unknown keywords are skipped.  A
/// `valid-until` line we can't parse is an error, as is a read failure.
pub fn parse_consensus<R: BufRead>(reader: R) -> Result<RelayTable> {
    parse_with_cache(reader, None)
}

/// As [`parse_consensus`], copying every line read to `cache`.
///
/// The cache is committed only once the whole document has been read.  If
/// writing to it fails we warn and carry on without it.
pub(crate) fn parse_with_cache<R: BufRead>(
    mut reader: R,
    mut cache: Option<CacheWriter>,
) -> Result<RelayTable> {
    let mut table = RelayTable::new();
    let mut current: Option<RelayBuilder> = None;
    let mut skipped = 0_usize;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }

        let write_failure = match cache.as_mut() {
            Some(w) => w.write_line(&line).err(),
            None => None,
        };
        if let Some(e) = write_failure {
            warn!("Not caching this consensus: {}", e);
            cache = None;
        }

        match ConsensusItem::parse_line(&line) {
            Ok(ConsensusItem::ValidUntil(t)) => table.set_valid_until(t),
            Ok(ConsensusItem::Router(r)) => {
                if let Some(done) = current.replace(RelayBuilder::new(r)) {
                    table.insert(done.build());
                }
            }
            Ok(ConsensusItem::Flags(flags)) => {
                if let Some(b) = current.as_mut() {
                    b.add_flags(flags);
                }
            }
            Ok(ConsensusItem::Policy(p)) => {
                if let Some(b) = current.as_mut() {
                    b.policy_summary(p);
                }
            }
            Ok(ConsensusItem::Version(v)) => {
                if let Some(b) = current.as_mut() {
                    b.version(v);
                }
            }
            Ok(ConsensusItem::Bandwidth(bw)) => {
                if let Some(b) = current.as_mut() {
                    b.bandwidth(bw);
                }
            }
            Ok(_) => {}
            Err(tor_dirdoc::Error::MalformedDate(d)) => return Err(Error::MalformedDate(d)),
            Err(e) => {
                skipped += 1;
                debug!("Skipping consensus line: {}", e);
                // A bad relay line ends the previous relay; what follows it
                // describes a relay we don't have.
                if line.split_whitespace().next() == Some("r") {
                    if let Some(done) = current.take() {
                        table.insert(done.build());
                    }
                }
            }
        }
    }

    if let Some(done) = current {
        table.insert(done.build());
    }
    if let Some(w) = cache {
        if let Err(e) = w.commit() {
            warn!("Unable to save consensus cache: {}", e);
        }
    }
    debug!(
        "Parsed consensus with {} relays; skipped {} lines",
        table.len(),
        skipped
    );
    Ok(table)
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
    use std::net::IpAddr;
    use tor_dirdoc::Fingerprint;
    use tor_relaydir::RelayFlag;

    const CONSENSUS: &str = "\
network-status-version 3
valid-after 2030-06-01 11:00:00
s Orphan Flags
valid-until 2030-06-01 14:00:00
r Unnamed AAAAAAAAAAAAAAAAAAAAAAAAAAA= AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA 1.2.3.4 9001 9030
s Fast Running Valid
v Tor 0.4.8.9
w Bandwidth=20
r exit1 AQIDBAUGBwgJCgsMDQ4PEBESExQ x 2024-01-01 00:00:00 5.6.7.8 443 0
s Exit Fast Running Stable Valid
p accept 20-23,80,443
r short AAAA 1.2.3.4
s Guard
r badexit AgICAgICAgICAgICAgICAgICAgI x 2024-01-01 00:00:00 9.9.9.9 9001 80
s BadExit Exit Running Valid
p accept 1-65535
params a=1
directory-footer
";

    #[test]
    fn parse_relays() {
        let table = parse_consensus(CONSENSUS.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.valid_until(),
            Some(humantime::parse_rfc3339("2030-06-01T14:00:00Z").unwrap())
        );

        let unnamed = table.get(&Fingerprint::from_bytes([0; 20])).unwrap();
        assert_eq!(unnamed.nickname(), "Unnamed");
        assert_eq!(unnamed.or_port(), 9001);
        assert_eq!(unnamed.dir_port(), 9030);
        assert_eq!(unnamed.version(), Some("Tor 0.4.8.9"));
        assert_eq!(unnamed.bandwidth(), Some(20));
        assert!(unnamed.has_flag(RelayFlag::Fast));
        assert!(!unnamed.accepts_exit_port(80));

        let exit = table.by_name("exit1").unwrap();
        assert_eq!(
            exit.fingerprint().to_string(),
            "0102030405060708090a0b0c0d0e0f1011121314"
        );
        assert_eq!(exit.addr(), "5.6.7.8".parse::<IpAddr>().unwrap());
        assert_eq!(exit.or_port(), 443);
        assert!(exit.accepts_exit_port(22));
        assert!(exit.accepts_exit_port(80));
        assert!(!exit.accepts_exit_port(53));
        assert_eq!(exit.policy_summary(), Some("accept 20-23,80,443"));

        // The flags after the short "r" line went nowhere.
        assert!(!exit.has_flag(RelayFlag::Guard));
        assert!(table.by_name("short").is_err());

        let bad = table.by_name("badexit").unwrap();
        assert!(bad.has_flag(RelayFlag::BadExit));
        assert_eq!(bad.dir_port(), 80);
    }

    #[test]
    fn bad_date_aborts() {
        let doc = "valid-until soon\nr a AAAAAAAAAAAAAAAAAAAAAAAAAAA x 1.2.3.4 9001 9030\n";
        let r = parse_consensus(doc.as_bytes());
        assert!(matches!(r, Err(Error::MalformedDate(ref d)) if d == "soon"));
    }

    #[test]
    fn empty() {
        let table = parse_consensus(&b""[..]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.valid_until(), None);
    }

    #[test]
    fn not_utf8() {
        let r = parse_consensus(&b"r \xff\xfe\n"[..]);
        assert!(matches!(r, Err(Error::Document(_))));
    }
}
