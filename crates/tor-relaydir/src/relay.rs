//! A single relay, as described by the consensus.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tor_dirdoc::{Fingerprint, PortPolicy, RouterLine};
use tracing::debug;

use crate::{OnionKey, RelayFlag, RelayFlags};

/// Everything the consensus told us about one relay.
///
/// Built with a [`RelayBuilder`] while a consensus is parsed; after that
/// only the onion key can change.
#[derive(Clone, Debug)]
pub struct Relay {
    /// The relay's self-chosen name.
    nickname: String,
    /// The relay's RSA identity digest.  Never changes.
    fingerprint: Fingerprint,
    /// Address for OR and directory connections.
    addr: IpAddr,
    /// Onion routing port.
    or_port: u16,
    /// Directory port, or 0 if the relay has none.
    dir_port: u16,
    /// Status flags from the `s` line.
    flags: RelayFlags,
    /// Software version from the `v` line.
    version: Option<String>,
    /// Exit policy summary from the `p` line, as written.
    policy_summary: Option<String>,
    /// Parsed form of `policy_summary`.
    ///
    /// Rejects everything if the summary was missing or unparsable.
    policy: PortPolicy,
    /// Weight from the `w` line.
    bandwidth: Option<u32>,
    /// Onion key, once a descriptor has been fetched.
    onion_key: Option<Arc<OnionKey>>,
}

impl Relay {
    /// Return the relay's nickname.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Return the relay's identity fingerprint.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Return the relay's address.
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// Return the relay's onion routing port.
    pub fn or_port(&self) -> u16 {
        self.or_port
    }

    /// Return the relay's directory port (0 if it has none).
    pub fn dir_port(&self) -> u16 {
        self.dir_port
    }

    /// Return the address to send directory requests to, if the relay has
    /// a directory port.
    pub fn dir_addr(&self) -> Option<SocketAddr> {
        (self.dir_port != 0).then(|| SocketAddr::new(self.addr, self.dir_port))
    }

    /// Return the relay's flags.
    pub fn flags(&self) -> &RelayFlags {
        &self.flags
    }

    /// Return true if the relay carries the recognized flag `flag`.
    pub fn has_flag(&self, flag: RelayFlag) -> bool {
        self.flags.has(flag)
    }

    /// Return the relay's version string, such as `Tor 0.4.8.9`.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Return the exit policy summary as it appeared in the consensus.
    pub fn policy_summary(&self) -> Option<&str> {
        self.policy_summary.as_deref()
    }

    /// Return the relay's parsed exit policy summary.
    pub fn exit_policy(&self) -> &PortPolicy {
        &self.policy
    }

    /// Return true if the relay's exit policy summary accepts `port`.
    ///
    /// A relay without a usable summary accepts nothing.
    pub fn accepts_exit_port(&self, port: u16) -> bool {
        self.policy.allows_port(port)
    }

    /// Return the relay's consensus weight, if one was listed.
    pub fn bandwidth(&self) -> Option<u32> {
        self.bandwidth
    }

    /// Return the relay's onion key, if it has been fetched.
    pub fn onion_key(&self) -> Option<&OnionKey> {
        self.onion_key.as_deref()
    }

    /// Attach a freshly decoded onion key.
    pub(crate) fn set_onion_key(&mut self, key: OnionKey) {
        self.onion_key = Some(Arc::new(key));
    }
}

/// Accumulates the lines describing one relay until its entry is complete.
#[derive(Clone, Debug)]
pub struct RelayBuilder {
    /// The relay under construction.
    relay: Relay,
}

impl RelayBuilder {
    /// Start a relay from its `r` line.
    pub fn new(r: RouterLine) -> Self {
        RelayBuilder {
            relay: Relay {
                nickname: r.nickname,
                fingerprint: r.fingerprint,
                addr: r.addr,
                or_port: r.or_port,
                dir_port: r.dir_port,
                flags: RelayFlags::new(),
                version: None,
                policy_summary: None,
                policy: PortPolicy::new_reject_all(),
                bandwidth: None,
                onion_key: None,
            },
        }
    }

    /// Return the fingerprint of the relay being built.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.relay.fingerprint
    }

    /// Add flags from an `s` line.  Flags already present are kept.
    pub fn add_flags<I, S>(&mut self, flags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.relay.flags.extend(flags);
        self
    }

    /// Set the exit policy summary from a `p` line.
    ///
    /// An unparsable summary is kept as text but rejects every port.
    pub fn policy_summary(&mut self, summary: String) -> &mut Self {
        self.relay.policy = summary.parse().unwrap_or_else(|e| {
            debug!(
                "Relay {} has unusable policy {:?}: {}",
                self.relay.nickname, summary, e
            );
            PortPolicy::new_reject_all()
        });
        self.relay.policy_summary = Some(summary);
        self
    }

    /// Set the version from a `v` line.
    pub fn version(&mut self, version: String) -> &mut Self {
        self.relay.version = Some(version);
        self
    }

    /// Set the weight from a `w` line.
    pub fn bandwidth(&mut self, bw: u32) -> &mut Self {
        self.relay.bandwidth = Some(bw);
        self
    }

    /// Finish the relay.
    pub fn build(self) -> Relay {
        self.relay
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
    use base64ct::Encoding as _;
    use tor_dirdoc::ConsensusItem;

    /// Build a relay whose fingerprint is `id` repeated, with the given flags
    /// and exit policy summary.
    pub(crate) fn relay(id: u8, name: &str, flags: &str, policy: Option<&str>) -> Relay {
        let mut b = RelayBuilder::new(router_line(id, name));
        b.add_flags(flags.split_whitespace());
        if let Some(p) = policy {
            b.policy_summary(p.to_owned());
        }
        b.build()
    }

    /// Make an `r` line for a relay at 10.0.0.`id`.
    pub(crate) fn router_line(id: u8, name: &str) -> RouterLine {
        let line = format!(
            "r {} {} x 10.0.0.{} 9001 {}",
            name,
            base64ct::Base64Unpadded::encode_string(&[id; 20]),
            id,
            if id % 2 == 0 { 9030 } else { 0 },
        );
        match ConsensusItem::parse_line(&line).unwrap() {
            ConsensusItem::Router(r) => r,
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn build() {
        let mut b = RelayBuilder::new(router_line(2, "two"));
        b.add_flags(["Running", "Valid"])
            .add_flags(["Exit"])
            .version("Tor 0.4.8.9".into())
            .bandwidth(120)
            .policy_summary("accept 80,443".into());
        assert_eq!(b.fingerprint().as_bytes(), &[2; 20]);
        let r = b.build();

        assert_eq!(r.nickname(), "two");
        assert_eq!(r.addr(), "10.0.0.2".parse::<IpAddr>().unwrap());
        assert_eq!(r.or_port(), 9001);
        assert_eq!(r.dir_addr(), Some("10.0.0.2:9030".parse().unwrap()));
        assert!(r.has_flag(RelayFlag::Exit));
        assert_eq!(r.flags().len(), 3);
        assert_eq!(r.version(), Some("Tor 0.4.8.9"));
        assert_eq!(r.bandwidth(), Some(120));
        assert_eq!(r.policy_summary(), Some("accept 80,443"));
        assert!(r.accepts_exit_port(443));
        assert!(!r.accepts_exit_port(22));
        assert!(r.onion_key().is_none());
    }

    #[test]
    fn policy_defaults() {
        let none = relay(1, "one", "Running", None);
        assert_eq!(none.dir_addr(), None);
        assert!(none.policy_summary().is_none());
        for port in [1, 80, 443, 65535] {
            assert!(!none.accepts_exit_port(port));
        }

        let junk = relay(3, "three", "Running", Some("accept eighty"));
        assert_eq!(junk.policy_summary(), Some("accept eighty"));
        assert!(!junk.accepts_exit_port(80));
    }
}
