//! The table of every relay in one consensus.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::SystemTime;

use rand::{CryptoRng, Rng};
use tor_dirdoc::Fingerprint;

use crate::{Error, OnionKey, Relay, RelaySelector, Result};

/// Every relay from one consensus, ordered by fingerprint, plus the time
/// after which the consensus is stale.
#[derive(Clone, Debug, Default)]
pub struct RelayTable {
    /// Relays by identity.
    relays: BTreeMap<Fingerprint, Relay>,
    /// End of the consensus's validity window, once known.
    valid_until: Option<SystemTime>,
}

impl RelayTable {
    /// Return a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `relay`, returning any relay it replaced.
    pub fn insert(&mut self, relay: Relay) -> Option<Relay> {
        self.relays.insert(*relay.fingerprint(), relay)
    }

    /// Return the relay with identity `fp`, if any.
    pub fn get(&self, fp: &Fingerprint) -> Option<&Relay> {
        self.relays.get(fp)
    }

    /// Return true if a relay with identity `fp` is present.
    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.relays.contains_key(fp)
    }

    /// Return the number of relays.
    pub fn len(&self) -> usize {
        self.relays.len()
    }

    /// Return true if there are no relays.
    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    /// Iterate over every relay, in fingerprint order.
    pub fn iter(&self) -> impl Iterator<Item = &Relay> + '_ {
        self.relays.values()
    }

    /// Return the end of this table's validity window, if known.
    pub fn valid_until(&self) -> Option<SystemTime> {
        self.valid_until
    }

    /// Record the end of this table's validity window.
    pub fn set_valid_until(&mut self, when: SystemTime) {
        self.valid_until = Some(when);
    }

    /// Return true if the table is still valid at `now`.
    ///
    /// A table without a known validity window is never valid.
    pub fn is_valid_at(&self, now: SystemTime) -> bool {
        self.valid_until.is_some_and(|until| until > now)
    }

    /// Find a relay by nickname.
    ///
    /// Nicknames are not unique; this returns the first match in
    /// fingerprint order.
    pub fn by_name(&self, nickname: &str) -> Result<&Relay> {
        self.iter()
            .find(|r| r.nickname() == nickname)
            .ok_or_else(|| Error::NicknameNotFound(nickname.to_owned()))
    }

    /// Find a relay by address and onion routing port.
    pub fn by_addr(&self, addr: IpAddr, or_port: u16) -> Result<&Relay> {
        self.iter()
            .find(|r| r.addr() == addr && r.or_port() == or_port)
            .ok_or(Error::AddrNotFound(addr, or_port))
    }

    /// Attach `key` to the relay with identity `fp`.
    ///
    /// Returns false (and drops the key) if there is no such relay.
    pub fn attach_onion_key(&mut self, fp: &Fingerprint, key: OnionKey) -> bool {
        match self.relays.get_mut(fp) {
            Some(relay) => {
                relay.set_onion_key(key);
                true
            }
            None => false,
        }
    }

    /// Return every relay carrying all of `flags`.
    ///
    /// Relays flagged `BadExit` are left out if `exclude_bad_exits` is set.
    pub fn with_flags(&self, flags: &[&str], exclude_bad_exits: bool) -> Vec<&Relay> {
        RelaySelector::new(flags)
            .exclude_bad_exits(exclude_bad_exits)
            .select(self)
    }

    /// Pick a random relay carrying all of `flags`.
    ///
    /// If `exit_port` is nonzero, the relay's exit policy must accept it.
    /// Relays flagged `BadExit` are left out if `exclude_bad_exits` is set.
    pub fn random_with_flags<R: Rng + CryptoRng>(
        &self,
        flags: &[&str],
        exit_port: u16,
        exclude_bad_exits: bool,
        rng: &mut R,
    ) -> Result<&Relay> {
        RelaySelector::new(flags)
            .with_exit_port(exit_port)
            .exclude_bad_exits(exclude_bad_exits)
            .pick_random(self, rng)
    }
}

impl FromIterator<Relay> for RelayTable {
    fn from_iter<I: IntoIterator<Item = Relay>>(iter: I) -> Self {
        let mut table = RelayTable::new();
        for relay in iter {
            table.insert(relay);
        }
        table
    }
}
