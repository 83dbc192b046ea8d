//! Flag-constrained, exit-port aware relay selection.

use std::fmt;

use rand::{CryptoRng, Rng};
use tracing::debug;

use crate::{Error, Relay, RelayFlag, RelayFlags, RelayTable, Result};

/// How many uniform draws to reject before picking among accepting relays
/// directly.
const MAX_REJECTED_DRAWS: usize = 1024;

/// A description of the relays a caller is willing to use.
///
/// By default a selector requires its flags and refuses relays flagged
/// `BadExit`; it does not care about exit policies.
#[derive(Clone, Debug)]
pub struct RelaySelector {
    /// Flags every selected relay must carry.
    flags: RelayFlags,
    /// Port that the relay's exit policy summary must accept, if any.
    exit_port: Option<u16>,
    /// Whether to refuse relays flagged `BadExit`.
    exclude_bad_exits: bool,
}

impl RelaySelector {
    /// Return a selector for relays carrying every flag in `flags`.
    pub fn new<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RelaySelector {
            flags: flags.into_iter().collect(),
            exit_port: None,
            exclude_bad_exits: true,
        }
    }

    /// Also require that the relay's exit policy accepts `port`.
    ///
    /// Port 0 means "no exit requirement".
    pub fn with_exit_port(mut self, port: u16) -> Self {
        self.exit_port = (port != 0).then_some(port);
        self
    }

    /// Choose whether relays flagged `BadExit` are refused.
    pub fn exclude_bad_exits(mut self, exclude: bool) -> Self {
        self.exclude_bad_exits = exclude;
        self
    }

    /// Return true if `relay` meets every requirement of this selector.
    pub fn permits(&self, relay: &Relay) -> bool {
        self.has_flags(relay) && self.bad_exit_ok(relay) && self.port_ok(relay)
    }

    /// Check the flag requirement.
    fn has_flags(&self, relay: &Relay) -> bool {
        relay.flags().contains_all(&self.flags)
    }

    /// Check the `BadExit` requirement.
    fn bad_exit_ok(&self, relay: &Relay) -> bool {
        !(self.exclude_bad_exits && relay.has_flag(RelayFlag::BadExit))
    }

    /// Check the exit port requirement.
    fn port_ok(&self, relay: &Relay) -> bool {
        self.exit_port
            .is_none_or(|port| relay.accepts_exit_port(port))
    }

    /// Return the relays that pass the flag and `BadExit` requirements,
    /// counting what each requirement rejected.
    fn candidates<'t>(&self, table: &'t RelayTable, info: &mut SelectionInfo) -> Vec<&'t Relay> {
        table
            .iter()
            .filter(|r| info.by_flags.count(self.has_flags(r)))
            .filter(|r| info.by_bad_exit.count(self.bad_exit_ok(r)))
            .collect()
    }

    /// Return every relay in `table` that this selector permits, in
    /// fingerprint order.
    pub fn select<'t>(&self, table: &'t RelayTable) -> Vec<&'t Relay> {
        table.iter().filter(|r| self.permits(r)).collect()
    }

    /// Report how many relays in `table` each requirement turns away.
    pub fn explain(&self, table: &RelayTable) -> SelectionInfo {
        let mut info = SelectionInfo::new(self.exit_port);
        let candidates = self.candidates(table, &mut info);
        if let Some(port) = self.exit_port {
            for r in candidates {
                info.by_exit_port.count(r.accepts_exit_port(port));
            }
        }
        info
    }

    /// Pick one permitted relay from `table` uniformly at random.
    ///
    /// We draw from the relays with the right flags and reject draws whose
    /// exit policy refuses our port.  If nothing accepts the port we fail up
    /// front; if we are unlucky for long enough we pick among the accepting
    /// relays directly, which gives the same distribution.
    pub fn pick_random<'t, R: Rng + CryptoRng>(
        &self,
        table: &'t RelayTable,
        rng: &mut R,
    ) -> Result<&'t Relay> {
        let mut info = SelectionInfo::new(self.exit_port);
        let candidates = self.candidates(table, &mut info);
        let fail = |info: SelectionInfo| {
            debug!("Relay selection failed: {}", info);
            Error::NoMatchingRelay(info.to_string())
        };
        if candidates.is_empty() {
            return Err(fail(info));
        }

        let Some(port) = self.exit_port else {
            return Ok(candidates[rng.random_range(0..candidates.len())]);
        };

        let n_accepting = candidates
            .iter()
            .filter(|r| info.by_exit_port.count(r.accepts_exit_port(port)))
            .count();
        if n_accepting == 0 {
            return Err(fail(info));
        }

        for _ in 0..MAX_REJECTED_DRAWS {
            let relay = candidates[rng.random_range(0..candidates.len())];
            if relay.accepts_exit_port(port) {
                return Ok(relay);
            }
        }
        debug!(
            "{} draws rejected for port {}; choosing among {} accepting relays",
            MAX_REJECTED_DRAWS, port, n_accepting
        );
        let accepting: Vec<&Relay> = candidates
            .into_iter()
            .filter(|r| r.accepts_exit_port(port))
            .collect();
        Ok(accepting[rng.random_range(0..accepting.len())])
    }
}

/// How many relays one requirement let through and turned away.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct FilterCount {
    /// Relays accepted.
    n_accepted: usize,
    /// Relays rejected.
    n_rejected: usize,
}

impl FilterCount {
    /// Record `accepted` and return it.
    fn count(&mut self, accepted: bool) -> bool {
        if accepted {
            self.n_accepted += 1;
        } else {
            self.n_rejected += 1;
        }
        accepted
    }
}

/// A record of which requirement turned away how many relays during one
/// selection.
#[derive(Clone, Debug)]
pub struct SelectionInfo {
    /// Outcome of the flag requirement.
    by_flags: FilterCount,
    /// Outcome of the `BadExit` requirement.
    by_bad_exit: FilterCount,
    /// Outcome of the exit port requirement, if there was one.
    by_exit_port: FilterCount,
    /// The exit port we required.
    exit_port: Option<u16>,
}

impl SelectionInfo {
    /// Return an empty record for a selection requiring `exit_port`.
    fn new(exit_port: Option<u16>) -> Self {
        SelectionInfo {
            by_flags: FilterCount::default(),
            by_bad_exit: FilterCount::default(),
            by_exit_port: FilterCount::default(),
            exit_port,
        }
    }
}

impl fmt::Display for SelectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let port_desc = self.exit_port.map(|p| format!("refusing port {}", p));
        let parts = [
            (self.by_flags, Some("lacking flags".to_owned())),
            (self.by_bad_exit, Some("BadExit".to_owned())),
            (self.by_exit_port, port_desc),
        ];
        write!(f, "rejected ")?;
        let mut sep = "";
        let mut any = false;
        for (count, desc) in parts {
            let Some(desc) = desc else { continue };
            if count.n_rejected == 0 {
                continue;
            }
            write!(
                f,
                "{}{}/{} as {}",
                sep,
                count.n_rejected,
                count.n_accepted + count.n_rejected,
                desc
            )?;
            sep = "; ";
            any = true;
        }
        if !any {
            write!(f, "none")?;
        }
        Ok(())
    }
}
