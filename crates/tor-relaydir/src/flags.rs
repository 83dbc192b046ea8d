//! Relay status flags, as listed on consensus `s` lines.
//!
//! Flags we recognize are kept in a compact [`EnumSet`]; any others are kept
//! by name so that callers can still ask for them.

use std::collections::BTreeSet;
use std::fmt::{self, Display};
use std::str::FromStr;

use enumset::{EnumSet, EnumSetType};

/// One recognized relay status flag.
///
/// <https://spec.torproject.org/dir-spec/consensus-formats.html#item:s>
#[derive(Debug, strum::Display, strum::EnumString, strum::IntoStaticStr, EnumSetType)]
#[enumset(repr = "u16")]
#[non_exhaustive]
pub enum RelayFlag {
    /// The relay is a directory authority.
    Authority,
    /// The relay should not be used as the last hop of a circuit.
    BadExit,
    /// The relay allows exits to enough of the network to count as an exit.
    Exit,
    /// The relay's bandwidth is above the authorities' threshold.
    Fast,
    /// The relay is suitable as a first hop.
    Guard,
    /// The relay is on the onion service directory ring.
    HSDir,
    /// The relay should only be used as a middle hop.
    MiddleOnly,
    /// Authorities did not agree on the relay's ed25519 key.
    NoEdConsensus,
    /// The relay is currently reachable.
    Running,
    /// The relay has been up long enough for long-lived circuits.
    Stable,
    /// Authorities want a newer descriptor from this relay.
    StaleDesc,
    /// The relay is allowed on the network.
    Valid,
    /// The relay serves directory documents.
    V2Dir,
}

/// Set of flags asserted about one relay, including unrecognized ones.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelayFlags {
    /// Flags we recognize.
    known: EnumSet<RelayFlag>,
    /// Flags we don't, by name.
    unknown: BTreeSet<String>,
}

impl RelayFlags {
    /// Return an empty set of flags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the flag called `name`.
    pub fn insert(&mut self, name: &str) {
        match RelayFlag::from_str(name) {
            Ok(flag) => {
                self.known.insert(flag);
            }
            Err(_) => {
                self.unknown.insert(name.to_owned());
            }
        }
    }

    /// Return true if the recognized flag `flag` is present.
    pub fn has(&self, flag: RelayFlag) -> bool {
        self.known.contains(flag)
    }

    /// Return true if the flag called `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        match RelayFlag::from_str(name) {
            Ok(flag) => self.has(flag),
            Err(_) => self.unknown.contains(name),
        }
    }

    /// Return true if every flag in `other` is also in `self`.
    pub fn contains_all(&self, other: &RelayFlags) -> bool {
        self.known.is_superset(other.known) && self.unknown.is_superset(&other.unknown)
    }

    /// Return the number of flags present.
    pub fn len(&self) -> usize {
        self.known.len() + self.unknown.len()
    }

    /// Return true if no flags are present.
    pub fn is_empty(&self) -> bool {
        self.known.is_empty() && self.unknown.is_empty()
    }

    /// Iterate over the names of every flag present.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.known
            .iter()
            .map(|f| -> &str { f.into() })
            .chain(self.unknown.iter().map(String::as_str))
    }
}

impl From<EnumSet<RelayFlag>> for RelayFlags {
    fn from(known: EnumSet<RelayFlag>) -> Self {
        RelayFlags {
            known,
            unknown: BTreeSet::new(),
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for RelayFlags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut flags = RelayFlags::new();
        for name in iter {
            flags.insert(name.as_ref());
        }
        flags
    }
}

impl<S: AsRef<str>> Extend<S> for RelayFlags {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for name in iter {
            self.insert(name.as_ref());
        }
    }
}

impl Display for RelayFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for name in self.iter() {
            write!(f, "{}{}", sep, name)?;
            sep = " ";
        }
        Ok(())
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

    #[test]
    fn known_and_unknown() {
        let flags: RelayFlags = ["Running", "Valid", "Fast", "Shiny"].into_iter().collect();
        assert_eq!(flags.len(), 4);
        assert!(flags.has(RelayFlag::Running));
        assert!(flags.contains("Valid"));
        assert!(flags.contains("Shiny"));
        assert!(!flags.contains("Exit"));
        assert!(!flags.contains("running"));
        assert_eq!(flags.to_string(), "Fast Running Valid Shiny");
    }

    #[test]
    fn superset() {
        let have: RelayFlags = ["Exit", "Running", "Valid", "Shiny"].into_iter().collect();
        let want: RelayFlags = ["Running", "Valid"].into_iter().collect();
        assert!(have.contains_all(&want));
        assert!(!want.contains_all(&have));
        assert!(have.contains_all(&RelayFlags::new()));

        let odd: RelayFlags = ["Running", "Dull"].into_iter().collect();
        assert!(!have.contains_all(&odd));
    }

    #[test]
    fn additive() {
        let mut flags = RelayFlags::new();
        assert!(flags.is_empty());
        flags.extend(["Guard"]);
        flags.extend(vec!["Guard".to_owned(), "HSDir".to_owned()]);
        assert_eq!(flags.len(), 2);
        assert_eq!(
            RelayFlags::from(RelayFlag::Guard | RelayFlag::HSDir),
            flags
        );
    }
}
