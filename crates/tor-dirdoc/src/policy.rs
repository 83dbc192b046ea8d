//! Summarized exit policies, as found on `p` lines of a consensus.
//!
//! A summary is `accept` or `reject` followed by a comma-separated list of
//! ports and port ranges.  It only says which ports a relay will exit to for
//! *most* addresses, so it can tell us what is probably allowed, never what is
//! definitely allowed.

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::Error;

/// An inclusive range of ports, never containing port 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortRange {
    /// Lowest port in the range.
    lo: u16,
    /// Highest port in the range.
    hi: u16,
}

impl PortRange {
    /// Every port from 1 through 65535.
    pub const ALL: PortRange = PortRange { lo: 1, hi: 65535 };

    /// Make a range from `lo` through `hi`, if that is a valid range.
    pub fn new(lo: u16, hi: u16) -> Option<Self> {
        (lo != 0 && lo <= hi).then_some(PortRange { lo, hi })
    }

    /// Return the lowest port in this range.
    pub fn lo(&self) -> u16 {
        self.lo
    }

    /// Return the highest port in this range.
    pub fn hi(&self) -> u16 {
        self.hi
    }

    /// Return true if `port` is in this range.
    pub fn contains(&self, port: u16) -> bool {
        self.lo <= port && port <= self.hi
    }

    /// Where this range sits relative to `port`, for binary search.
    fn compare_to_port(&self, port: u16) -> Ordering {
        if port < self.lo {
            Ordering::Greater
        } else if port > self.hi {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }
}

impl Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lo == self.hi {
            write!(f, "{}", self.lo)
        } else {
            write!(f, "{}-{}", self.lo, self.hi)
        }
    }
}

impl FromStr for PortRange {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Error> {
        let bad = || Error::BadPolicy(s.to_owned());
        let s = s.trim();
        if s == "*" {
            return Ok(PortRange::ALL);
        }
        let (lo, hi) = match s.split_once('-') {
            Some((lo, hi)) => (lo, hi),
            None => (s, s),
        };
        let lo: u16 = lo.parse().map_err(|_| bad())?;
        let hi: u16 = hi.parse().map_err(|_| bad())?;
        PortRange::new(lo, hi).ok_or_else(bad)
    }
}

/// A set of ports that a relay is willing to exit to.
///
/// # Examples
/// ```
/// use tor_dirdoc::PortPolicy;
/// let policy: PortPolicy = "accept 20-23,80,443".parse().unwrap();
///
/// assert!(policy.allows_port(22));
/// assert!(policy.allows_port(80));
/// assert!(!policy.allows_port(53));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortPolicy {
    /// The ranges that are allowed.
    ///
    /// Sorted, disjoint, and with adjacent ranges merged.
    allowed: Vec<PortRange>,
}

impl PortPolicy {
    /// Return a policy that rejects every port.
    ///
    /// This is what a relay without any policy summary gets.
    pub fn new_reject_all() -> Self {
        PortPolicy {
            allowed: Vec::new(),
        }
    }

    /// Build a policy allowing exactly the ports in `ranges`, in any order,
    /// possibly overlapping.
    fn from_ranges(mut ranges: Vec<PortRange>) -> Self {
        ranges.sort();
        let mut allowed: Vec<PortRange> = Vec::with_capacity(ranges.len());
        for r in ranges {
            match allowed.last_mut() {
                Some(prev) if u32::from(r.lo) <= u32::from(prev.hi) + 1 => {
                    prev.hi = prev.hi.max(r.hi);
                }
                _ => allowed.push(r),
            }
        }
        PortPolicy { allowed }
    }

    /// Replace this policy with its complement over 1..=65535.
    fn invert(&mut self) {
        let mut next_lo: u32 = 1;
        let mut inverted = Vec::new();
        for r in &self.allowed {
            if u32::from(r.lo) > next_lo {
                inverted.push(PortRange {
                    lo: next_lo as u16,
                    hi: r.lo - 1,
                });
            }
            next_lo = u32::from(r.hi) + 1;
        }
        if next_lo <= 65535 {
            inverted.push(PortRange {
                lo: next_lo as u16,
                hi: 65535,
            });
        }
        self.allowed = inverted;
    }

    /// Return true iff `port` is allowed by this policy.
    pub fn allows_port(&self, port: u16) -> bool {
        self.allowed
            .binary_search_by(|range| range.compare_to_port(port))
            .is_ok()
    }

    /// Return true if this policy allows any port at all.
    pub fn allows_some_port(&self) -> bool {
        !self.allowed.is_empty()
    }

    /// Iterate over the allowed ranges, lowest first.
    pub fn allowed_ranges(&self) -> impl Iterator<Item = &PortRange> + '_ {
        self.allowed.iter()
    }
}

impl Default for PortPolicy {
    fn default() -> Self {
        Self::new_reject_all()
    }
}

impl Display for PortPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.allowed.is_empty() {
            return write!(f, "reject 1-65535");
        }
        write!(f, "accept ")?;
        let mut comma = "";
        for range in &self.allowed {
            write!(f, "{}{}", comma, range)?;
            comma = ",";
        }
        Ok(())
    }
}

impl FromStr for PortPolicy {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Error> {
        let (verb, list) = s
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(|| Error::BadPolicy(s.to_owned()))?;
        let invert = match verb {
            "accept" => false,
            "reject" => true,
            _ => return Err(Error::BadPolicy(s.to_owned())),
        };
        let ranges = list
            .split(',')
            .map(str::parse)
            .collect::<Result<Vec<PortRange>, Error>>()?;
        let mut policy = PortPolicy::from_ranges(ranges);
        if invert {
            policy.invert();
        }
        Ok(policy)
    }
}
