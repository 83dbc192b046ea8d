//! Paths of the documents we ask directories for.

use itertools::Itertools;
use tor_dirdoc::Fingerprint;

/// The current consensus.
pub const CONSENSUS_PATH: &str = "/tor/status-vote/current/consensus";

/// Every router descriptor the directory knows, compressed.
pub const ALL_DESCRIPTORS_PATH: &str = "/tor/server/all.z";

/// Return the path for the descriptors of the relays in `fps`.
///
/// Several fingerprints are joined with `+`, as directories expect.
pub fn descriptor_path<'a, I>(fps: I) -> String
where
    I: IntoIterator<Item = &'a Fingerprint>,
{
    format!(
        "/tor/server/fp/{}",
        fps.into_iter().map(Fingerprint::to_hex_upper).join("+")
    )
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
    fn paths() {
        let a = Fingerprint::from_bytes([0xab; 20]);
        let b = Fingerprint::from_bytes([1; 20]);
        assert_eq!(descriptor_path([&a]), format!("/tor/server/fp/{}", "AB".repeat(20)));
        assert_eq!(
            descriptor_path(&[a, b]),
            format!("/tor/server/fp/{}+{}", "AB".repeat(20), "01".repeat(20))
        );
    }
}
