//! Command-line arguments.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tor_dirdoc::Fingerprint;

/// Fetch, cache, and query the Tor consensus.
#[derive(Clone, Debug, Parser)]
#[command(version)]
pub(crate) struct Cli {
    /// What to do.
    #[command(subcommand)]
    pub(crate) command: Command,

    /// Config file to read.  Defaults to `dirtool.toml`, if it exists.
    #[arg(long, short, global = true, value_name = "FILE")]
    pub(crate) config: Option<PathBuf>,

    /// Override the log filter (for example `debug` or `info,tor_dirfetch=trace`).
    #[arg(long, short, global = true, value_name = "FILTER")]
    pub(crate) log_level: Option<String>,

    /// Directory holding the consensus cache.
    #[arg(long, global = true, value_name = "DIR")]
    pub(crate) cache_dir: Option<PathBuf>,

    /// Never ask directory caches; download from the authorities only.
    #[arg(long, global = true)]
    pub(crate) authorities_only: bool,
}

/// Subcommands.
#[derive(Clone, Debug, Subcommand)]
pub(crate) enum Command {
    /// Load a consensus, from the cache if it is still valid.
    Refresh {
        /// Download even if the cache is valid.
        #[arg(long, short)]
        force: bool,
    },
    /// List relays carrying the given flags.
    List(FlagArgs),
    /// Pick one relay at random.
    Pick {
        /// Which relays to pick from.
        #[command(flatten)]
        filter: FlagArgs,
        /// Only pick relays whose exit policy accepts this port.
        #[arg(long, short)]
        port: Option<u16>,
    },
    /// Find a relay by nickname or by address.
    #[command(arg_required_else_help = true)]
    Lookup(LookupArgs),
    /// Print the descriptor of one relay, and attach its onion key.
    Descriptor {
        /// The relay's identity, in hex.
        fingerprint: Fingerprint,
    },
    /// Download every descriptor and attach onion keys.
    Descriptors,
}

/// Flag requirements shared by `list` and `pick`.
#[derive(Clone, Debug, Args)]
pub(crate) struct FlagArgs {
    /// Comma-separated flags every relay must carry.
    #[arg(long, short = 'F', value_delimiter = ',', default_value = "Running,Valid")]
    pub(crate) flags: Vec<String>,

    /// Also consider relays flagged BadExit.
    #[arg(long)]
    pub(crate) include_bad_exits: bool,
}

impl FlagArgs {
    /// Return the flags as string slices.
    pub(crate) fn flag_strs(&self) -> Vec<&str> {
        self.flags.iter().map(String::as_str).collect()
    }
}

/// How to find a relay.
#[derive(Clone, Debug, Args)]
#[group(required = true, multiple = false)]
pub(crate) struct LookupArgs {
    /// The relay's nickname.
    #[arg(long)]
    pub(crate) name: Option<String>,

    /// The relay's address and onion routing port.
    #[arg(long, value_name = "IP:PORT")]
    pub(crate) addr: Option<SocketAddr>,
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
    fn global_flags() {
        let cli = Cli::parse_from(["dirtool", "refresh"]);
        assert!(matches!(cli.command, Command::Refresh { force: false }));
        assert!(!cli.authorities_only);
        assert_eq!(cli.log_level, None);

        let cli = Cli::parse_from([
            "dirtool",
            "refresh",
            "--force",
            "--authorities-only",
            "-l",
            "debug",
            "--cache-dir",
            "/tmp/c",
        ]);
        assert!(matches!(cli.command, Command::Refresh { force: true }));
        assert!(cli.authorities_only);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/c")));
    }

    #[test]
    fn flags() {
        let cli = Cli::parse_from(["dirtool", "list"]);
        let Command::List(args) = cli.command else {
            panic!()
        };
        assert_eq!(args.flag_strs(), vec!["Running", "Valid"]);
        assert!(!args.include_bad_exits);

        let cli = Cli::parse_from([
            "dirtool",
            "pick",
            "--flags",
            "Fast,Exit",
            "--port",
            "443",
            "--include-bad-exits",
        ]);
        let Command::Pick { filter, port } = cli.command else {
            panic!()
        };
        assert_eq!(filter.flag_strs(), vec!["Fast", "Exit"]);
        assert!(filter.include_bad_exits);
        assert_eq!(port, Some(443));
    }

    #[test]
    fn lookup() {
        let cli = Cli::parse_from(["dirtool", "lookup", "--addr", "10.0.0.1:9001"]);
        let Command::Lookup(args) = cli.command else {
            panic!()
        };
        assert_eq!(args.addr, Some("10.0.0.1:9001".parse().unwrap()));
        assert_eq!(args.name, None);

        assert!(Cli::try_parse_from(["dirtool", "lookup"]).is_err());
        assert!(
            Cli::try_parse_from(["dirtool", "lookup", "--name", "a", "--addr", "1.2.3.4:1"])
                .is_err()
        );
    }

    #[test]
    fn descriptor() {
        let cli = Cli::parse_from([
            "dirtool",
            "descriptor",
            "$0101010101010101010101010101010101010101",
        ]);
        let Command::Descriptor { fingerprint } = cli.command else {
            panic!()
        };
        assert_eq!(fingerprint, Fingerprint::from_bytes([1; 20]));

        assert!(Cli::try_parse_from(["dirtool", "descriptor", "xyz"]).is_err());
    }
}
