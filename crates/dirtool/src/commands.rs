//! What each subcommand does.

use anyhow::Result;
use tor_consensus::ConsensusStore;
use tor_dirdoc::{Fingerprint, format_valid_until};
use tor_dirfetch::DirTransport;
use tor_relaydir::{Relay, RelaySelector, RelayTable};
use tracing::info;

use crate::cli::{Command, FlagArgs, LookupArgs};

/// Run `command` against `store`.
pub(crate) fn run<T: DirTransport>(store: &ConsensusStore<T>, command: Command) -> Result<()> {
    let mut rng = rand::rng();
    match command {
        Command::Refresh { force } => {
            let table = store.refresh(force, &mut rng)?;
            println!("{} relays; {}", table.len(), validity(&table));
        }
        Command::List(filter) => {
            let table = store.get_or_init(&mut rng)?;
            for relay in selector(&filter).select(&table) {
                println!("{}", describe(relay));
            }
        }
        Command::Pick { filter, port } => {
            let table = store.get_or_init(&mut rng)?;
            let selector = selector(&filter).with_exit_port(port.unwrap_or(0));
            match selector.pick_random(&table, &mut rng) {
                Ok(relay) => println!("{}", describe(relay)),
                Err(e) => {
                    info!("{}", selector.explain(&table));
                    return Err(e.into());
                }
            }
        }
        Command::Lookup(args) => {
            let table = store.get_or_init(&mut rng)?;
            println!("{}", describe(lookup(&table, &args)?));
        }
        Command::Descriptor { fingerprint } => {
            store.get_or_init(&mut rng)?;
            let text = store.fetch_descriptor([&fingerprint], &mut rng)?;
            print!("{}", text);
            attach_key(store, &fingerprint, &text);
        }
        Command::Descriptors => {
            store.get_or_init(&mut rng)?;
            let summary = store.fetch_all_descriptors(&mut rng)?;
            println!("{}", summary);
            for failure in &summary.failures {
                println!("  {}", report(failure));
            }
        }
    }
    Ok(())
}

/// Build a selector from the `--flags` arguments.
fn selector(args: &FlagArgs) -> RelaySelector {
    RelaySelector::new(args.flag_strs()).exclude_bad_exits(!args.include_bad_exits)
}

/// Find the relay that `args` asks for.
fn lookup<'t>(table: &'t RelayTable, args: &LookupArgs) -> Result<&'t Relay> {
    let relay = match (&args.name, args.addr) {
        (Some(name), _) => table.by_name(name)?,
        (None, Some(addr)) => table.by_addr(addr.ip(), addr.port())?,
        (None, None) => anyhow::bail!("Give --name or --addr"),
    };
    Ok(relay)
}

/// Attach the onion key for `fp` from the descriptor `text` we already
/// downloaded, reporting how that went.
fn attach_key<T: DirTransport>(store: &ConsensusStore<T>, fp: &Fingerprint, text: &str) {
    match store.attach_key_from(fp, text) {
        Ok(()) => info!("Attached onion key for {}", fp),
        Err(e) => info!("No onion key attached for {}: {}", fp, e),
    }
}

/// Describe the validity window of `table`.
fn validity(table: &RelayTable) -> String {
    match table.valid_until().map(format_valid_until) {
        Some(Ok(t)) => format!("valid until {}", t),
        _ => "no valid-until".to_owned(),
    }
}

/// One line about `relay`.
fn describe(relay: &Relay) -> String {
    format!(
        "{} {} {}:{} dir={} [{}]{}",
        relay.nickname(),
        relay.fingerprint().to_hex_upper(),
        relay.addr(),
        relay.or_port(),
        relay.dir_port(),
        relay.flags(),
        relay
            .policy_summary()
            .map(|p| format!(" {}", p))
            .unwrap_or_default()
    )
}

/// Format `e` followed by each of its causes.
fn report(e: &dyn std::error::Error) -> String {
    let mut out = e.to_string();
    let mut cause = e.source();
    while let Some(c) = cause {
        out.push_str(": ");
        out.push_str(&c.to_string());
        cause = c.source();
    }
    out
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
    use std::sync::Mutex;
    use tor_consensus::ConsensusConfig;
    use tor_dirfetch::{DirBody, DirSource, FetchConfig, RequestError};

    const CONSENSUS: &str = "\
valid-until 2099-01-01 03:00:00
r relay1 AQEBAQEBAQEBAQEBAQEBAQEBAQE x 2024-01-01 00:00:00 10.0.0.1 9001 9030
s Fast Running V2Dir Valid
";

    const DESCRIPTOR: &str = "\
router relay1 10.0.0.1 9001 0 9030
fingerprint 0101 0101 0101 0101 0101 0101 0101 0101 0101 0101
onion-key
-----BEGIN RSA PUBLIC KEY-----
MIGJAoGBAOI3UHrlrblEK5YtS1Mle5kt3IT2+2wyVfL4PeOR19WCeABIVojK/xHW
lT21GOGgT3/wNk30ZaJKYj9aGY9rc0jGGWkiMSIebSjcjORWr2wffL98HpoT9UfT
nqYdc6QzqAElo3iDZ6MWdGeswHtVDhqIyzc1sbK61DrENRekCFyjAgMBAAE=
-----END RSA PUBLIC KEY-----
";

    /// A directory that only speaks uncompressed, and remembers every path.
    #[derive(Default)]
    struct PlainDir {
        /// Paths asked for, in order.
        paths: Mutex<Vec<String>>,
    }

    impl DirTransport for PlainDir {
        fn get(&self, _: &DirSource, path: &str) -> Result<DirBody, RequestError> {
            self.paths.lock().unwrap().push(path.to_owned());
            let body = match path {
                "/tor/status-vote/current/consensus" => CONSENSUS,
                "/tor/server/fp/0101010101010101010101010101010101010101" => DESCRIPTOR,
                _ => return Err(RequestError::HttpStatus(Some(404), None)),
            };
            Ok(Box::new(std::io::Cursor::new(body)))
        }
    }

    #[test]
    fn descriptor_downloads_once() {
        let dir = tempfile::tempdir().unwrap();
        let fetch = FetchConfig::builder()
            .authorities(vec![
                "auth orport=443 192.0.2.1:80 0000000000000000000000000000000000000000".into(),
            ])
            .build()
            .unwrap();
        let cfg = ConsensusConfig::builder()
            .cache_dir(dir.path().to_owned())
            .fetch(fetch)
            .build()
            .unwrap();
        let store = ConsensusStore::with_transport(cfg, PlainDir::default()).unwrap();
        let fp = Fingerprint::from_bytes([1; 20]);

        run(&store, Command::Descriptor { fingerprint: fp }).unwrap();

        let paths = store.fetcher().transport().paths.lock().unwrap().clone();
        let descriptor_requests = paths
            .iter()
            .filter(|p| p.starts_with("/tor/server/"))
            .count();
        // One refused compressed request, then the plain one.
        assert_eq!(descriptor_requests, 2);
        let table = store.current().unwrap();
        assert!(table.get(&fp).unwrap().onion_key().is_some());
    }

    #[test]
    fn error_chain() {
        let e = tor_consensus::Error::UnknownRelay(Fingerprint::from_bytes([7; 20]));
        assert!(report(&e).contains("0707"));
    }
}
