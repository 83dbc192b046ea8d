//! The consensus store: the current relay table, and how it gets replaced.

use std::fmt;
use std::io::{BufReader, Read as _};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use rand::{CryptoRng, Rng};
use tor_dirdoc::{DescriptorBlocks, Fingerprint, RouterDescriptor};
use tor_dirfetch::{
    ALL_DESCRIPTORS_PATH, CONSENSUS_PATH, DirFetcher, DirSource, DirTransport, HttpTransport,
    RequestFailedError, descriptor_path,
};
use tor_relaydir::{OnionKey, RelayTable};
use tracing::{debug, info, trace, warn};

use crate::cache::{self, CACHE_FILE, CacheWriter};
use crate::parse::parse_with_cache;
use crate::shared::SharedMutArc;
use crate::{ConsensusConfig, Error, Result, parse_consensus};

/// The outcome of [`ConsensusStore::fetch_all_descriptors`].
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct DescriptorReport {
    /// Relays that had an onion key attached.
    pub updated: usize,
    /// Descriptors for relays that are not in the current table.
    pub unknown: usize,
    /// Descriptors we could not use, one error each.
    pub failures: Vec<Error>,
}

impl fmt::Display for DescriptorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attached {} onion keys; skipped {} unknown relays; {} unusable descriptors",
            self.updated,
            self.unknown,
            self.failures.len()
        )
    }
}

/// Owner of the current consensus.
///
/// There is at most one current [`RelayTable`].  [`refresh`](Self::refresh)
/// builds a new one, from the disk cache or the network, and swaps it in
/// whole; [`current`](Self::current) hands out `Arc`s to whichever table is
/// current, and those stay usable after a refresh.  Only one refresh runs at
/// a time.
pub struct ConsensusStore<T = HttpTransport> {
    /// Our configuration.
    config: ConsensusConfig,
    /// How we download documents.
    fetcher: DirFetcher<T>,
    /// The current table, if any.
    current: SharedMutArc<RelayTable>,
    /// Held for the duration of a refresh.
    refresh_gate: Mutex<()>,
}

impl ConsensusStore<HttpTransport> {
    /// Make a store that downloads over plain TCP.
    pub fn from_config(config: ConsensusConfig) -> Result<Self> {
        let transport = HttpTransport::from_config(config.fetch());
        Self::with_transport(config, transport)
    }
}

impl<T: DirTransport> ConsensusStore<T> {
    /// Make a store that downloads with `transport`.
    ///
    /// No consensus is loaded until [`get_or_init`](Self::get_or_init) or
    /// [`refresh`](Self::refresh) is called.
    pub fn with_transport(config: ConsensusConfig, transport: T) -> Result<Self> {
        let fetcher = DirFetcher::with_transport(config.fetch(), transport)?;
        Ok(ConsensusStore {
            config,
            fetcher,
            current: SharedMutArc::new(),
            refresh_gate: Mutex::new(()),
        })
    }

    /// Return our configuration.
    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Return the fetcher we download with.
    pub fn fetcher(&self) -> &DirFetcher<T> {
        &self.fetcher
    }

    /// Return the location of the cache file.
    pub fn cache_path(&self) -> PathBuf {
        self.config.cache_dir().join(CACHE_FILE)
    }

    /// Return the current table, if one has been loaded.
    pub fn current(&self) -> Option<Arc<RelayTable>> {
        self.current.get()
    }

    /// Return true if there is a current table and it is valid at `now`.
    pub fn is_valid(&self, now: SystemTime) -> bool {
        self.current().is_some_and(|t| t.is_valid_at(now))
    }

    /// Choose whether downloads skip directory caches.
    pub fn set_authorities_only(&self, only: bool) {
        self.fetcher.set_authorities_only(only);
    }

    /// Return the current table, loading one first if there is none.
    pub fn get_or_init<R: Rng + CryptoRng>(&self, rng: &mut R) -> Result<Arc<RelayTable>> {
        if let Some(table) = self.current() {
            return Ok(table);
        }
        let _gate = self.lock_gate();
        // Somebody else may have loaded one while we waited.
        if let Some(table) = self.current() {
            return Ok(table);
        }
        self.load(false, rng)
    }

    /// Build a new table and make it current.
    ///
    /// Unless `force` is set, a still-valid disk cache is used in preference
    /// to the network.  On failure the previous table, if any, stays
    /// current.
    pub fn refresh<R: Rng + CryptoRng>(&self, force: bool, rng: &mut R) -> Result<Arc<RelayTable>> {
        let _gate = self.lock_gate();
        self.load(force, rng)
    }

    /// Wait for any other refresh to finish.
    fn lock_gate(&self) -> MutexGuard<'_, ()> {
        self.refresh_gate
            .lock()
            .expect("Poisoned lock for refresh gate")
    }

    /// Read a consensus and publish it.  The caller holds the gate.
    fn load<R: Rng + CryptoRng>(&self, force: bool, rng: &mut R) -> Result<Arc<RelayTable>> {
        let table = self.read_consensus(force, SystemTime::now(), rng)?;
        info!("Loaded consensus with {} relays", table.len());
        Ok(self.current.replace(table))
    }

    /// Build a table from the cache if we can, or else from the network.
    ///
    /// A cache that can't be read, or that lists no relays, is ignored.
    fn read_consensus<R: Rng + CryptoRng>(
        &self,
        force: bool,
        now: SystemTime,
        rng: &mut R,
    ) -> Result<RelayTable> {
        let path = self.cache_path();
        let use_cache = self.config.use_cache();

        if use_cache && !force {
            match cache::open_if_valid(&path, now) {
                Ok(Some((until, reader))) => match parse_consensus(reader) {
                    Ok(table) if !table.is_empty() => {
                        info!("Using cached consensus from {}", path.display());
                        debug!(
                            "Cached consensus valid for another {:?}",
                            until.duration_since(now).unwrap_or_default()
                        );
                        return Ok(table);
                    }
                    Ok(_) => warn!("Ignoring consensus cache: it lists no relays"),
                    Err(e) => warn!("Ignoring unreadable consensus cache: {}", e),
                },
                Ok(None) => {}
                Err(e) => warn!("Ignoring consensus cache: {}", e),
            }
        }

        info!("Downloading a fresh consensus");
        let previous = self.current();
        let (source, body) = self
            .fetcher
            .fetch(CONSENSUS_PATH, previous.as_deref(), rng)?
            .into_parts();
        debug!("Reading consensus from {}", source);

        let writer = if use_cache {
            match CacheWriter::create(&path) {
                Ok(w) => Some(w),
                Err(e) => {
                    warn!("Not caching this consensus: {}", e);
                    None
                }
            }
        } else {
            None
        };
        parse_with_cache(BufReader::new(body), writer)
    }

    /// Download the descriptors for `fps`, trying caches then authorities.
    pub fn fetch_descriptor<'a, I, R>(&self, fps: I, rng: &mut R) -> Result<String>
    where
        I: IntoIterator<Item = &'a Fingerprint>,
        R: Rng + CryptoRng,
    {
        let path = descriptor_path(fps);
        let table = self.current();
        let resp = self.fetcher.fetch(&path, table.as_deref(), rng)?;
        let mut text = String::new();
        resp.into_body().read_to_string(&mut text)?;
        Ok(text)
    }

    /// Download the descriptors for `fps` from `source` only.
    pub fn fetch_descriptor_from<'a, I>(&self, source: &DirSource, fps: I) -> Result<String>
    where
        I: IntoIterator<Item = &'a Fingerprint>,
    {
        let path = descriptor_path(fps);
        let mut body = self
            .fetcher
            .fetch_from(source, &path)
            .map_err(|e| RequestFailedError::new(source.clone(), e))?;
        let mut text = String::new();
        body.read_to_string(&mut text)?;
        Ok(text)
    }

    /// Download every relay's descriptor and attach the onion keys to the
    /// relays in the current table.
    ///
    /// Descriptors for relays we don't know are skipped.  A descriptor whose
    /// key can't be decoded is recorded in the report and does not stop the
    /// others.  If the download breaks off partway, the keys read so far are
    /// still attached and the read error is recorded in the report.
    pub fn fetch_all_descriptors<R: Rng + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<DescriptorReport> {
        let table = self.current().ok_or(Error::NoConsensus)?;
        let (source, body) = self
            .fetcher
            .fetch(ALL_DESCRIPTORS_PATH, Some(table.as_ref()), rng)?
            .into_parts();
        info!("Reading descriptors from {}", source);

        let mut report = DescriptorReport::default();
        let mut keys = Vec::new();
        for block in DescriptorBlocks::new(BufReader::new(body)) {
            let block = match block {
                Ok(block) => block,
                Err(e) => {
                    warn!("Descriptor download from {} broke off: {}", source, e);
                    report.failures.push(e.into());
                    break;
                }
            };
            let desc = match RouterDescriptor::parse(&block) {
                Ok(desc) => desc,
                Err(e) => {
                    debug!("Skipping unparsable descriptor: {}", e);
                    report.failures.push(e.into());
                    continue;
                }
            };
            let Some(fp) = desc.fingerprint.filter(|fp| table.contains(fp)) else {
                trace!("Skipping descriptor for unknown relay {}", desc.nickname);
                report.unknown += 1;
                continue;
            };
            match decode_onion_key(fp, &desc) {
                Ok(key) => keys.push((fp, key)),
                Err(e) => {
                    debug!("{}: {}", desc.nickname, e);
                    report.failures.push(e);
                }
            }
        }
        // Let go of our snapshot, so that attaching doesn't copy the table.
        drop(table);

        if !keys.is_empty() {
            report.updated = self.current.mutate(|t| {
                let mut attached = 0;
                for (fp, key) in keys {
                    if t.attach_onion_key(&fp, key) {
                        attached += 1;
                    }
                }
                Ok(attached)
            })?;
        }
        info!("Descriptors: {}", report);
        Ok(report)
    }

    /// Download one relay's descriptor and attach its onion key.
    pub fn update_relay_keys<R: Rng + CryptoRng>(
        &self,
        fp: &Fingerprint,
        rng: &mut R,
    ) -> Result<()> {
        if !self.current().ok_or(Error::NoConsensus)?.contains(fp) {
            return Err(Error::UnknownRelay(*fp));
        }
        let text = self.fetch_descriptor([fp], rng)?;
        self.attach_key_from(fp, &text)
    }

    /// Find the descriptor for `fp` in `text`, which holds one or more
    /// descriptors, and attach its onion key.
    ///
    /// A descriptor with no fingerprint line is taken to be the one asked
    /// for.
    pub fn attach_key_from(&self, fp: &Fingerprint, text: &str) -> Result<()> {
        let mut found = None;
        for block in DescriptorBlocks::new(text.as_bytes()) {
            let desc = RouterDescriptor::parse(&block?)?;
            if desc.fingerprint.is_none_or(|f| f == *fp) {
                found = Some(desc);
                break;
            }
        }
        let desc = found.ok_or_else(|| Error::DecodeError {
            fingerprint: *fp,
            source: tor_relaydir::Error::KeyDecode("no descriptor for this relay".into()),
        })?;
        let key = decode_onion_key(*fp, &desc)?;

        self.current.mutate(|t| {
            if t.attach_onion_key(fp, key) {
                Ok(())
            } else {
                Err(Error::UnknownRelay(*fp))
            }
        })
    }
}

/// Decode the onion key from `desc`, which describes the relay `fp`.
fn decode_onion_key(fp: Fingerprint, desc: &RouterDescriptor) -> Result<OnionKey> {
    let encoded = desc.onion_key.as_deref().ok_or_else(|| Error::DecodeError {
        fingerprint: fp,
        source: tor_relaydir::Error::KeyDecode("descriptor has no onion-key".into()),
    })?;
    OnionKey::from_base64(encoded).map_err(|source| Error::DecodeError {
        fingerprint: fp,
        source,
    })
}

impl<T> fmt::Debug for ConsensusStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsensusStore")
            .field("config", &self.config)
            .field("relays", &self.current.get().map(|t| t.len()))
            .finish_non_exhaustive()
    }
}
