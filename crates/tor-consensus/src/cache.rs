//! The on-disk consensus cache.
//!
//! The cache is a single file holding the text of the last consensus we
//! downloaded, exactly as it was received.  It is only trusted while its
//! own `valid-until` time is in the future.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Seek as _, Write as _};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tempfile::NamedTempFile;
use tor_dirdoc::ConsensusItem;
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Name of the cache file within the cache directory.
pub const CACHE_FILE: &str = "cached-consensus";

/// Open the cache at `path`, if it exists and is still valid at `now`.
///
/// On success, returns the end of the validity window and a reader
/// positioned at the start of the file.  A missing file, a file without a
/// `valid-until` line, or one whose `valid-until` can't be parsed or has
/// passed, gives `Ok(None)`.
pub(crate) fn open_if_valid(
    path: &Path,
    now: SystemTime,
) -> Result<Option<(SystemTime, BufReader<File>)>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No cached consensus at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(Error::cache_io(path, e)),
    };
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    loop {
        line.clear();
        if reader
            .read_line(&mut line)
            .map_err(|e| Error::cache_io(path, e))?
            == 0
        {
            warn!("Cached consensus at {} has no valid-until", path.display());
            return Ok(None);
        }
        let until = match ConsensusItem::parse_line(&line) {
            Ok(ConsensusItem::ValidUntil(t)) => t,
            Err(e @ tor_dirdoc::Error::MalformedDate(_)) => {
                warn!("Ignoring cached consensus at {}: {}", path.display(), e);
                return Ok(None);
            }
            _ => continue,
        };
        if until <= now {
            info!(
                "Cached consensus at {} is out of date ({})",
                path.display(),
                line.trim()
            );
            return Ok(None);
        }
        reader.rewind().map_err(|e| Error::cache_io(path, e))?;
        return Ok(Some((until, reader)));
    }
}

/// Copies a consensus to the cache as it is read.
///
/// Lines go to a temporary file next to the cache, which replaces the cache
/// on [`commit`](CacheWriter::commit).  If the writer is dropped first, the
/// temporary file is removed and the old cache stays as it was.
#[derive(Debug)]
pub(crate) struct CacheWriter {
    /// Where the finished file goes.
    path: PathBuf,
    /// The temporary file we are writing.
    out: BufWriter<NamedTempFile>,
}

impl CacheWriter {
    /// Start writing a replacement for the cache at `path`.
    pub(crate) fn create(path: &Path) -> Result<Self> {
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|e| Error::cache_io(dir, e))?;
        let tmp = tempfile::Builder::new()
            .prefix(CACHE_FILE)
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| Error::cache_io(path, e))?;
        Ok(CacheWriter {
            path: path.to_owned(),
            out: BufWriter::new(tmp),
        })
    }

    /// Append `line`, which should include its line terminator.
    pub(crate) fn write_line(&mut self, line: &str) -> Result<()> {
        self.out
            .write_all(line.as_bytes())
            .map_err(|e| Error::cache_io(&self.path, e))
    }

    /// Flush everything and move the new file into place.
    pub(crate) fn commit(self) -> Result<()> {
        let tmp = self
            .out
            .into_inner()
            .map_err(|e| Error::cache_io(&self.path, e.into_error()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| Error::cache_io(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| Error::cache_io(&self.path, e.error))?;
        debug!("Wrote consensus cache to {}", self.path.display());
        Ok(())
    }
}
