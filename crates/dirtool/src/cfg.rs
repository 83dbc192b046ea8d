//! The configuration file.

use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;
use tor_consensus::{ConsensusConfig, ConsensusConfigBuilder};
use tor_dirfetch::FetchConfigBuilder;

use crate::cli::Cli;

/// File read when `--config` is not given, if it exists.
const DEFAULT_CONFIG_FILE: &str = "dirtool.toml";

/// Everything in a config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct DirtoolConfig {
    /// How to log.
    #[serde(default)]
    pub(crate) logging: LoggingConfig,

    /// Where to cache the consensus and how to download it.
    #[serde(default)]
    pub(crate) consensus: ConsensusConfig,
}

/// The `[logging]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct LoggingConfig {
    /// Filtering directives for messages on stderr, as described at
    /// <https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/targets/struct.Targets.html#impl-FromStr>
    ///
    /// Example: "info,tor_dirfetch=debug"
    #[serde(default = "default_console_filter")]
    pub(crate) console: String,
}

/// Return the default filter for `logging.console`.
fn default_console_filter() -> String {
    "info".to_owned()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            console: default_console_filter(),
        }
    }
}

impl DirtoolConfig {
    /// Parse a config file's contents.
    pub(crate) fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read the file named on the command line, or the default file if it
    /// exists, or else use the defaults.
    pub(crate) fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(DirtoolConfig::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };
        Self::from_toml(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Apply the command-line overrides in `cli`.
    pub(crate) fn apply_cli(mut self, cli: &Cli) -> anyhow::Result<Self> {
        let mut fetch = FetchConfigBuilder::from(self.consensus.fetch().clone());
        if cli.authorities_only {
            fetch.authorities_only(true);
        }
        let mut builder = ConsensusConfigBuilder::from(self.consensus);
        if let Some(dir) = &cli.cache_dir {
            builder.cache_dir(dir.clone());
        }
        builder.fetch(fetch.build().context("invalid fetch configuration")?);
        self.consensus = builder
            .build()
            .context("invalid consensus configuration")?;
        Ok(self)
    }
}
