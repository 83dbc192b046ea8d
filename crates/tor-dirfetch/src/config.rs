//! Configuration for fetching directory documents.

use std::time::Duration;

use derive_builder::Builder;
use serde::Deserialize;

use crate::{Authority, ConfigBuildError, DEFAULT_AUTHORITY_LINES};

/// Configuration for a [`DirFetcher`](crate::DirFetcher).
///
/// This type is immutable once constructed.  To build one, use
/// [`FetchConfigBuilder`], or deserialize it: deserializing goes through
/// the builder, so it is checked the same way.
#[derive(Debug, Clone, Builder, Deserialize, Eq, PartialEq)]
#[serde(try_from = "FetchConfigBuilder")]
#[builder(build_fn(validate = "Self::validate", error = "ConfigBuildError"))]
#[builder(derive(Debug, Deserialize))]
pub struct FetchConfig {
    /// Most attempts to make in each phase (caches, then authorities).
    #[builder(default = "default_max_tries()")]
    #[builder_field_attr(serde(default))]
    pub(crate) max_tries: usize,

    /// If true, never ask directory caches; go straight to the authorities.
    #[builder(default)]
    #[builder_field_attr(serde(default))]
    pub(crate) authorities_only: bool,

    /// How long to wait for a TCP connection to a directory.
    #[builder(default = "default_connect_timeout()")]
    #[builder_field_attr(serde(default, with = "humantime_serde::option"))]
    pub(crate) connect_timeout: Duration,

    /// How long to wait for any single read from a directory.
    #[builder(default = "default_read_timeout()")]
    #[builder_field_attr(serde(default, with = "humantime_serde::option"))]
    pub(crate) read_timeout: Duration,

    /// Directory authorities, one line each.
    #[builder(default = "default_authority_lines()")]
    #[builder_field_attr(serde(default))]
    pub(crate) authorities: Vec<String>,
}

/// Return the default number of attempts per phase.
fn default_max_tries() -> usize {
    10
}

/// Return the default TCP connect timeout.
fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Return the default read timeout.
fn default_read_timeout() -> Duration {
    Duration::from_secs(60)
}

/// Return the compiled-in authority lines.
fn default_authority_lines() -> Vec<String> {
    DEFAULT_AUTHORITY_LINES
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

impl FetchConfig {
    /// Return a new [`FetchConfigBuilder`].
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::default()
    }

    /// Return the most attempts to make in each phase.
    pub fn max_tries(&self) -> usize {
        self.max_tries
    }

    /// Return true if caches are never to be asked.
    pub fn authorities_only(&self) -> bool {
        self.authorities_only
    }

    /// Return the TCP connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Return the per-read timeout.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Parse the configured authority lines.
    pub fn authorities(&self) -> Result<Vec<Authority>, ConfigBuildError> {
        self.authorities
            .iter()
            .map(|line| {
                line.parse().map_err(|e: tor_dirdoc::Error| ConfigBuildError::Invalid {
                    field: "authorities".into(),
                    problem: e.to_string(),
                })
            })
            .collect()
    }
}

impl FetchConfigBuilder {
    /// Check that the configuration is usable.
    fn validate(&self) -> Result<(), ConfigBuildError> {
        if self.max_tries == Some(0) {
            return Err(ConfigBuildError::Invalid {
                field: "max_tries".into(),
                problem: "must be at least 1".into(),
            });
        }
        if let Some(lines) = &self.authorities {
            if lines.is_empty() {
                return Err(ConfigBuildError::Invalid {
                    field: "authorities".into(),
                    problem: "list is empty".into(),
                });
            }
            for line in lines {
                if let Err(e) = line.parse::<Authority>() {
                    return Err(ConfigBuildError::Invalid {
                        field: "authorities".into(),
                        problem: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<FetchConfigBuilder> for FetchConfig {
    type Error = ConfigBuildError;

    fn try_from(builder: FetchConfigBuilder) -> Result<Self, ConfigBuildError> {
        builder.build()
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfigBuilder::default()
            .build()
            .expect("unusable hardwired defaults")
    }
}

impl From<FetchConfig> for FetchConfigBuilder {
    fn from(cfg: FetchConfig) -> FetchConfigBuilder {
        let mut builder = FetchConfigBuilder::default();
        builder
            .max_tries(cfg.max_tries)
            .authorities_only(cfg.authorities_only)
            .connect_timeout(cfg.connect_timeout)
            .read_timeout(cfg.read_timeout)
            .authorities(cfg.authorities);
        builder
    }
}
