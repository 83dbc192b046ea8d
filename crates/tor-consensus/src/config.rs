//! Configuration for a [`ConsensusStore`](crate::ConsensusStore).

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::Deserialize;
use tor_dirfetch::{ConfigBuildError, FetchConfig};

/// Where to keep the consensus, and how to download it.
///
/// Build one with [`ConsensusConfigBuilder`], or deserialize it through
/// that builder.
#[derive(Debug, Clone, Builder, Deserialize, Eq, PartialEq)]
#[serde(try_from = "ConsensusConfigBuilder")]
#[builder(build_fn(validate = "Self::validate", error = "ConfigBuildError"))]
#[builder(derive(Debug, Deserialize))]
pub struct ConsensusConfig {
    /// Directory holding the `cached-consensus` file.
    #[builder(default = "default_cache_dir()")]
    #[builder_field_attr(serde(default))]
    pub(crate) cache_dir: PathBuf,

    /// Whether to read and write the on-disk cache at all.
    #[builder(default = "true")]
    #[builder_field_attr(serde(default))]
    pub(crate) use_cache: bool,

    /// How to reach directory caches and authorities.
    #[builder(default)]
    #[builder_field_attr(serde(default))]
    pub(crate) fetch: FetchConfig,
}

/// Return the default cache directory: the working directory.
fn default_cache_dir() -> PathBuf {
    PathBuf::from(".")
}

impl ConsensusConfig {
    /// Return a new [`ConsensusConfigBuilder`].
    pub fn builder() -> ConsensusConfigBuilder {
        ConsensusConfigBuilder::default()
    }

    /// Return the directory holding the cache file.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Return true if the on-disk cache is in use.
    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    /// Return the fetch configuration.
    pub fn fetch(&self) -> &FetchConfig {
        &self.fetch
    }
}

impl ConsensusConfigBuilder {
    /// Check that the configuration is usable.
    fn validate(&self) -> Result<(), ConfigBuildError> {
        if self
            .cache_dir
            .as_ref()
            .is_some_and(|d| d.as_os_str().is_empty())
        {
            return Err(ConfigBuildError::Invalid {
                field: "cache_dir".into(),
                problem: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

impl TryFrom<ConsensusConfigBuilder> for ConsensusConfig {
    type Error = ConfigBuildError;

    fn try_from(builder: ConsensusConfigBuilder) -> Result<Self, ConfigBuildError> {
        builder.build()
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        ConsensusConfigBuilder::default()
            .build()
            .expect("unusable hardwired defaults")
    }
}

impl From<ConsensusConfig> for ConsensusConfigBuilder {
    fn from(cfg: ConsensusConfig) -> ConsensusConfigBuilder {
        let mut builder = ConsensusConfigBuilder::default();
        builder
            .cache_dir(cfg.cache_dir)
            .use_cache(cfg.use_cache)
            .fetch(cfg.fetch);
        builder
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
    use std::time::Duration;

    #[test]
    fn defaults() {
        let cfg = ConsensusConfig::default();
        assert_eq!(cfg.cache_dir(), Path::new("."));
        assert!(cfg.use_cache());
        assert_eq!(cfg.fetch(), &FetchConfig::default());

        let rebuilt = ConsensusConfigBuilder::from(cfg.clone()).build().unwrap();
        assert_eq!(rebuilt, cfg);
    }

    #[test]
    fn builder() {
        let fetch = FetchConfig::builder().max_tries(2).build().unwrap();
        let cfg = ConsensusConfig::builder()
            .cache_dir("/var/cache/dirtool".into())
            .use_cache(false)
            .fetch(fetch)
            .build()
            .unwrap();
        assert_eq!(cfg.cache_dir(), Path::new("/var/cache/dirtool"));
        assert!(!cfg.use_cache());
        assert_eq!(cfg.fetch().max_tries(), 2);

        let e = ConsensusConfig::builder()
            .cache_dir(PathBuf::new())
            .build()
            .unwrap_err();
        assert!(matches!(e, ConfigBuildError::Invalid { ref field, .. } if field == "cache_dir"));
    }

    #[test]
    fn deserialize() {
        let cfg: ConsensusConfig = serde_json::from_str(
            r#"{ "cache_dir": "/tmp/x", "fetch": { "authorities_only": true, "read_timeout": "10s" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.cache_dir(), Path::new("/tmp/x"));
        assert!(cfg.use_cache());
        assert!(cfg.fetch().authorities_only());
        assert_eq!(cfg.fetch().read_timeout(), Duration::from_secs(10));

        let empty: ConsensusConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, ConsensusConfig::default());
    }

    #[test]
    fn deserialize_invalid() {
        for text in [
            r#"{ "cache_dir": "" }"#,
            r#"{ "fetch": { "max_tries": 0 } }"#,
            r#"{ "fetch": { "authorities": [] } }"#,
        ] {
            let e = serde_json::from_str::<ConsensusConfig>(text).unwrap_err();
            assert!(e.to_string().contains("was incorrect"), "{text}: {e}");
        }
    }
}
