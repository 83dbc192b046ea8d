//! Configure tracing subscribers for dirtool.

use std::io::IsTerminal as _;
use std::str::FromStr as _;

use anyhow::{Context as _, Result};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry};

use crate::cfg::LoggingConfig;

/// As [`Targets::from_str`], but say where the bad filter came from.
fn filt_from_str_verbose(s: &str, source: &str) -> Result<Targets> {
    Targets::from_str(s).with_context(|| format!("in {}", source))
}

/// Return the filter to use: from the command line if given, else from the
/// config file.
fn console_filter(config: &LoggingConfig, cli: Option<&str>) -> Result<Targets> {
    match cli {
        Some(s) => filt_from_str_verbose(s, "--log-level command line parameter"),
        None => filt_from_str_verbose(&config.console, "logging.console"),
    }
}

/// Install a subscriber that logs to stderr.
pub(crate) fn setup_logging(config: &LoggingConfig, cli: Option<&str>) -> Result<()> {
    let filter = console_filter(config, cli)?;
    let layer = fmt::Layer::default()
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .with_filter(filter);
    registry()
        .with(layer)
        .try_init()
        .context("Unable to install logger")?;
    Ok(())
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
    use tracing::Level;

    #[test]
    fn choose_filter() {
        let cfg = LoggingConfig {
            console: "warn,tor_dirfetch=trace".into(),
        };
        let f = console_filter(&cfg, None).unwrap();
        assert!(f.would_enable("tor_dirfetch::fetch", &Level::TRACE));
        assert!(!f.would_enable("tor_consensus", &Level::INFO));

        let f = console_filter(&cfg, Some("debug")).unwrap();
        assert!(f.would_enable("tor_consensus", &Level::DEBUG));
        assert!(!f.would_enable("tor_dirfetch", &Level::TRACE));

        let e = console_filter(&cfg, Some("info,=nonsense=")).unwrap_err();
        assert!(format!("{:#}", e).contains("--log-level"));
    }
}
