//! A command-line tool to fetch, cache, and query the Tor consensus.
//!
//! See the README for the subcommands and the configuration file format.

// @@ begin lint list maintained by maint/add_warning @@
#![allow(renamed_and_removed_lints)] // @@REMOVE_WHEN(ci_arti_stable)
#![allow(unknown_lints)] // @@REMOVE_WHEN(ci_arti_nightly)
#![warn(missing_docs)]
#![warn(noop_method_call)]
#![warn(unreachable_pub)]
#![warn(clippy::all)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::cast_lossless)]
#![deny(clippy::checked_conversions)]
#![warn(clippy::cognitive_complexity)]
#![deny(clippy::debug_assert_with_mut_call)]
#![deny(clippy::exhaustive_enums)]
#![deny(clippy::exhaustive_structs)]
#![deny(clippy::expl_impl_clone_on_copy)]
#![deny(clippy::fallible_impl_from)]
#![deny(clippy::implicit_clone)]
#![deny(clippy::large_stack_arrays)]
#![warn(clippy::manual_ok_or)]
#![deny(clippy::missing_docs_in_private_items)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::needless_pass_by_value)]
#![warn(clippy::option_option)]
#![warn(clippy::rc_buffer)]
#![deny(clippy::ref_option_ref)]
#![warn(clippy::semicolon_if_nothing_returned)]
#![warn(clippy::trait_duplication_in_bounds)]
#![deny(clippy::unchecked_time_subtraction)]
#![deny(clippy::unnecessary_wraps)]
#![warn(clippy::unseparated_literal_suffix)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::mod_module_files)]
#![allow(clippy::let_unit_value)] // This can reasonably be done for explicitness
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::significant_drop_in_scrutinee)] // arti/-/merge_requests/588/#note_2812945
#![allow(clippy::result_large_err)] // temporary workaround for arti#587
#![allow(clippy::needless_raw_string_hashes)] // complained-about code is fine, often best
#![allow(clippy::needless_lifetimes)] // See arti#1765
//! <!-- @@ end lint list maintained by maint/add_warning @@ -->
// This is a command-line tool: its output goes to stdout.
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

mod cfg;
mod cli;
mod commands;
mod logging;

use anyhow::Context as _;
use clap::Parser as _;
use tor_consensus::ConsensusStore;
use tracing::debug;

use crate::cfg::DirtoolConfig;
use crate::cli::Cli;

fn main() {
    // Will exit if '--help' used or there's a parse error.
    let cli = Cli::parse();

    if let Err(e) = main_main(cli) {
        eprintln!("dirtool: error: {:#}", e);
        std::process::exit(1);
    }
}

/// The real main, without the error formatting.
fn main_main(cli: Cli) -> anyhow::Result<()> {
    let config = DirtoolConfig::load(cli.config.as_deref())?.apply_cli(&cli)?;
    logging::setup_logging(&config.logging, cli.log_level.as_deref())?;
    debug!("Using configuration {:?}", config.consensus);

    let store =
        ConsensusStore::from_config(config.consensus).context("Unable to set up consensus store")?;
    commands::run(&store, cli.command)
}
