//! Logger setup for the featureprep binary.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Environment variable holding an `env_logger` filter that overrides the
/// level picked from `--verbose`.
pub const LOG_ENV: &str = "FEATUREPREP_LOG";

/// Level of featureprep's own log records.
pub fn crate_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Initializes the global logger. Only the binary calls this.
///
/// `--verbose` enables debug records for featureprep only; dependencies stay
/// at info.
pub fn init_logger(verbose: bool) {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module(env!("CARGO_CRATE_NAME"), crate_level(verbose))
        .parse_env(Env::new().filter(LOG_ENV))
        .format_timestamp(None)
        .format_target(verbose)
        .init();
}
