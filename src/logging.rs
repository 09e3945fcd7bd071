//! Log output for front ends embedding the engine.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Default filter directive for the given verbosity flags.
pub fn default_level(verbose: bool, debug: bool) -> &'static str {
    if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    }
}

/// Install a stderr subscriber. `RUST_LOG` wins over the flags.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init(verbose: bool, debug: bool) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose, debug)));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_target(debug)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).is_ok()
}
