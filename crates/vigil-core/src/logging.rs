//! Tracing setup for embedders and test harnesses.
//!
//! The engine itself never installs a subscriber; hosts (and the integration
//! tests) opt in through [`init_subscriber`].

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the process-wide tracing subscriber.
///
/// Output goes to stderr in compact form with targets shown. `RUST_LOG`
/// takes precedence over `default_level`. Safe to call repeatedly; only the
/// first call installs anything.
pub fn init_subscriber(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(true)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_a_noop() {
        init_subscriber("info");
        // A second call must neither panic nor replace the subscriber.
        init_subscriber("debug");
    }

    #[test]
    fn accepts_directive_style_levels() {
        init_subscriber("vigil_core=debug,warn");
    }
}
