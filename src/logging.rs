//! Logging setup for harness runs
//!
//! Installs a `tracing-subscriber` fmt subscriber once per process. `RUST_LOG`
//! takes precedence over the level passed in.

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Filter directive for `level`, with noisy harness targets capped.
fn build_env_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let directives = format!("{},harness::client=warn", level);
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber, writing to stdout. Later calls are no-ops.
pub fn init(level: &str) {
    install(level, false);
}

/// Like [`init`], but output goes through the test harness capture.
pub fn init_for_tests(level: &str) {
    install(level, true);
}

fn install(level: &str, test_writer: bool) {
    INIT.get_or_init(|| {
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
        let registry = tracing_subscriber::registry().with(build_env_filter(level));
        // try_init: a subscriber installed by the embedding program wins
        let _ = if test_writer {
            registry.with(fmt_layer.with_test_writer()).try_init()
        } else {
            registry.with(fmt_layer).try_init()
        };
    });
}
