use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. Logs go to stderr so `research` output stays clean on
/// stdout. `RUST_LOG` overrides the `info` default; `IDEASCOUT_LOG_JSON=1` switches to
/// JSON lines.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    // `try_init` so a second call (tests, embedders) is a no-op rather than a panic.
    if std::env::var("IDEASCOUT_LOG_JSON").ok().as_deref() == Some("1") {
        let _ = fmt.json().try_init();
    } else {
        let _ = fmt.try_init();
    }
}
