//! Diagnostics go to stderr so stdout stays clean for generated source and reports.
use std::io::IsTerminal;
use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

static INIT: Once = Once::new();

#[derive(Clone, Debug)]
pub struct Config {
    /// A level such as "debug" or a full filter like "warn,json_drift=debug".
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { level: "warn".to_owned(), json: false }
    }
}

/// Install the global subscriber; later calls are no-ops.
pub fn init(cfg: &Config) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&cfg.level))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        let layer = if cfg.json {
            fmt::layer().with_writer(std::io::stderr).json().with_current_span(true).boxed()
        } else {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal())
                .boxed()
        };

        let subscriber = Registry::default().with(filter).with(layer);
        // another subscriber may already be installed (e.g. by an embedding test harness)
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
