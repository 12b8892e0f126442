//! Tracing setup for host processes embedding the engine.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter applied when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "warn,pagelens=info";

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG` when set. Call once at process startup; a second call
/// fails the global-default installation and is ignored.
pub fn init_tracing() {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_span_events(FmtSpan::CLOSE);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
