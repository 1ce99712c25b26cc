//! Tracing setup with a reloadable filter.

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

use megabridge_app::ports::LogLevelControl;
use megabridge_domain::error::BridgeError;

/// Install the global subscriber and return a handle that can change its
/// level later. Falls back to `fallback` when `filter` does not parse.
pub fn init(filter: &str, fallback: &str) -> ReloadLogLevel {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {filter:?} ({err}), using {fallback:?}");
        EnvFilter::new(fallback)
    });
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    ReloadLogLevel { handle }
}

/// [`LogLevelControl`] over a `tracing-subscriber` reload handle.
#[derive(Debug, Clone)]
pub struct ReloadLogLevel {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl ReloadLogLevel {
    fn filter_for(level: tracing::Level) -> EnvFilter {
        let level = level.as_str().to_ascii_lowercase();
        EnvFilter::new(format!("warn,megabridge={level}"))
    }
}

impl LogLevelControl for ReloadLogLevel {
    fn set_level(&self, level: tracing::Level) -> Result<(), BridgeError> {
        self.handle
            .reload(Self::filter_for(level))
            .map_err(|err| BridgeError::Logging(Box::new(err)))
    }
}
