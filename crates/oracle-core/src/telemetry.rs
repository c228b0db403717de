//! Tracing initialisation for the oracle daemon.
//!
//! [`init_tracing`] installs the global subscriber: an `EnvFilter` honouring
//! `RUST_LOG`, falling back to the given level, with either human-readable or
//! newline-delimited JSON output. Only the first call in a process takes
//! effect.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per line, for log aggregation pipelines
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Initialise the global tracing subscriber.
pub fn init_tracing(format: LogFormat, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        LogFormat::Json => registry
            .with(fmt::layer().with_target(false).json())
            .try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(false)).try_init(),
    };
    if installed.is_ok() {
        tracing::debug!(?format, %level, "tracing initialised");
    }
}
