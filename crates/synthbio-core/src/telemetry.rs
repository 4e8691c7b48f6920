//! Tracing initialisation shared by the gateway binaries.
//!
//! Filtering honours `SYNTHBIO_LOG` first, then `RUST_LOG`, then the level
//! passed by the caller. `SYNTHBIO_LOG_FORMAT=json` forces JSON output.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding a filter directive for this workspace.
pub const LOG_ENV: &str = "SYNTHBIO_LOG";

/// Environment variable selecting the log line format.
pub const LOG_FORMAT_ENV: &str = "SYNTHBIO_LOG_FORMAT";

/// Build the env filter, falling back to `level` for the gateway crates.
pub fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "warn,synthbio_core={level},synthbio_engine={level},synthbio_client={level},synthbiod={level},synthbio_cli={level},tower_http={level}",
                level = level.as_str().to_ascii_lowercase()
            ))
        })
}

/// Whether JSON log lines were requested via [`LOG_FORMAT_ENV`].
pub fn json_requested_by_env() -> bool {
    std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Install the global subscriber.
///
/// * `json` emits newline-delimited JSON; also enabled by `SYNTHBIO_LOG_FORMAT=json`.
/// * `level` is the default verbosity when no filter variable is set.
///
/// Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter = env_filter(level);

    if json || json_requested_by_env() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}
