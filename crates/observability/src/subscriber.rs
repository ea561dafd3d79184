//! JSON subscriber installation.

use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` wins, then `default_level`, then `info`.
pub fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(default_level: &str) {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(default_level, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init("warn");
        init("debug");
        tracing::info!("still alive");
    }

    #[test]
    fn invalid_level_falls_back() {
        let _ = filter("definitely[not a directive");
    }
}
