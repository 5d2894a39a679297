//! Structured logging setup.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to this
//! workspace's crates.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    format!("tx_chaining={level},chaining_demo={level},warn")
}

/// Install the global subscriber. Returns `false` if one was already installed.
pub fn init(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_scopes_workspace_crates() {
        assert_eq!(
            default_filter("debug"),
            "tx_chaining=debug,chaining_demo=debug,warn"
        );
    }

    #[test]
    fn second_init_is_harmless() {
        let _ = init("info");
        assert!(!init("info"));
    }
}
