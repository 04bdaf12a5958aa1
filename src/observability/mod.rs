//! Process-wide logging setup.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

const FALLBACK_LEVEL: &str = "info";

/// `RUST_LOG` wins over the configured level; an unparsable value falls back to `info`.
fn build_filter(rust_log: Option<&str>, configured: &str) -> EnvFilter {
    rust_log
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_new(configured.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new(FALLBACK_LEVEL))
}

/// Install the global `fmt` subscriber writing to stderr.
pub fn init_tracing(configured_level: &str) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(build_filter(rust_log.as_deref(), configured_level))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("setting default subscriber failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_overrides_configured_level() {
        assert_eq!(build_filter(Some("warn"), "debug").to_string(), "warn");
    }

    #[test]
    fn configured_level_used_without_rust_log() {
        assert_eq!(build_filter(None, "debug").to_string(), "debug");
        assert_eq!(build_filter(Some("  "), "planchat=trace").to_string(), "planchat=trace");
    }
}
