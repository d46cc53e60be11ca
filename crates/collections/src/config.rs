//! Listener dispatch settings.
//!
//! The process-wide value starts from the environment and can be replaced at
//! runtime with [`set_global`]. Collections built with an explicit
//! [`DispatchConfig`] ignore the global value.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use arc_swap::ArcSwap;

/// Environment variable overriding the slow-listener threshold, in milliseconds.
pub const SLOW_LISTENER_ENV: &str = "WEFT_SLOW_LISTENER_MS";

const DEFAULT_SLOW_LISTENER: Duration = Duration::from_millis(100);

static GLOBAL: LazyLock<ArcSwap<DispatchConfig>> = LazyLock::new(|| ArcSwap::from_pointee(DispatchConfig::from_env()));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
	/// Invocations running longer than this emit a `listener.slow` warning.
	/// Purely diagnostic; the listener is never interrupted.
	pub slow_listener_threshold: Duration,
}

impl Default for DispatchConfig {
	fn default() -> Self {
		Self {
			slow_listener_threshold: DEFAULT_SLOW_LISTENER,
		}
	}
}

impl DispatchConfig {
	/// Defaults overlaid with [`SLOW_LISTENER_ENV`].
	pub fn from_env() -> Self {
		let threshold = parse_threshold(std::env::var(SLOW_LISTENER_ENV).ok(), DEFAULT_SLOW_LISTENER);
		if threshold != DEFAULT_SLOW_LISTENER {
			tracing::info!(threshold_ms = threshold.as_millis() as u64, "config.slow_listener_threshold");
		}
		Self {
			slow_listener_threshold: threshold,
		}
	}

	pub fn with_slow_listener_threshold(mut self, threshold: Duration) -> Self {
		self.slow_listener_threshold = threshold;
		self
	}
}

fn parse_threshold(value: Option<String>, default: Duration) -> Duration {
	let Some(value) = value else {
		return default;
	};

	match value.trim().parse::<u64>() {
		Ok(ms) => Duration::from_millis(ms),
		Err(_) => {
			tracing::warn!(value = %value, var = SLOW_LISTENER_ENV, "config.invalid_threshold");
			default
		}
	}
}

/// Current process-wide configuration.
pub fn global() -> Arc<DispatchConfig> {
	GLOBAL.load_full()
}

/// Replaces the process-wide configuration.
pub fn set_global(config: DispatchConfig) {
	GLOBAL.store(Arc::new(config));
}
