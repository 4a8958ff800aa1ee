//! Logging bootstrap.
//!
//! The workspace logs through `tracing`. Installing a subscriber is left to
//! the application unless it opts into this module, which is driven by
//! environment variables:
//!
//! - `ENTITIES_DEBUG=true|1|yes` - log at debug level
//! - `ENTITIES_LOG_LEVEL=trace|debug|info|warn|error` - log at a specific level
//! - `ENTITIES_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! A subscriber is only installed with the `tracing-subscriber` feature.
//!
//! ```rust,no_run
//! entities::logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Whether `ENTITIES_DEBUG` asks for debug logging.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("ENTITIES_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// The level from `ENTITIES_LOG_LEVEL`; `debug` when debugging is enabled,
/// else `warn`.
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("ENTITIES_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// The format from `ENTITIES_LOG_FORMAT`, defaulting to `json`.
pub fn get_log_format() -> &'static str {
    env::var("ENTITIES_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Install the subscriber once. Does nothing unless `ENTITIES_DEBUG` or
/// `ENTITIES_LOG_LEVEL` is set.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("ENTITIES_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!(
                "entities={level},entities_schema={level},entities_sqlite={level},entities_migrate={level}"
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .init(),
            }

            tracing::info!(level, format = get_log_format(), "Logging initialized");
        }
    });
}

/// Set `ENTITIES_LOG_LEVEL` and [`init`].
///
/// # Safety
///
/// Modifies the environment; call at startup before spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: only called at program startup before threads are spawned.
    unsafe {
        env::set_var("ENTITIES_LOG_LEVEL", level);
    }
    init();
}

/// Set `ENTITIES_DEBUG` and [`init`].
///
/// # Safety
///
/// Modifies the environment; call at startup before spawning threads.
pub fn init_debug() {
    // SAFETY: only called at program startup before threads are spawned.
    unsafe {
        env::set_var("ENTITIES_DEBUG", "true");
    }
    init();
}
