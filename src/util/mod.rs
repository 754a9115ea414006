//! Shared utilities: logging, name normalization, numeric sanitizers.

use tracing::Level;

/// Initialize tracing with env filter. Safe to call once at startup.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Normalize bundle or weapon names for lookup (lowercase, trim).
pub fn normalize_id(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Replace NaN and infinities with `fallback`.
pub fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Add a signed, possibly fractional delta to a counter without wrapping.
/// Fractions truncate toward zero; the result saturates at 0 and `max`.
pub fn add_count(current: u32, delta: f32, max: u32) -> u32 {
    let delta = finite_or(delta, 0.0).trunc() as i64;
    (current as i64 + delta).clamp(0, max as i64) as u32
}
