//! ID generation utilities for simforge
//!
//! Provides functions for generating unique identifiers for persisted
//! simulations and sandbox artifacts. Generators are stateless: uniqueness
//! comes from the millisecond timestamp plus a random suffix, so concurrent
//! callers never need a shared counter.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Generate a unique artifact ID
///
/// Format: `{timestamp_ms}-{random_hex}`
/// Example: `1738300800123-a1b2`
pub fn generate_artifact_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("{}-{:04x}", timestamp, random)
}

/// Generate an ID for a persisted simulation
///
/// Format: `{slug}-{timestamp_ms}-{random_hex}`
/// Example: `pendulum_period-1738300800123-a1b2`
pub fn generate_model_id(slug: &str) -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("{}-{}-{:04x}", slug, timestamp, random)
}
