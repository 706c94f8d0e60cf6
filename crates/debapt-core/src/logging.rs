//! Tracing setup.
//!
//! apt's `Debug::*` configuration knobs (`Debug::pkgDepCache::Marker`,
//! `Debug::Acquire::Worker`, ...) gate verbose stderr logging per-subsystem
//! at runtime. We keep the same per-subsystem granularity but express it as
//! `tracing` targets (`debapt_solver`, `debapt_acquire`, ...) gated through
//! the standard `RUST_LOG`/`EnvFilter` mechanism instead of bespoke config
//! keys.

use tracing_subscriber::{EnvFilter, fmt};

/// Install a global `tracing` subscriber reading its filter from `RUST_LOG`,
/// defaulting to `info` when unset. Call once, at process startup.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).init();
}

/// Like [`init`], but returns without panicking if a subscriber is already
/// installed. Useful in test binaries where multiple test modules might
/// call it.
pub fn init_once() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
