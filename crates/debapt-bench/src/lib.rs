//! Cross-crate benchmark harness.
//!
//! Most crates carry their own in-tree `criterion` benches for a single
//! operation (`debapt-cache`'s image roundtrip, `debapt-solver`'s
//! resolver, `debapt-acquire`'s wire codec). This crate is for the
//! benchmarks that span more than one of them: building a cache large
//! enough to be representative, then solving or routing against it.
//!
//! The actual `#[bench]` entries live under `benches/`; this crate's
//! library half only holds shared scale presets.

#![warn(clippy::all)]

/// Package-count presets used across the benches here, roughly matching
/// a small-distro component, a full `main` suite, and an oversized
/// stress case.
pub const SCALES: [usize; 3] = [500, 5_000, 20_000];
