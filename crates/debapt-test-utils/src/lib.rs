//! Shared test fixtures, generators, and assertions for the `debapt`
//! workspace.
//!
//! # Modules
//!
//! - [`fixtures`]: pre-built cache/dep-cache fixtures for the concrete
//!   scenarios other crates' own test suites reach for.
//! - [`generators`]: a random synthetic-repository generator for
//!   stress/benchmark-scale test caches.
//! - [`assertions`]: dep-cache state checks and the solver-soundness
//!   property.
//! - [`fake_method`]: a scriptable fake Method peer over an in-memory
//!   duplex pipe, for driving `debapt-acquire` without a real subprocess.
//! - [`temp_root`]: a temporary on-disk apt root (`var/lib/apt`,
//!   `var/cache/apt`, `etc/apt`) for tests that need real paths.
//! - [`proptest_strategies`]: proptest strategies for package names, dpkg
//!   version strings, and relation fields.
//!
//! # Example
//!
//! ```rust,no_run
//! use debapt_test_utils::fixtures::scenario_trivial_install;
//! use debapt_test_utils::assertions::assert_solver_sound;
//! use debapt_core::ids::PkgId;
//! use debapt_depcache::Policy;
//! use debapt_solver::{solve, Request};
//!
//! let (_dir, cache, (a, _b)) = scenario_trivial_install();
//! let policy = Policy::new(false, false);
//! let mut request = Request::new();
//! request.install(PkgId::new(a));
//! let txn = solve(&cache, &policy, &request).unwrap();
//! assert_solver_sound(&cache, &txn);
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod assertions;
pub mod fake_method;
pub mod fixtures;
pub mod generators;
pub mod proptest_strategies;
pub mod temp_root;

/// Re-export of the utilities most test modules reach for.
pub mod prelude {
    pub use crate::assertions::*;
    pub use crate::fake_method::{EngineSide, MethodSide, ScriptedMethod, ScriptedResponse, duplex_pair};
    pub use crate::fixtures::*;
    pub use crate::generators::{RepoShape, random_repository};
    pub use crate::temp_root::TempAptRoot;

    pub use pretty_assertions::{assert_eq, assert_ne};
    pub use proptest::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let (_dir, _cache, _ids) = fixtures::scenario_trivial_install();
    }
}
