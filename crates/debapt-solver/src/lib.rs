//! The backtracking dependency solver (`spec.md` §4.4): an ordered work
//! queue of choice points over a read-only `debapt_cache::Cache`, driven
//! to a fully-decided assignment by `Must`/`MustNot` propagation with
//! pop-to-level backtracking on contradiction.
//!
//! Grounded in `apt-pkg/solver3.cc`; see `DESIGN.md` for the module-by-
//! module mapping.

pub mod package;
pub mod provider;
pub mod resolver;
pub mod types;
pub mod version;

pub use provider::ProviderComparator;
pub use resolver::{solve, Solver};
pub use types::{Decided, Decision, GroupLabel, Reason, Request, SolveError, Transaction};
