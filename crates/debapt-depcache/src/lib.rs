//! The dependency cache overlay and candidate-version policy (`spec.md`
//! §4.2, §4.3): mark/sweep package-selection state layered on top of a
//! read-only [`debapt_cache::Cache`], plus the rules for picking each
//! package's install candidate.

pub mod extended_states;
pub mod overlay;
pub mod policy;

pub use extended_states::{ExtendedStateEntry, apply as apply_extended_states, collect as collect_extended_states, load as load_extended_states, write as write_extended_states};
pub use overlay::{ActionGroup, DepCache, DepRollup, DepState, MarkError, Mode, PackageState, StateFlags};
pub use policy::{Pin, PinTarget, Policy};
