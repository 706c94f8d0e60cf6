//! Per-version solver state: a flat array of [`Decision`]s indexed by
//! `VerId`, in the same "struct-of-arrays keyed by typed id" idiom
//! `debapt_depcache::overlay` uses for its per-package/per-dependency
//! bits, rather than a decision living on a boxed per-version node.
//!
//! Grounded in `apt-pkg/solver3.cc`'s `Solver::Var` table (one entry per
//! version, tracking its decision, the depth it was decided at, and why).

use debapt_cache::Cache;
use debapt_core::ids::{PkgId, VerId};

use crate::types::{Decision, Reason};

/// One version's entry in the solver's `Var` table.
#[derive(Debug, Clone, Copy)]
struct Var {
    decision: Decision,
    reason: Option<Reason>,
    /// Backtracking depth at which `decision` was set; `0` for
    /// never-decided entries.
    depth: u32,
}

impl Default for Var {
    fn default() -> Self {
        Self { decision: Decision::Undecided, reason: None, depth: 0 }
    }
}

/// The solver's mutable state: one [`Var`] per version, index `0` unused
/// (matching `Cache`'s 1-based pools).
pub struct SolverState {
    vars: Vec<Var>,
}

impl SolverState {
    #[must_use]
    pub fn new(cache: &Cache) -> Self {
        let count = cache.header().version_count as usize;
        Self { vars: vec![Var::default(); count + 1] }
    }

    #[must_use]
    pub fn decision(&self, ver: VerId) -> Decision {
        self.vars[ver.index()].decision
    }

    #[must_use]
    pub fn reason(&self, ver: VerId) -> Option<Reason> {
        self.vars[ver.index()].reason
    }

    #[must_use]
    pub fn depth_of(&self, ver: VerId) -> u32 {
        self.vars[ver.index()].depth
    }

    /// Commit `ver` to `decision` at `depth`. Returns `Ok(true)` if this
    /// was a new assignment, `Ok(false)` if it repeats an existing one
    /// (idempotent, matching `solver3.cc`'s `AssignDecision`), and `Err`
    /// if it contradicts an existing opposite decision.
    pub fn assign(&mut self, ver: VerId, decision: Decision, reason: Reason, depth: u32) -> Result<bool, ()> {
        let var = &mut self.vars[ver.index()];
        match (var.decision, decision) {
            (Decision::Undecided, _) => {
                var.decision = decision;
                var.reason = Some(reason);
                var.depth = depth;
                Ok(true)
            }
            (a, b) if a == b => Ok(false),
            _ => Err(()),
        }
    }

    /// Undo every decision made at a depth greater than `level`, as part
    /// of popping back to a choice point.
    pub fn rewind_above(&mut self, level: u32) {
        for var in &mut self.vars {
            if var.depth > level {
                *var = Var::default();
            }
        }
    }

    /// Whether `pkg` has any version committed `Must`.
    #[must_use]
    pub fn package_will_be_installed(&self, cache: &Cache, pkg: PkgId) -> Option<VerId> {
        cache
            .package_versions(pkg)
            .into_iter()
            .find(|&v| self.decision(v) == Decision::Must)
    }

    /// Whether every version of `pkg` has been driven to `MustNot`.
    #[must_use]
    pub fn package_fully_rejected(&self, cache: &Cache, pkg: PkgId) -> bool {
        let versions = cache.package_versions(pkg);
        !versions.is_empty() && versions.iter().all(|&v| self.decision(v) == Decision::MustNot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(n: usize) -> SolverState {
        SolverState { vars: vec![Var::default(); n + 1] }
    }

    #[test]
    fn assign_is_idempotent_and_detects_contradiction() {
        let mut state = state(2);
        let ver = VerId::new(1);
        assert!(state.assign(ver, Decision::Must, Reason::Request, 1).is_ok());
        assert!(state.assign(ver, Decision::Must, Reason::Request, 1).is_ok());
        assert!(state.assign(ver, Decision::MustNot, Reason::Request, 1).is_err());
        assert_eq!(state.decision(ver), Decision::Must);
    }

    #[test]
    fn rewind_above_clears_deeper_decisions() {
        let mut state = state(2);
        state.assign(VerId::new(1), Decision::Must, Reason::Request, 1).unwrap();
        state.assign(VerId::new(2), Decision::MustNot, Reason::Request, 5).unwrap();
        state.rewind_above(1);
        assert_eq!(state.decision(VerId::new(1)), Decision::Must);
        assert_eq!(state.decision(VerId::new(2)), Decision::Undecided);
    }
}
