//! The backtracking solver (`spec.md` §4.4): an ordered work queue of
//! choice points, committed via `Decision::Must`/`MustNot` propagation
//! through the dependency graph, with pop-to-level backtracking on
//! contradiction.
//!
//! Grounded in `apt-pkg/solver3.cc`'s `Solver::Solve` main loop,
//! `Solver::Push`/`Solver::Assign`/`Solver::Reject`
//! (`Install`/`Reject` on `VerIterator`), and its `CompareProviders3`
//! (here, [`crate::provider::ProviderComparator`]).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use debapt_cache::{Cache, DepKind};
use debapt_core::ids::{PkgId, VerId};
use debapt_depcache::Policy;

use crate::package::SolverState;
use crate::provider::ProviderComparator;
use crate::types::{Decided, Decision, GroupLabel, Origin, Reason, Request, SolveError, Transaction};
use crate::version::{is_obsolete, matching_target_versions, or_groups};

/// Hard backtracking-depth cap (`spec.md` §4.4): a pathological cache
/// shouldn't be able to spin the solver forever.
const MAX_DEPTH: u32 = 3_000;

/// One pending choice: satisfy a dependency (or a manual request) by
/// picking one of `candidates`. The queue orders these by
/// [`GroupLabel::rank`], then singleton-first, then non-optional-first,
/// then package-origin-before-version-origin.
#[derive(Debug, Clone)]
struct WorkItem {
    candidates: Vec<VerId>,
    /// The dependency's own declared target, used by the comparator's
    /// "in the dependency target's own group" tie-break. Equal to the
    /// package itself for a manual install/remove request.
    dep_target: PkgId,
    group: GroupLabel,
    optional: bool,
    origin: Origin,
    created_depth: u32,
}

impl WorkItem {
    /// Compared lexicographically, greatest first: group label dominates
    /// (`spec.md` §4.4's `HoldOrDelete > KeepAuto > ... > NewUnsatRecommends`),
    /// then singleton items before open choices, then non-optional before
    /// optional (Recommends), then package-origin before version-origin.
    fn priority_key(&self) -> (u8, bool, bool, u8) {
        (
            self.group.rank(),
            self.candidates.len() == 1,
            !self.optional,
            match self.origin {
                Origin::Package => 1,
                Origin::Version => 0,
            },
        )
    }
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.priority_key() == other.priority_key()
    }
}

impl Eq for WorkItem {}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorkItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority_key().cmp(&other.priority_key())
    }
}

/// A popped choice that had more than one live alternative (or was
/// optional): recorded so a later contradiction can reject the one we
/// tried and resume with the next-best.
struct ChoicePoint {
    /// Depth to rewind to if every remaining alternative also fails.
    depth: u32,
    remaining: Vec<VerId>,
    tried: VerId,
}

/// Runs the backtracking search described in `spec.md` §4.4 over a
/// read-only [`Cache`], producing a [`Transaction`] the caller applies to
/// a `debapt_depcache::DepCache`.
pub struct Solver<'c> {
    cache: &'c Cache,
    policy: &'c Policy,
    comparator: ProviderComparator<'c>,
    state: SolverState,
}

impl<'c> Solver<'c> {
    #[must_use]
    pub fn new(cache: &'c Cache, policy: &'c Policy) -> Self {
        Self { cache, policy, comparator: ProviderComparator::new(cache), state: SolverState::new(cache) }
    }

    pub fn solve(cache: &'c Cache, policy: &'c Policy, request: &Request) -> Result<Transaction, SolveError> {
        Self::new(cache, policy).run(request)
    }

    fn run(&mut self, request: &Request) -> Result<Transaction, SolveError> {
        let mut heap: BinaryHeap<WorkItem> = BinaryHeap::new();
        let mut choice_points: Vec<ChoicePoint> = Vec::new();
        let mut depth: u32 = 0;

        // Removals have no alternative to choose among, so they're
        // resolved eagerly rather than queued as a `HoldOrDelete` work
        // item (`DESIGN.md`).
        for &pkg in &request.remove {
            let current = self.cache.package(pkg).current_version;
            if current != 0
                && self.reject(VerId::new(current), Reason::Request, depth).is_err()
            {
                return Err(SolveError::Unsatisfiable(format!(
                    "cannot remove {}: required elsewhere",
                    self.cache.package_name(pkg)
                )));
            }
        }

        for &pkg in &request.install {
            let candidates = self.cache.package_versions(pkg);
            if candidates.is_empty() {
                return Err(SolveError::NoCandidate(pkg));
            }
            heap.push(WorkItem {
                candidates,
                dep_target: pkg,
                group: GroupLabel::InstallManual,
                optional: false,
                origin: Origin::Package,
                created_depth: depth,
            });
        }

        loop {
            let Some(item) = heap.pop() else { break };
            if item.created_depth > depth || item.candidates.iter().any(|&v| self.state.decision(v) == Decision::Must)
            {
                continue; // superseded by a backtrack, or already satisfied
            }

            let mut viable: Vec<VerId> =
                item.candidates.iter().copied().filter(|&v| self.state.decision(v) != Decision::MustNot).collect();
            if viable.is_empty() {
                if self.backtrack(&mut heap, &mut choice_points, &mut depth) {
                    continue;
                }
                return Err(SolveError::Unsatisfiable(format!(
                    "every alternative for a {:?} dependency is rejected",
                    item.group
                )));
            }

            self.comparator.sort_best_first(item.dep_target, &mut viable);
            let best = viable[0];
            let remaining = viable[1..].to_vec();
            if !remaining.is_empty() || item.optional {
                tracing::trace!(
                    package = self.cache.package_name(item.dep_target),
                    group = ?item.group,
                    alternatives = remaining.len(),
                    "choice point recorded",
                );
                choice_points.push(ChoicePoint { depth, remaining, tried: best });
            }

            depth += 1;
            if depth > MAX_DEPTH {
                return Err(SolveError::DepthExceeded);
            }

            let reason = match item.origin {
                Origin::Package => Reason::Request,
                Origin::Version => Reason::DependencyOf(best),
            };
            let committed = self.commit(best, reason, depth, &mut heap);
            if committed.is_err() && !self.backtrack(&mut heap, &mut choice_points, &mut depth) {
                return Err(SolveError::Unsatisfiable(format!("committing {best:?} contradicts an earlier decision")));
            }
        }

        let txn = self.build_transaction(request);
        tracing::debug!(installs = txn.install.len(), removes = txn.remove.len(), depth, "solve finished");
        Ok(txn)
    }

    /// Drive `ver` to `Must`: reject every sibling version, reject every
    /// Conflicts/Breaks/Obsoletes target, and queue each remaining
    /// critical (or policy-important) dependency OR-group.
    fn commit(&mut self, ver: VerId, reason: Reason, depth: u32, heap: &mut BinaryHeap<WorkItem>) -> Result<(), ()> {
        self.state.assign(ver, Decision::Must, reason, depth)?;

        let pkg = PkgId::new(self.cache.version(ver).parent_package);
        for other in self.cache.package_versions(pkg) {
            if other != ver {
                self.reject(other, Reason::SiblingOf(ver), depth)?;
            }
        }

        for dep_id in self.cache.version_depends(ver) {
            let dep = *self.cache.dependency(dep_id);
            if DepKind(dep.kind).is_negative() {
                for target in matching_target_versions(self.cache, dep_id) {
                    self.reject(target, Reason::NegativeDepOf(ver), depth)?;
                }
            }
        }

        let is_new = self.cache.package(pkg).current_version == 0;
        for group in or_groups(self.cache, ver) {
            let first = *self.cache.dependency(group[0]);
            let kind = DepKind(first.kind);
            if kind.is_negative() {
                continue; // already rejected above
            }
            if !self.policy.is_important_dep(kind, self.cache.version_section(ver)) {
                continue;
            }

            let candidates: Vec<VerId> = group.iter().flat_map(|&d| matching_target_versions(self.cache, d)).collect();
            if candidates.is_empty() {
                return Err(()); // no provider exists anywhere: unsatisfiable
            }
            if candidates.iter().any(|&v| self.state.decision(v) == Decision::Must) {
                continue; // satisfied by an earlier commit already
            }

            let label = if kind == DepKind::RECOMMENDS {
                GroupLabel::NewUnsatRecommends
            } else if is_new {
                GroupLabel::SatisfyNew
            } else if is_obsolete(self.cache, ver) {
                GroupLabel::SatisfyObsolete
            } else {
                GroupLabel::Satisfy
            };

            heap.push(WorkItem {
                candidates,
                dep_target: PkgId::new(first.target_package),
                group: label,
                optional: kind == DepKind::RECOMMENDS,
                origin: Origin::Version,
                created_depth: depth,
            });
        }

        Ok(())
    }

    /// Drive `ver` to `MustNot`, cascading into any reverse-dependency
    /// OR-group this was the last live alternative of.
    fn reject(&mut self, ver: VerId, reason: Reason, depth: u32) -> Result<(), ()> {
        let newly_rejected = self.state.assign(ver, Decision::MustNot, reason, depth)?;
        if !newly_rejected {
            return Ok(());
        }

        let cache = self.cache;
        let pkg = PkgId::new(cache.version(ver).parent_package);
        for dep_id in cache.package_rev_depends(pkg) {
            let dep = *cache.dependency(dep_id);
            if DepKind(dep.kind).is_negative() {
                continue;
            }
            let parent_ver = VerId::new(dep.parent_version);
            if self.state.decision(parent_ver) != Decision::Undecided {
                continue;
            }
            let Some(group) = or_groups(cache, parent_ver).into_iter().find(|g| g.contains(&dep_id)) else {
                continue;
            };
            let exhausted = group
                .iter()
                .all(|&d| matching_target_versions(cache, d).iter().all(|&v| self.state.decision(v) == Decision::MustNot));
            if exhausted {
                self.reject(parent_ver, Reason::GroupExhausted, depth)?;
            }
        }
        Ok(())
    }

    /// Pop choice points until one has a live alternative left that
    /// commits without contradiction, rewinding state and discarding
    /// superseded work items above each popped level as we go.
    fn backtrack(&mut self, heap: &mut BinaryHeap<WorkItem>, choice_points: &mut Vec<ChoicePoint>, depth: &mut u32) -> bool {
        while let Some(mut cp) = choice_points.pop() {
            tracing::debug!(rewind_to = cp.depth, alternatives_left = cp.remaining.len(), "backtracking");
            self.state.rewind_above(cp.depth);
            *depth = cp.depth;
            *heap = heap.drain().filter(|item| item.created_depth <= cp.depth).collect();
            let _ = self.reject(cp.tried, Reason::BacktrackExhausted, cp.depth);

            while let Some(next) = cp.remaining.pop() {
                if self.state.decision(next) == Decision::MustNot {
                    continue; // ruled out while this branch was live
                }
                *depth = cp.depth + 1;
                cp.tried = next;
                match self.commit(next, Reason::BacktrackExhausted, *depth, heap) {
                    Ok(()) => {
                        choice_points.push(cp);
                        return true;
                    }
                    Err(()) => {
                        self.state.rewind_above(cp.depth);
                        *depth = cp.depth;
                    }
                }
            }
        }
        false
    }

    fn build_transaction(&self, request: &Request) -> Transaction {
        let manual: HashSet<u32> = request.install.iter().map(|p| p.0).collect();
        let mut install = Vec::new();
        let mut remove = Vec::new();

        for idx in 1..=self.cache.header().package_count {
            let pkg = PkgId::new(idx);
            if let Some(ver) = self.state.package_will_be_installed(self.cache, pkg) {
                install.push(Decided { package: pkg, version: ver, auto: !manual.contains(&idx) });
            } else if self.cache.package(pkg).current_version != 0 && self.state.package_fully_rejected(self.cache, pkg) {
                remove.push(pkg);
            }
        }
        Transaction { install, remove }
    }
}

/// Solve `request` against `cache` under `policy`.
pub fn solve(cache: &Cache, policy: &Policy, request: &Request) -> Result<Transaction, SolveError> {
    Solver::solve(cache, policy, request)
}

#[cfg(test)]
mod tests {
    use debapt_cache::{CacheGenerator, CompareOp, DependencyRequest, MultiArch, Priority};

    use super::*;

    fn build(f: impl FnOnce(&mut CacheGenerator)) -> (tempfile::TempDir, Cache) {
        let dir = tempfile::tempdir().unwrap();
        let mut gen = CacheGenerator::new("amd64", vec!["amd64".to_owned()]);
        f(&mut gen);
        let path = dir.path().join("cache.bin");
        (dir, Cache::build(&gen, &path, 0).unwrap())
    }

    #[test]
    fn pulls_in_a_critical_dependency() {
        let (_dir, cache) = build(|gen| {
            let libc = gen.new_package("libc6", "amd64");
            gen.new_version(libc, "2.37-1", MultiArch::Same, Priority::Required, None, None, None, 1, 1, [1u8; 32]);

            let vim = gen.new_package("vim", "amd64");
            let vim_ver =
                gen.new_version(vim, "9.0-1", MultiArch::None, Priority::Optional, None, None, None, 1, 1, [2u8; 32]);
            gen.new_depends(
                vim_ver,
                &DependencyRequest {
                    target_package: "libc6",
                    target_arch: None,
                    version_constraint: Some((CompareOp::GreaterEq, "2.0")),
                    kind: DepKind::DEPENDS,
                    or_group: false,
                },
            );
        });

        let policy = Policy::new(false, false);
        let vim = cache.find_package("vim", "amd64").unwrap();
        let libc = cache.find_package("libc6", "amd64").unwrap();
        let mut request = Request::new();
        request.install(vim);

        let txn = solve(&cache, &policy, &request).unwrap();
        assert!(txn.install.iter().any(|d| d.package == vim && !d.auto));
        assert!(txn.install.iter().any(|d| d.package == libc && d.auto));
    }

    #[test]
    fn backtracks_past_a_higher_ranked_dead_end() {
        let (_dir, cache) = build(|gen| {
            let hi = gen.new_package("hi", "amd64");
            let hi_ver =
                gen.new_version(hi, "1.0-1", MultiArch::None, Priority::Important, None, None, None, 1, 1, [1u8; 32]);
            // "missing" is declared as a dependency target but never given
            // a version, so it has no provider at all.
            gen.new_depends(
                hi_ver,
                &DependencyRequest {
                    target_package: "missing",
                    target_arch: None,
                    version_constraint: None,
                    kind: DepKind::DEPENDS,
                    or_group: false,
                },
            );

            let lo = gen.new_package("lo", "amd64");
            gen.new_version(lo, "1.0-1", MultiArch::None, Priority::Optional, None, None, None, 1, 1, [2u8; 32]);

            let app = gen.new_package("app", "amd64");
            let app_ver =
                gen.new_version(app, "1.0-1", MultiArch::None, Priority::Optional, None, None, None, 1, 1, [3u8; 32]);
            gen.new_depends(
                app_ver,
                &DependencyRequest {
                    target_package: "hi",
                    target_arch: None,
                    version_constraint: None,
                    kind: DepKind::DEPENDS,
                    or_group: true,
                },
            );
            gen.new_depends(
                app_ver,
                &DependencyRequest {
                    target_package: "lo",
                    target_arch: None,
                    version_constraint: None,
                    kind: DepKind::DEPENDS,
                    or_group: false,
                },
            );
        });

        let policy = Policy::new(false, false);
        let app = cache.find_package("app", "amd64").unwrap();
        let hi = cache.find_package("hi", "amd64").unwrap();
        let lo = cache.find_package("lo", "amd64").unwrap();
        let mut request = Request::new();
        request.install(app);

        let txn = solve(&cache, &policy, &request).unwrap();
        assert!(txn.install.iter().any(|d| d.package == lo));
        assert!(!txn.install.iter().any(|d| d.package == hi));
    }

    #[test]
    fn reports_unsatisfiable_when_no_provider_exists() {
        let (_dir, cache) = build(|gen| {
            let app = gen.new_package("app2", "amd64");
            let ver = gen.new_version(app, "1.0-1", MultiArch::None, Priority::Optional, None, None, None, 1, 1, [1u8; 32]);
            gen.new_depends(
                ver,
                &DependencyRequest {
                    target_package: "nonexistent",
                    target_arch: None,
                    version_constraint: None,
                    kind: DepKind::DEPENDS,
                    or_group: false,
                },
            );
        });

        let policy = Policy::new(false, false);
        let app = cache.find_package("app2", "amd64").unwrap();
        let mut request = Request::new();
        request.install(app);

        assert!(matches!(solve(&cache, &policy, &request), Err(SolveError::Unsatisfiable(_))));
    }
}
