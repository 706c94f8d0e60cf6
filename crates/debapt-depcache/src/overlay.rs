//! The dependency-cache overlay: mark/sweep package-selection state layered
//! on top of the read-only [`Cache`], grounded in `apt-pkg/depcache.cc`'s
//! `pkgDepCache` (`MarkInstall`/`MarkDelete`/`MarkKeep`/`Update`/
//! `MarkAndSweep`/`IsImportantDep`). Method names follow
//! `examples/volitank-rust-apt/src/depcache.rs`'s Rust-facing surface.

use std::cmp::{Ordering, Reverse};

use bytemuck::{Pod, Zeroable};
use debapt_cache::{Cache, DepKind, MultiArch, PkgFlags};
use debapt_core::ids::{DepId, GrpId, PkgId, VerId};

use crate::policy::Policy;

/// A small `u8`-backed bitflags type, mirroring `debapt-cache::entities`'s
/// macro of the same shape -- this crate's flag sets are distinct enough
/// (and small enough) that sharing the macro across a crate boundary isn't
/// worth a `pub` export from `debapt-cache`.
macro_rules! bitflags_u8 {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: u8 {
            $(const $variant:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
        pub struct $name(pub u8);

        impl $name {
            $(pub const $variant: Self = Self($value);)*

            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            #[must_use]
            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            #[must_use]
            pub const fn without(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }
        }
    };
}

/// What will happen to a package at the next transaction commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Keep,
    Install,
    Delete,
}

bitflags_u8! {
    /// Per-package flags (`spec.md` §4.2).
    pub struct StateFlags: u8 {
        const AUTO = 0b0000_0001;
        const PROTECTED = 0b0000_0010;
        const PURGE = 0b0000_0100;
        const REINSTALL = 0b0000_1000;
        const MARKED_BY_SWEEP = 0b0001_0000;
        const GARBAGE = 0b0010_0000;
    }
}

bitflags_u8! {
    /// Per-package dependency roll-up. A set bit means "satisfied": every
    /// dependency at that severity/state is met, i.e. the package is
    /// *not* broken along that dimension. `_MIN` considers only critical
    /// deps (Depends/PreDepends/Conflicts/Breaks); `_POLICY` additionally
    /// considers Recommends/Suggests when [`Policy`] says they matter.
    pub struct DepRollup: u8 {
        const NOW_MIN = 0b0000_0001;
        const NOW_POLICY = 0b0000_0010;
        const INSTALL_MIN = 0b0000_0100;
        const INSTALL_POLICY = 0b0000_1000;
        const CVER_MIN = 0b0001_0000;
        const CVER_POLICY = 0b0010_0000;
    }
}

bitflags_u8! {
    /// Per-dependency mirror of [`DepRollup`]'s three states, plus an
    /// OR-group carry bit set once an earlier member of the same group was
    /// found satisfied (so the rest of the group doesn't need rechecking).
    pub struct DepState: u8 {
        const NOW = 0b0000_0001;
        const INSTALL = 0b0000_0010;
        const CVER = 0b0000_0100;
        const OR_GROUP_CARRY = 0b0000_1000;
    }
}

/// Per-package overlay state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageState {
    pub mode: Mode,
    pub install_version: Option<VerId>,
    pub candidate_version: Option<VerId>,
    pub flags: StateFlags,
    pub held: bool,
    /// "Install-broken": the effective version's critical deps aren't all
    /// satisfiable given the planned transaction.
    pub broken: bool,
    /// "Now-broken": the *currently installed* version's critical deps
    /// aren't all satisfied by what's on disk right now.
    pub now_broken: bool,
    pub dep_rollup: DepRollup,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MarkError {
    #[error("package is held by dpkg")]
    Held,
    #[error("package has no install candidate")]
    NoCandidate,
    #[error("package is protected against this mode change")]
    Protected,
}

/// Which system state a dependency is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    /// The currently-installed package set.
    Now,
    /// The set that would exist after applying pending marks.
    Install,
    /// Each target's own candidate version, ignoring marks entirely.
    CVer,
}

/// Recover OR-group declaration order and chunk into groups.
///
/// `version_depends` walks a chain built by prepend (`gen.rs`'s
/// `raw_new_depends`), so it yields the *reverse* of declaration order;
/// reversing it back is cheaper than re-deriving grouping on the reversed
/// list. A group is a maximal run ending in (and including) the first
/// member whose `or_group` flag is false.
fn or_groups(cache: &Cache, ver: VerId) -> Vec<Vec<DepId>> {
    let mut deps = cache.version_depends(ver);
    deps.reverse();
    let mut groups = Vec::new();
    let mut current = Vec::new();
    for dep_id in deps {
        let continues = cache.dependency(dep_id).or_group != 0;
        current.push(dep_id);
        if !continues {
            groups.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

fn version_satisfies_constraint(cache: &Cache, dep_id: DepId, candidate_ver_str: &str) -> bool {
    match cache.dependency_constraint(dep_id) {
        None => true,
        Some((op, constraint_str)) => {
            match (candidate_ver_str.parse::<deb::version::Version>(), constraint_str.parse::<deb::version::Version>())
            {
                (Ok(lhs), Ok(rhs)) => op.eval(&lhs, &rhs),
                _ => false,
            }
        }
    }
}

/// Rank tuple for the Provider Comparator (`spec.md` §4.2): compared
/// lexicographically, greater wins. Fields, in tie-break order: (a)
/// sibling installed under multi-arch=same, (b) currently installed, (c)
/// in the dependency target's own group, (d) essential, (e) important,
/// (f) architecture rank (native highest, then declared order), (g)
/// priority, (h) lower internal id (encoded as `Reverse` so smaller wins).
type ProviderRank = (bool, bool, bool, bool, bool, usize, u8, Reverse<u32>);

/// Mark/sweep overlay atop a read-only [`Cache`].
pub struct DepCache<'c> {
    cache: &'c Cache,
    policy: Policy,
    package_states: Vec<PackageState>,
    dep_states: Vec<DepState>,
    action_group_depth: u32,
    sweep_pending: bool,
    /// Packages kept reachable regardless of the ordinary root-set rules
    /// ("regex-protected"/"kernel-keep" in `spec.md` §4.2): callers resolve
    /// the regex/running-kernel question and feed the result in here.
    extra_roots: Vec<PkgId>,
    native_arch: String,
    declared_archs: Vec<String>,
}

impl<'c> DepCache<'c> {
    #[must_use]
    pub fn new(cache: &'c Cache, policy: Policy) -> Self {
        let pkg_count = cache.header().package_count as usize;
        let dep_count = cache.header().dependency_count as usize;

        let mut package_states = vec![PackageState::default(); pkg_count + 1];
        for (idx, state) in package_states.iter_mut().enumerate().skip(1) {
            state.candidate_version = policy.get_candidate(cache, PkgId::new(idx as u32));
        }

        let native_arch = cache.mixed_str(cache.header().native_arch).unwrap_or_default().to_owned();
        let declared_archs = cache
            .mixed_str(cache.header().declared_archs)
            .map(|s| s.split(',').map(str::to_owned).collect())
            .unwrap_or_default();

        let mut this = Self {
            cache,
            policy,
            package_states,
            dep_states: vec![DepState::default(); dep_count + 1],
            action_group_depth: 0,
            sweep_pending: false,
            extra_roots: Vec::new(),
            native_arch,
            declared_archs,
        };
        this.update();
        this
    }

    #[must_use]
    pub fn package_state(&self, pkg: PkgId) -> &PackageState {
        &self.package_states[pkg.index()]
    }

    fn package_state_mut(&mut self, pkg: PkgId) -> &mut PackageState {
        &mut self.package_states[pkg.index()]
    }

    pub fn add_root(&mut self, pkg: PkgId) {
        self.extra_roots.push(pkg);
    }

    pub fn protect(&mut self, pkg: PkgId, protected: bool) {
        let flags = self.package_state(pkg).flags;
        self.package_state_mut(pkg).flags =
            if protected { flags.union(StateFlags::PROTECTED) } else { flags.without(StateFlags::PROTECTED) };
    }

    pub fn set_held(&mut self, pkg: PkgId, held: bool) {
        self.package_state_mut(pkg).held = held;
    }

    pub fn set_candidate(&mut self, pkg: PkgId, ver: VerId) {
        self.package_state_mut(pkg).candidate_version = Some(ver);
    }

    pub fn mark_auto(&mut self, pkg: PkgId, auto: bool) {
        let flags = self.package_state(pkg).flags;
        self.package_state_mut(pkg).flags = if auto { flags.union(StateFlags::AUTO) } else { flags.without(StateFlags::AUTO) };
    }

    #[must_use]
    pub fn is_auto_installed(&self, pkg: PkgId) -> bool {
        self.package_state(pkg).flags.contains(StateFlags::AUTO)
    }

    #[must_use]
    pub fn is_now_broken(&self, pkg: PkgId) -> bool {
        self.package_state(pkg).now_broken
    }

    #[must_use]
    pub fn is_inst_broken(&self, pkg: PkgId) -> bool {
        self.package_state(pkg).broken
    }

    #[must_use]
    pub fn install_count(&self) -> usize {
        self.package_states[1..].iter().filter(|s| s.mode == Mode::Install).count()
    }

    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.package_states[1..].iter().filter(|s| s.mode == Mode::Delete).count()
    }

    #[must_use]
    pub fn keep_count(&self) -> usize {
        self.package_states[1..].iter().filter(|s| s.mode == Mode::Keep).count()
    }

    #[must_use]
    pub fn broken_count(&self) -> usize {
        self.package_states[1..].iter().filter(|s| s.broken).count()
    }

    /// `MarkKeep`: resets to the current version, clearing any pending
    /// install or delete intent.
    pub fn mark_keep(&mut self, pkg: PkgId) {
        let st = self.package_state_mut(pkg);
        st.mode = Mode::Keep;
        st.install_version = None;
        st.flags = st.flags.without(StateFlags::PURGE).without(StateFlags::REINSTALL);
        self.request_sweep();
    }

    /// `MarkDelete`: refused if `pkg` is a protected install request.
    pub fn mark_delete(&mut self, pkg: PkgId, purge: bool) -> Result<(), MarkError> {
        let state = *self.package_state(pkg);
        if state.mode == Mode::Install && state.flags.contains(StateFlags::PROTECTED) {
            return Err(MarkError::Protected);
        }
        let st = self.package_state_mut(pkg);
        st.mode = Mode::Delete;
        st.install_version = None;
        st.flags = if purge { st.flags.union(StateFlags::PURGE) } else { st.flags };
        // Deleting a package directly is never itself an auto-install side effect.
        st.flags = st.flags.without(StateFlags::AUTO);
        tracing::debug!(pkg = pkg.0, purge, "marked for delete");
        self.request_sweep();
        Ok(())
    }

    /// `MarkInstall`: refused for a held package (unless `override_hold`)
    /// or one protected against becoming installed. When `auto_install`,
    /// walks each critical OR-group of the candidate version and recurses
    /// into the best provider per [`Self::compare_providers`].
    ///
    /// Unlike the full solver, this is a single greedy pass: the first
    /// dependency it can't resolve aborts the call rather than
    /// backtracking to try a different combination.
    pub fn mark_install(&mut self, pkg: PkgId, auto_install: bool, override_hold: bool) -> Result<(), MarkError> {
        let state = *self.package_state(pkg);
        if state.held && !override_hold {
            return Err(MarkError::Held);
        }
        if state.mode == Mode::Delete && state.flags.contains(StateFlags::PROTECTED) {
            return Err(MarkError::Protected);
        }
        let Some(candidate) = state.candidate_version else {
            return Err(MarkError::NoCandidate);
        };

        self.package_state_mut(pkg).mode = Mode::Install;
        self.package_state_mut(pkg).install_version = Some(candidate);
        tracing::debug!(pkg = pkg.0, candidate = candidate.0, auto_install, "marked for install");

        if auto_install {
            for group in or_groups(self.cache, candidate) {
                if DepKind(self.cache.dependency(group[0]).kind).is_critical() {
                    self.auto_install_group(&group)?;
                }
            }
        }

        self.request_sweep();
        Ok(())
    }

    fn auto_install_group(&mut self, group: &[DepId]) -> Result<(), MarkError> {
        if group.iter().any(|&d| self.dep_satisfied(d, Edge::Install)) {
            return Ok(());
        }
        let reference_target = PkgId::new(self.cache.dependency(group[0]).target_package);

        let mut best: Option<(PkgId, VerId)> = None;
        for &dep_id in group {
            let target = PkgId::new(self.cache.dependency(dep_id).target_package);
            let Some(candidate) = self.package_state(target).candidate_version else { continue };
            if !version_satisfies_constraint(self.cache, dep_id, self.cache.version_string(candidate)) {
                continue;
            }
            best = match best {
                None => Some((target, candidate)),
                Some((_, current_best))
                    if self.compare_providers(reference_target, candidate, current_best) == Ordering::Greater =>
                {
                    Some((target, candidate))
                }
                kept => kept,
            };
        }

        if let Some((target, _)) = best {
            self.mark_install(target, true, false)?;
        }
        Ok(())
    }

    /// `spec.md` §4.2's Provider Comparator.
    #[must_use]
    pub fn compare_providers(&self, dep_target: PkgId, a: VerId, b: VerId) -> Ordering {
        self.provider_rank(dep_target, a).cmp(&self.provider_rank(dep_target, b))
    }

    fn provider_rank(&self, dep_target: PkgId, ver: VerId) -> ProviderRank {
        let version = *self.cache.version(ver);
        let pkg = PkgId::new(version.parent_package);
        let pkg_rec = *self.cache.package(pkg);

        let sibling_installed = self.cache.version_multi_arch(ver) == MultiArch::Same
            && self
                .cache
                .group_packages(GrpId::new(pkg_rec.group))
                .into_iter()
                .any(|sib| sib != pkg && self.cache.package(sib).current_version != 0);
        let currently_installed = pkg_rec.current_version == ver.0;
        let in_target_group = pkg_rec.group == self.cache.package(dep_target).group;
        let essential = PkgFlags(pkg_rec.flags).contains(PkgFlags::ESSENTIAL);
        let important = PkgFlags(pkg_rec.flags).contains(PkgFlags::IMPORTANT);
        let arch_rank = self.arch_rank(self.cache.package_arch(pkg));
        let priority = version.priority;

        (
            sibling_installed,
            currently_installed,
            in_target_group,
            essential,
            important,
            arch_rank,
            priority,
            Reverse(version.id),
        )
    }

    fn arch_rank(&self, arch: &str) -> usize {
        if arch == self.native_arch {
            return usize::MAX;
        }
        self.declared_archs.iter().position(|a| a == arch).map_or(0, |pos| self.declared_archs.len() - pos)
    }

    fn effective_version(&self, pkg: PkgId) -> Option<VerId> {
        let st = self.package_state(pkg);
        match st.mode {
            Mode::Delete => None,
            Mode::Install => st.install_version.or(st.candidate_version),
            Mode::Keep => {
                let cur = self.cache.package(pkg).current_version;
                (cur != 0).then(|| VerId::new(cur))
            }
        }
    }

    fn will_remain_installed(&self, pkg: PkgId) -> bool {
        match self.package_state(pkg).mode {
            Mode::Delete => false,
            Mode::Install => true,
            Mode::Keep => self.cache.package(pkg).current_version != 0,
        }
    }

    fn dep_satisfied(&self, dep_id: DepId, edge: Edge) -> bool {
        let dep = self.cache.dependency(dep_id);
        let kind = DepKind(dep.kind);
        let target = PkgId::new(dep.target_package);

        let target_ver = match edge {
            Edge::Now => {
                let cur = self.cache.package(target).current_version;
                (cur != 0).then(|| VerId::new(cur))
            }
            Edge::Install => self.effective_version(target),
            Edge::CVer => self.package_state(target).candidate_version,
        };

        let present_and_matches = target_ver
            .is_some_and(|v| version_satisfies_constraint(self.cache, dep_id, self.cache.version_string(v)));

        if kind.is_negative() { !present_and_matches } else { present_and_matches }
    }

    fn set_dep_bit(&mut self, dep: DepId, bit: DepState, value: bool) {
        let idx = dep.index();
        self.dep_states[idx] = if value { self.dep_states[idx].union(bit) } else { self.dep_states[idx].without(bit) };
    }

    /// `Update`: recompute every per-dependency bit and roll each package
    /// up to its Now-broken / install-broken summary bits.
    pub fn update(&mut self) {
        let pkg_count = self.cache.header().package_count as usize;
        for idx in 1..=pkg_count {
            let pkg = PkgId::new(idx as u32);
            self.update_package(pkg);
        }
    }

    fn update_package(&mut self, pkg: PkgId) {
        let mut now_min = true;
        let mut now_policy = true;
        let mut install_min = true;
        let mut install_policy = true;
        let mut cver_min = true;
        let mut cver_policy = true;

        let current = self.cache.package(pkg).current_version;
        if current != 0 {
            let ver = VerId::new(current);
            let (min, policy) = self.evaluate_groups(ver, Edge::Now, DepState::NOW);
            now_min = min;
            now_policy = policy;
        }

        if let Some(ver) = self.effective_version(pkg) {
            let (min, policy) = self.evaluate_groups(ver, Edge::Install, DepState::INSTALL);
            install_min = min;
            install_policy = policy;
        }

        if let Some(ver) = self.package_state(pkg).candidate_version {
            let (min, policy) = self.evaluate_groups(ver, Edge::CVer, DepState::CVER);
            cver_min = min;
            cver_policy = policy;
        }

        let mut rollup = DepRollup::default();
        if now_min {
            rollup = rollup.union(DepRollup::NOW_MIN);
        }
        if now_policy {
            rollup = rollup.union(DepRollup::NOW_POLICY);
        }
        if install_min {
            rollup = rollup.union(DepRollup::INSTALL_MIN);
        }
        if install_policy {
            rollup = rollup.union(DepRollup::INSTALL_POLICY);
        }
        if cver_min {
            rollup = rollup.union(DepRollup::CVER_MIN);
        }
        if cver_policy {
            rollup = rollup.union(DepRollup::CVER_POLICY);
        }

        let has_effective = self.effective_version(pkg).is_some();
        let st = self.package_state_mut(pkg);
        st.dep_rollup = rollup;
        st.now_broken = current != 0 && !now_min;
        st.broken = has_effective && !install_min;
    }

    /// Walk `ver`'s OR-groups, evaluating each against `edge`, and return
    /// `(all_critical_satisfied, all_policy_relevant_satisfied)`.
    fn evaluate_groups(&mut self, ver: VerId, edge: Edge, bit: DepState) -> (bool, bool) {
        let mut all_min = true;
        let mut all_policy = true;
        let section = self.cache.version_section(ver).map(str::to_owned);
        for group in or_groups(self.cache, ver) {
            let kind = DepKind(self.cache.dependency(group[0]).kind);
            let critical = kind.is_critical();
            let important = critical || self.policy.is_important_dep(kind, section.as_deref());
            if !important {
                continue;
            }
            let mut satisfied = false;
            for &dep_id in &group {
                let member_satisfied = self.dep_satisfied(dep_id, edge);
                self.set_dep_bit(dep_id, bit, member_satisfied);
                if member_satisfied {
                    if satisfied {
                        self.set_dep_bit(dep_id, DepState::OR_GROUP_CARRY, true);
                    }
                    satisfied = true;
                }
            }
            if critical && !satisfied {
                all_min = false;
            }
            if !satisfied {
                all_policy = false;
            }
        }
        (all_min, all_policy)
    }

    /// Begin a scoped action group: nested `mark_*` calls defer
    /// [`Self::mark_and_sweep`] until the outermost guard drops.
    pub fn action_group(&mut self) -> ActionGroup<'_, 'c> {
        self.action_group_depth += 1;
        ActionGroup { depcache: self }
    }

    fn request_sweep(&mut self) {
        self.sweep_pending = true;
        if self.action_group_depth == 0 {
            self.mark_and_sweep();
        }
    }

    /// `MarkAndSweep`: mark everything reachable from the root set
    /// (protected, essential, required, user-protected/regex-protected via
    /// [`Self::add_root`]) across Depends/PreDepends, plus Recommends and
    /// Suggests if [`Policy`] enables them. Installed packages left
    /// unmarked become garbage.
    pub fn mark_and_sweep(&mut self) {
        tracing::trace!("running mark-and-sweep");
        self.update();
        let pkg_count = self.cache.header().package_count as usize;

        for st in &mut self.package_states[1..=pkg_count] {
            st.flags = st.flags.without(StateFlags::MARKED_BY_SWEEP).without(StateFlags::GARBAGE);
        }

        let mut stack: Vec<PkgId> = self.extra_roots.clone();
        for idx in 1..=pkg_count {
            let pkg = PkgId::new(idx as u32);
            if self.is_root(pkg) {
                stack.push(pkg);
            }
        }

        while let Some(pkg) = stack.pop() {
            let st = self.package_state_mut(pkg);
            if st.flags.contains(StateFlags::MARKED_BY_SWEEP) {
                continue;
            }
            st.flags = st.flags.union(StateFlags::MARKED_BY_SWEEP);

            let Some(ver) = self.effective_version(pkg) else { continue };
            for dep_id in self.cache.version_depends(ver) {
                let dep = self.cache.dependency(dep_id);
                let kind = DepKind(dep.kind);
                let follow = kind == DepKind::DEPENDS
                    || kind == DepKind::PRE_DEPENDS
                    || (kind == DepKind::RECOMMENDS && self.policy.install_recommends)
                    || (kind == DepKind::SUGGESTS && self.policy.install_suggests);
                if follow {
                    stack.push(PkgId::new(dep.target_package));
                }
            }
        }

        for idx in 1..=pkg_count {
            let pkg = PkgId::new(idx as u32);
            if self.will_remain_installed(pkg) && !self.package_state(pkg).flags.contains(StateFlags::MARKED_BY_SWEEP) {
                let flags = self.package_state(pkg).flags;
                self.package_state_mut(pkg).flags = flags.union(StateFlags::GARBAGE);
            }
        }

        self.sweep_pending = false;
        tracing::debug!(
            garbage = self.package_states[1..].iter().filter(|s| s.flags.contains(StateFlags::GARBAGE)).count(),
            "mark-and-sweep complete"
        );
    }

    fn is_root(&self, pkg: PkgId) -> bool {
        let st = self.package_state(pkg);
        if st.flags.contains(StateFlags::PROTECTED) {
            return true;
        }
        if PkgFlags(self.cache.package(pkg).flags).contains(PkgFlags::ESSENTIAL) {
            return true;
        }
        if let Some(ver) = self.effective_version(pkg) {
            if self.cache.version_priority(ver) == debapt_cache::Priority::Required {
                return true;
            }
        }
        self.will_remain_installed(pkg) && !st.flags.contains(StateFlags::AUTO)
    }
}

/// RAII guard for [`DepCache::action_group`].
pub struct ActionGroup<'a, 'c> {
    depcache: &'a mut DepCache<'c>,
}

impl Drop for ActionGroup<'_, '_> {
    fn drop(&mut self) {
        self.depcache.action_group_depth -= 1;
        if self.depcache.action_group_depth == 0 && self.depcache.sweep_pending {
            self.depcache.mark_and_sweep();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debapt_cache::{CacheGenerator, CompareOp, DependencyRequest, Priority};

    fn simple_cache() -> (tempfile::TempDir, Cache) {
        let dir = tempfile::tempdir().unwrap();
        let mut gen = CacheGenerator::new("amd64", vec!["amd64".to_owned()]);

        let libc = gen.new_package("libc6", "amd64");
        gen.new_version(libc, "2.37-1", MultiArch::Same, Priority::Required, Some("libs"), None, None, 1, 1, [1u8; 32]);

        let vim = gen.new_package("vim", "amd64");
        let vim_ver =
            gen.new_version(vim, "9.0-1", MultiArch::None, Priority::Optional, Some("editors"), None, None, 1, 1, [2u8; 32]);
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

        let path = dir.path().join("cache.bin");
        let cache = Cache::build(&gen, &path, 0).unwrap();
        (dir, cache)
    }

    #[test]
    fn mark_install_pulls_in_critical_dependency() {
        let (_dir, cache) = simple_cache();
        let mut dc = DepCache::new(&cache, Policy::new(false, false));
        let vim = cache.find_package("vim", "amd64").unwrap();
        dc.mark_install(vim, true, false).unwrap();

        assert_eq!(dc.package_state(vim).mode, Mode::Install);
        let libc = cache.find_package("libc6", "amd64").unwrap();
        assert_eq!(dc.package_state(libc).mode, Mode::Install);
        assert!(!dc.is_inst_broken(vim));
    }

    #[test]
    fn mark_delete_refuses_protected_install() {
        let (_dir, cache) = simple_cache();
        let mut dc = DepCache::new(&cache, Policy::new(false, false));
        let vim = cache.find_package("vim", "amd64").unwrap();
        dc.mark_install(vim, false, false).unwrap();
        dc.protect(vim, true);

        assert_eq!(dc.mark_delete(vim, false), Err(MarkError::Protected));
    }

    #[test]
    fn garbage_marks_unreachable_auto_installed_package() {
        let (_dir, cache) = simple_cache();
        let mut dc = DepCache::new(&cache, Policy::new(false, false));
        let vim = cache.find_package("vim", "amd64").unwrap();
        let libc = cache.find_package("libc6", "amd64").unwrap();

        dc.mark_install(libc, false, false).unwrap();
        dc.mark_auto(libc, true);
        dc.mark_and_sweep();
        assert!(dc.package_state(libc).flags.contains(StateFlags::GARBAGE));

        dc.mark_install(vim, true, false).unwrap();
        dc.mark_and_sweep();
        assert!(!dc.package_state(libc).flags.contains(StateFlags::GARBAGE));
    }

    #[test]
    fn action_group_defers_sweep_until_outer_scope_closes() {
        let (_dir, cache) = simple_cache();
        let mut dc = DepCache::new(&cache, Policy::new(false, false));
        let libc = cache.find_package("libc6", "amd64").unwrap();
        {
            let mut group = dc.action_group();
            group.depcache.mark_install(libc, false, false).unwrap();
            group.depcache.mark_auto(libc, true);
            assert!(!group.depcache.package_state(libc).flags.contains(StateFlags::MARKED_BY_SWEEP));
        }
        assert!(dc.package_state(libc).flags.contains(StateFlags::MARKED_BY_SWEEP));
    }
}
