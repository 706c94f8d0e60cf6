//! Candidate-version selection and dependency-importance rules
//! (`spec.md` §4.3), grounded in `apt-pkg/policy.cc`'s `GetCandidateVer`
//! and `pkgDepCache::Policy::IsImportantDep`.

use ahash::AHashMap;
use debapt_cache::{Cache, DepKind, TrustFlags};
use debapt_core::ids::{PkgId, VerId};

/// What a [`Pin`] matches against: a specific version string, or a
/// release's archive/codename/origin/label (APT's `Pin: release a=...`).
#[derive(Debug, Clone)]
pub enum PinTarget {
    Version(String),
    Release(String),
}

/// One `Package::Pin-Priority` style preference override.
#[derive(Debug, Clone)]
pub struct Pin {
    /// Package name pattern; `"*"` matches every package, otherwise an
    /// exact (case-sensitive) name match.
    pub package_pattern: String,
    pub target: PinTarget,
    pub priority: i32,
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    pattern == "*" || pattern == name
}

/// Candidate-selection policy: install-recommends/suggests defaults (with
/// optional per-section overrides), and pins.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub install_recommends: bool,
    pub install_suggests: bool,
    /// Section name -> recommends override, for `APT::Install-Recommends-Sections`-style configuration.
    pub recommends_overrides: AHashMap<String, bool>,
    pub pins: Vec<Pin>,
}

impl Policy {
    #[must_use]
    pub fn new(install_recommends: bool, install_suggests: bool) -> Self {
        Self { install_recommends, install_suggests, recommends_overrides: AHashMap::new(), pins: Vec::new() }
    }

    /// `spec.md` §4.3's `IsImportantDep`: critical kinds always matter;
    /// Recommends/Suggests matter only if configured, with Recommends
    /// resolvable to a section-specific override.
    #[must_use]
    pub fn is_important_dep(&self, kind: DepKind, section: Option<&str>) -> bool {
        if kind.is_critical() {
            return true;
        }
        if kind == DepKind::RECOMMENDS {
            return section
                .and_then(|s| self.recommends_overrides.get(s).copied())
                .unwrap_or(self.install_recommends);
        }
        if kind == DepKind::SUGGESTS {
            return self.install_suggests;
        }
        false
    }

    /// A pin that explicitly names a version of `pkg`, at the highest
    /// matching priority. `None` if no pin matches.
    fn pinned_version(&self, cache: &Cache, pkg: PkgId) -> Option<VerId> {
        let name = cache.package_name(pkg);
        let mut best: Option<(i32, VerId)> = None;
        for pin in &self.pins {
            if !pattern_matches(&pin.package_pattern, name) {
                continue;
            }
            for ver in cache.package_versions(pkg) {
                let matches = match &pin.target {
                    PinTarget::Version(v) => cache.version_string(ver) == v,
                    PinTarget::Release(r) => cache.version_files(ver).iter().any(|&file| {
                        cache
                            .package_file_release(file)
                            .is_some_and(|rls| release_matches(cache, rls, r))
                    }),
                };
                if matches && best.is_none_or(|(p, _)| pin.priority > p) {
                    best = Some((pin.priority, ver));
                }
            }
        }
        best.map(|(_, v)| v)
    }

    fn has_downloadable_file(&self, cache: &Cache, ver: VerId) -> bool {
        let files = cache.version_files(ver);
        if files.is_empty() {
            return false;
        }
        files.iter().any(|&f| {
            cache
                .package_file_release(f)
                .is_none_or(|rls| !TrustFlags(rls.trust_flags).contains(TrustFlags::NOT_SOURCE))
        })
    }

    fn is_automatic(&self, cache: &Cache, ver: VerId) -> bool {
        cache.version_files(ver).iter().any(|&f| {
            cache.package_file_release(f).is_none_or(|rls| {
                let flags = TrustFlags(rls.trust_flags);
                !flags.contains(TrustFlags::NOT_AUTOMATIC) && !flags.contains(TrustFlags::NOT_SOURCE)
            })
        })
    }

    fn is_but_automatic_upgrades(&self, cache: &Cache, ver: VerId) -> bool {
        cache.version_files(ver).iter().any(|&f| {
            cache
                .package_file_release(f)
                .is_some_and(|rls| TrustFlags(rls.trust_flags).contains(TrustFlags::BUT_AUTOMATIC_UPGRADES))
        })
    }

    /// `spec.md` §4.3's `GetCandidate`: scans version/file edges for the
    /// highest-priority version whose file is not `NotSource`, respecting
    /// `NotAutomatic`/`ButAutomaticUpgrades`; pins win outright.
    #[must_use]
    pub fn get_candidate(&self, cache: &Cache, pkg: PkgId) -> Option<VerId> {
        if let Some(pinned) = self.pinned_version(cache, pkg) {
            return Some(pinned);
        }

        let versions = cache.package_versions(pkg);
        let any_automatic = versions.iter().any(|&v| self.is_automatic(cache, v));
        let currently_installed = cache.package(pkg).current_version != 0;

        for ver in versions {
            if !self.has_downloadable_file(cache, ver) {
                continue;
            }
            if self.is_automatic(cache, ver) {
                return Some(ver);
            }
            if self.is_but_automatic_upgrades(cache, ver) {
                if currently_installed {
                    return Some(ver);
                }
                continue;
            }
            if !any_automatic {
                return Some(ver);
            }
        }
        None
    }
}

fn release_matches(cache: &Cache, rls: &debapt_cache::ReleaseFile, pattern: &str) -> bool {
    let fields = [
        cache.mixed_str(rls.archive),
        cache.mixed_str(rls.codename),
        cache.mixed_str(rls.origin),
        cache.mixed_str(rls.label),
    ];
    fields.into_iter().flatten().any(|f| f == pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommends_default_and_override() {
        let mut policy = Policy::new(false, false);
        policy.recommends_overrides.insert("games".to_owned(), true);
        assert!(!policy.is_important_dep(DepKind::RECOMMENDS, Some("admin")));
        assert!(policy.is_important_dep(DepKind::RECOMMENDS, Some("games")));
        assert!(policy.is_important_dep(DepKind::DEPENDS, None));
    }

    #[test]
    fn suggests_follows_global_flag() {
        let policy = Policy::new(false, true);
        assert!(policy.is_important_dep(DepKind::SUGGESTS, None));
    }
}
