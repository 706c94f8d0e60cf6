//! Turns a solved [`debapt_depcache::DepCache`] transaction into the
//! [`debapt_acquire::Item`] list the acquire engine needs to actually
//! fetch something, grounded in `apt-private/private-install.cc`'s
//! `InstallPackages`: walk every package marked for install, resolve its
//! candidate version to a download, and (for already-unpacked local
//! `.deb`s or a mounted CD-ROM) skip the network entirely.
//!
//! Four cases, per `apt-private/private-install.cc` and
//! `apt-private/private-cdrom.cc`:
//! - **install**: fetch a missing `.deb` from its owning repository.
//! - **source-fetch**: fetch every file a `Sources` stanza lists (the
//!   `.dsc` plus its tarballs) straight off the `Directory` field, no
//!   solver involved.
//! - **build-dep**: parse a `Sources` stanza's `Build-Depends`/
//!   `Build-Depends-Indep`/`Build-Depends-Arch` into a solver
//!   [`debapt_solver::Request`], solve it, apply the resulting
//!   transaction onto the caller's `DepCache`, then recurse into
//!   [`plan_install`] to fetch whatever it decided to install.
//! - **cdrom-import**: the package's file is already present under a
//!   mounted disc; no network fetch needed, just a path to hand the
//!   unpack step.

pub mod error;

pub use error::{PlanError, Result};

use std::path::{Path, PathBuf};

use debapt_acquire::Item;
use debapt_cache::{Cache, TrustFlags};
use debapt_core::ids::{PkgId, VerId};
use debapt_depcache::{DepCache, Mode, Policy};
use debapt_index::{Records, SourceStanza};
use debapt_solver::{solve, Request};

/// One resolved download: where it's from, where it lands, and the
/// metadata needed to verify it on arrival.
#[derive(Debug, Clone)]
pub struct PlannedFetch {
    pub package: String,
    pub version: String,
    pub item: Item,
    /// `true` if the owning release was accepted trusted; callers that
    /// enforce `APT::Get::AllowUnauthenticated` check this.
    pub trusted: bool,
}

/// Build one [`Item`] for every package [`DepCache`] marked for install
/// whose candidate isn't already unpacked, using `records` (built during
/// index merge) to recover each version's `Filename`/hash/size and the
/// cache's own release-file graph to recover the repository's base URI.
///
/// Packages whose candidate has no backing `PackageFile` at all (a
/// locally-installed `.deb` with no remaining repository record) are
/// silently skipped -- there's nothing to fetch, which mirrors apt
/// treating a `Filename: ` of `/var/lib/dpkg/status` as "already here".
///
/// # Errors
/// Returns [`PlanError::MissingCandidate`] if a package is marked
/// install with no candidate version, or [`PlanError::MissingRecord`] if
/// `records` has nothing for that version (an index/plan mismatch).
pub fn plan_install(cache: &Cache, depcache: &DepCache<'_>, records: &Records, archives_dir: &Path) -> Result<Vec<PlannedFetch>> {
    let mut fetches = Vec::new();
    let package_count = cache.header().package_count;

    for raw in 1..=package_count {
        let pkg = PkgId::new(raw);
        let state = depcache.package_state(pkg);
        if state.mode != Mode::Install {
            continue;
        }
        let Some(ver) = state.install_version else {
            return Err(PlanError::MissingCandidate(cache.package_name(pkg).to_owned()));
        };

        let Some(fetch) = plan_one_version(cache, records, archives_dir, ver)? else {
            continue;
        };
        fetches.push(fetch);
    }

    Ok(fetches)
}

fn plan_one_version(cache: &Cache, records: &Records, archives_dir: &Path, ver: VerId) -> Result<Option<PlannedFetch>> {
    let Some(file) = cache.version_files(ver).into_iter().next() else {
        return Ok(None);
    };
    let Some(release) = cache.package_file_release(file) else {
        return Ok(None);
    };

    let package_name = cache.package_name(ver_package(cache, ver)).to_owned();
    let version_str = cache.version_string(ver).to_owned();

    let record = records
        .get(&ver)
        .ok_or_else(|| PlanError::MissingRecord { package: package_name.clone(), version: version_str.clone() })?;

    let site = cache.mixed_str(release.site).unwrap_or_default();
    let uri = join_uri(site, &record.filename);

    let basename = Path::new(&record.filename).file_name().map_or_else(|| record.filename.clone(), |n| n.to_string_lossy().into_owned());
    let destination = archives_dir.join("partial").join(&basename);

    let mut item = Item::new(uri, destination);
    item.expected_size = Some(record.size);
    if let Some(sha256) = &record.sha256 {
        item.expected_hashes.insert("SHA256".to_owned(), sha256.clone());
        item.hashes_required = true;
    }

    Ok(Some(PlannedFetch {
        package: package_name,
        version: version_str,
        item,
        trusted: TrustFlags(release.trust_flags).contains(TrustFlags::TRUSTED),
    }))
}

/// `Version` doesn't carry its own package id in a way the public API
/// exposes directly outside `debapt-cache`; `parent_package` is public on
/// the entity struct, so read it through `cache.version`.
fn ver_package(cache: &Cache, ver: VerId) -> PkgId {
    PkgId::new(cache.version(ver).parent_package)
}

fn join_uri(site: &str, filename: &str) -> String {
    if site.ends_with('/') {
        format!("{site}{filename}")
    } else {
        format!("{site}/{filename}")
    }
}

/// Planning for `apt-get source`: one [`Item`] per file the stanza's
/// `Files` field lists (the `.dsc`, the upstream tarball, the Debian
/// diff/tarball), fetched from `site`/`stanza.directory`/name and
/// verified against `SHA256-Hash` when `Checksums-Sha256` supplied one,
/// falling back to the weaker MD5 the `Files` field always carries.
#[must_use]
pub fn plan_source_fetch(stanza: &SourceStanza, site: &str, archives_dir: &Path, trusted: bool) -> Vec<PlannedFetch> {
    stanza
        .files
        .iter()
        .map(|file| {
            let relative = format!("{}/{}", stanza.directory, file.name);
            let uri = join_uri(site, &relative);
            let destination = archives_dir.join("partial").join(&file.name);

            let mut item = Item::new(uri, destination);
            item.expected_size = Some(file.size);
            if let Some(sha256) = &file.sha256 {
                item.expected_hashes.insert("SHA256".to_owned(), sha256.clone());
                item.hashes_required = true;
            } else {
                item.expected_hashes.insert("MD5Sum".to_owned(), file.md5.clone());
            }

            PlannedFetch { package: stanza.package.clone(), version: stanza.version.clone(), item, trusted }
        })
        .collect()
}

/// Planning for `apt-get build-dep`: resolve `stanza`'s `Build-Depends`/
/// `Build-Depends-Indep`/`Build-Depends-Arch` groups against `cache`
/// (picking each OR-group's first alternative with a real candidate,
/// since these relation fields don't belong to any cache `Version` for
/// the solver's own OR-group machinery to walk), solve the resulting
/// request, apply the decided transaction onto `depcache`, then recurse
/// into [`plan_install`] for the actual fetch list.
///
/// # Errors
/// Returns [`PlanError::NoBuildDepCandidate`] if a dependency group has
/// no alternative present in the cache at all, [`PlanError::Solve`] if
/// the request is unsatisfiable, or [`PlanError::Mark`] if applying a
/// decision to `depcache` is rejected (held, protected, ...).
pub fn plan_build_dep(
    cache: &Cache,
    depcache: &mut DepCache<'_>,
    policy: &Policy,
    records: &Records,
    archives_dir: &Path,
    stanza: &SourceStanza,
) -> Result<Vec<PlannedFetch>> {
    let native_arch = cache.mixed_str(cache.header().native_arch).unwrap_or_default();
    let mut request = Request::new();

    for field in [&stanza.build_depends, &stanza.build_depends_indep, &stanza.build_depends_arch] {
        for group in field {
            let candidate = group.iter().find_map(|alt| cache.find_package(&alt.package, alt.arch.as_deref().unwrap_or(native_arch)));
            let Some(pkg) = candidate else {
                let Some(first) = group.first() else { continue };
                return Err(PlanError::NoBuildDepCandidate(first.package.clone()));
            };
            request.install(pkg);
        }
    }

    let transaction = solve(cache, policy, &request)?;
    for decided in &transaction.install {
        depcache.set_candidate(decided.package, decided.version);
        depcache.mark_install(decided.package, decided.auto, false)?;
    }

    plan_install(cache, depcache, records, archives_dir)
}

/// A package already present on a mounted disc: its `.deb` sits at
/// `mount_point.join(&record.filename)` rather than behind a URI, so
/// there's nothing to queue in the acquire engine -- just a path for the
/// unpack step to read directly (`apt-private/private-cdrom.cc`'s
/// `IndexCopy` skipping the download phase entirely for local media).
#[must_use]
pub fn cdrom_local_path(mount_point: &Path, record: &debapt_index::DownloadRecord) -> PathBuf {
    mount_point.join(&record.filename)
}

#[cfg(test)]
mod tests {
    use debapt_cache::{CacheGenerator, MultiArch, Priority};
    use debapt_index::packages::RelationAlternative;

    use super::*;

    fn build(f: impl FnOnce(&mut CacheGenerator)) -> (tempfile::TempDir, Cache) {
        let dir = tempfile::tempdir().unwrap();
        let mut gen = CacheGenerator::new("amd64", vec!["amd64".to_owned()]);
        f(&mut gen);
        let path = dir.path().join("cache.bin");
        (dir, Cache::build(&gen, &path, 0).unwrap())
    }

    fn sample_source_stanza() -> SourceStanza {
        SourceStanza {
            package: "curl".to_owned(),
            version: "8.4.0-1".to_owned(),
            directory: "pool/main/c/curl".to_owned(),
            build_depends: vec![vec![RelationAlternative { package: "libssl-dev".to_owned(), arch: None, constraint: None }]],
            build_depends_indep: Vec::new(),
            build_depends_arch: Vec::new(),
            files: vec![
                debapt_index::SourceFile {
                    name: "curl_8.4.0-1.dsc".to_owned(),
                    size: 2490,
                    md5: "3858f40230cf98d7d6a5e92d4e59f5a3".to_owned(),
                    sha256: Some("abc123".to_owned()),
                },
                debapt_index::SourceFile {
                    name: "curl_8.4.0.orig.tar.gz".to_owned(),
                    size: 123_456,
                    md5: "7c1b0e6e6a1c9c5f9e8d7c6b5a4f3e2d".to_owned(),
                    sha256: None,
                },
            ],
        }
    }

    #[test]
    fn join_uri_handles_trailing_slash() {
        assert_eq!(join_uri("http://deb.debian.org/debian/", "pool/a.deb"), "http://deb.debian.org/debian/pool/a.deb");
        assert_eq!(join_uri("http://deb.debian.org/debian", "pool/a.deb"), "http://deb.debian.org/debian/pool/a.deb");
    }

    #[test]
    fn cdrom_local_path_joins_mount_and_filename() {
        let record = debapt_index::DownloadRecord { filename: "pool/main/a.deb".to_owned(), sha256: None, size: 0 };
        assert_eq!(cdrom_local_path(Path::new("/media/cdrom"), &record), Path::new("/media/cdrom/pool/main/a.deb"));
    }

    #[test]
    fn plan_source_fetch_builds_one_item_per_file_preferring_sha256() {
        let stanza = sample_source_stanza();
        let fetches = plan_source_fetch(&stanza, "http://deb.debian.org/debian", Path::new("/var/cache/apt/archives"), true);

        assert_eq!(fetches.len(), 2);
        assert_eq!(fetches[0].package, "curl");
        assert_eq!(fetches[0].version, "8.4.0-1");
        assert_eq!(fetches[0].item.uri, "http://deb.debian.org/debian/pool/main/c/curl/curl_8.4.0-1.dsc");
        assert_eq!(fetches[0].item.expected_hashes.get("SHA256"), Some(&"abc123".to_owned()));
        assert!(fetches[0].item.hashes_required);

        assert!(fetches[1].item.expected_hashes.get("SHA256").is_none());
        assert_eq!(fetches[1].item.expected_hashes.get("MD5Sum"), Some(&"7c1b0e6e6a1c9c5f9e8d7c6b5a4f3e2d".to_owned()));
    }

    #[test]
    fn plan_build_dep_errors_when_no_alternative_has_a_candidate() {
        let (_dir, cache) = build(|_gen| {});
        let policy = Policy::new(false, false);
        let mut depcache = DepCache::new(&cache, policy);
        let stanza = sample_source_stanza();
        let records = Records::default();

        let err = plan_build_dep(&cache, &mut depcache, &Policy::new(false, false), &records, Path::new("/tmp"), &stanza).unwrap_err();
        assert!(matches!(err, PlanError::NoBuildDepCandidate(pkg) if pkg == "libssl-dev"));
    }

    #[test]
    fn plan_build_dep_solves_and_fetches_when_candidate_present() {
        let (_dir, cache) = build(|gen| {
            let pkg = gen.new_package("libssl-dev", "amd64");
            gen.new_version(pkg, "3.0.2-1", MultiArch::None, Priority::Optional, None, None, None, 1, 1, [0u8; 32]);
        });
        let policy = Policy::new(false, false);
        let mut depcache = DepCache::new(&cache, policy);
        let stanza = sample_source_stanza();
        let records = Records::default();

        // No backing PackageFile/records entry, so the plan produces zero
        // fetches for the build-dependency itself, but must not error.
        let fetches =
            plan_build_dep(&cache, &mut depcache, &Policy::new(false, false), &records, Path::new("/tmp"), &stanza).unwrap();
        assert!(fetches.is_empty());

        let libssl = cache.find_package("libssl-dev", "amd64").expect("package present");
        assert_eq!(depcache.package_state(libssl).mode, Mode::Install);
    }
}
