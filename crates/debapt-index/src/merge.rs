//! Driving a fetched Release/Packages file into the cache generator.
//!
//! Grounded in `apt-pkg/deb/debindexfile.cc`'s `debPackagesIndex`/
//! `debReleaseIndex`: a Release file is merged first (it is what the
//! `Packages` files further down the merge order are checked against), then
//! each `Packages` file in turn. Unlike `pkgcachegen.cc`'s two-pass
//! approach -- which exists because the original's `NewPackage` is *not*
//! idempotent and Provides must sometimes forward-reference a package the
//! first pass hasn't created yet -- `CacheGenerator::new_package`/
//! `new_group` here are find-or-insert (see `DESIGN.md`), so a single pass
//! over each stanza is sufficient.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use debapt_cache::entities::TrustFlags;
use debapt_cache::gen::CacheGenerator;
use debapt_trust::{accept_release, FreshnessPolicy, Keyring, ReleaseSource};

use crate::packages::{depends_requests, parse_packages, provides_requests};
use crate::records::{DownloadRecord, Records};
use crate::release::parse_release;
use crate::IndexError;

/// A trusted, freshness-checked Release file, ready to have `Packages`
/// files merged under it.
pub struct ReleaseMerge {
    pub site: String,
    pub codename: String,
    pub origin: String,
    pub label: String,
    pub archive: String,
    pub components: Vec<String>,
    pub architectures: Vec<String>,
    pub mtime: i64,
    pub valid_until: i64,
    pub trust_flags: u8,
    pub file_hashes: std::collections::HashMap<String, crate::release::FileHash>,
}

/// Verify and parse a Release file (clearsigned `InRelease` or a detached
/// pair), registering it with `generator` on success.
///
/// # Errors
/// Returns [`IndexError::Trust`] if the signature or freshness check
/// fails (unless `trusted_override` is set, which only bypasses the
/// signature check), or [`IndexError::Parse`] if the stanza is malformed.
#[allow(clippy::too_many_arguments)]
pub fn merge_release(
    generator: &mut CacheGenerator,
    site: &str,
    filename: &str,
    source: &ReleaseSource<'_>,
    keyring: &Keyring,
    trusted_override: bool,
    now: DateTime<Utc>,
    policy: &FreshnessPolicy,
) -> Result<(u32, ReleaseMerge), IndexError> {
    let probe_bytes: &[u8] = match source {
        ReleaseSource::Inline(data) => data,
        ReleaseSource::Detached { content, .. } => content,
    };
    let probe = std::str::from_utf8(probe_bytes).map_err(|e| IndexError::Parse(e.to_string()))?;
    let probe_fields = parse_release(probe)?;

    let date = probe_fields.date.as_deref().map(debapt_trust::freshness::parse_release_date).transpose()?;
    let valid_until = probe_fields.valid_until.as_deref().map(debapt_trust::freshness::parse_release_date).transpose()?;

    let verdict = accept_release(source, keyring, trusted_override, date, valid_until, now, policy)?;

    let content = String::from_utf8(verdict.content).map_err(|e| IndexError::Parse(e.to_string()))?;
    let fields = parse_release(&content)?;

    let trust_flags = if verdict.trusted { TrustFlags::TRUSTED } else { TrustFlags(0) };

    let mtime = date.map_or(0, |d| d.timestamp());
    let valid_until_ts = valid_until.map_or(0, |d| d.timestamp());

    let release_id = generator.new_release_file(
        site,
        filename,
        &fields.suite,
        &fields.codename,
        &fields.origin,
        &fields.label,
        mtime,
        valid_until_ts,
        trust_flags.0,
    );

    Ok((
        release_id,
        ReleaseMerge {
            site: site.to_owned(),
            codename: fields.codename,
            origin: fields.origin,
            label: fields.label,
            archive: fields.suite,
            components: fields.components,
            architectures: fields.architectures,
            mtime,
            valid_until: valid_until_ts,
            trust_flags: trust_flags.0,
            file_hashes: fields.file_hashes,
        },
    ))
}

/// One decompressed, on-disk `Packages` file for a single (component,
/// architecture) pair under an already-merged Release file.
pub struct PackagesFile {
    pub path: PathBuf,
    pub component: String,
    pub architecture: String,
}

impl PackagesFile {
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} {}/binary-{}", self.path.display(), self.component, self.architecture)
    }

    /// # Errors
    /// Returns [`IndexError::Io`] if the file can't be read/decompressed,
    /// or [`IndexError::Parse`] if a stanza is malformed.
    pub fn merge(
        &self,
        release_id: u32,
        generator: &mut CacheGenerator,
        records: &mut Records,
    ) -> Result<usize, IndexError> {
        let bytes = debapt_archive::decompress_file(&self.path)?;
        let text = String::from_utf8(bytes).map_err(|e| IndexError::Parse(e.to_string()))?;
        let stanzas = parse_packages(&text)?;

        let size = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        let file_id = generator.new_package_file(&self.path.to_string_lossy(), &self.component, &self.architecture, release_id, size);

        for stanza in &stanzas {
            let package_id = generator.new_package(&stanza.package, &stanza.architecture);
            let control_hash = control_hash_of(&stanza.package, &stanza.version);
            let version_id = generator.new_version(
                package_id,
                &stanza.version,
                stanza.multi_arch,
                stanza.priority,
                stanza.section.as_deref(),
                stanza.source_package.as_deref(),
                stanza.source_version.as_deref(),
                stanza.installed_size,
                stanza.size,
                control_hash,
            );

            for (kind, field) in &stanza.depends {
                for request in depends_requests(*kind, field) {
                    generator.new_depends(version_id, &request);
                }
            }
            for request in provides_requests(&stanza.provides) {
                generator.new_provides(version_id, &request);
            }

            generator.new_ver_file(version_id, file_id);

            records.insert(
                debapt_core::ids::VerId::new(version_id),
                DownloadRecord {
                    filename: stanza.filename.clone(),
                    sha256: stanza.sha256.clone(),
                    size: stanza.size,
                },
            );
        }

        Ok(stanzas.len())
    }
}

/// Versions are de-duplicated by content hash elsewhere in the cache
/// generator's lineage (`spec.md` §4.2); since index parsing doesn't keep
/// the stanza's raw bytes around once parsed, we hash the identity tuple
/// instead, which is all the generator actually keys on.
fn control_hash_of(package: &str, version: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(package.as_bytes());
    hasher.update([0]);
    hasher.update(version.as_bytes());
    hasher.finalize().into()
}

/// Check whether a merged file's path exists on disk, the precondition
/// `apt-pkg/acquire-item.cc` checks before deciding a `Packages` file
/// needs fetching at all.
#[must_use]
pub fn exists(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn merges_one_packages_stanza_into_generator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Packages");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "Package: curl\nVersion: 8.4.0-1\nArchitecture: amd64\nDepends: libc6 (>= 2.34)\n").unwrap();

        let mut generator = CacheGenerator::new("amd64", vec!["amd64".to_owned()]);
        let packages_file = PackagesFile { path, component: "main".to_owned(), architecture: "amd64".to_owned() };
        let mut records = Records::new();
        let count = packages_file.merge(0, &mut generator, &mut records).unwrap();
        assert_eq!(count, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(generator.new_package("curl", "amd64"), generator.new_package("curl", "amd64"));
    }

    #[test]
    fn describe_includes_component_and_architecture() {
        let packages_file =
            PackagesFile { path: PathBuf::from("/tmp/Packages"), component: "main".to_owned(), architecture: "amd64".to_owned() };
        assert!(packages_file.describe().contains("main/binary-amd64"));
    }
}
