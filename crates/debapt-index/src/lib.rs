//! Parsing `Release`/`Packages`/`Sources` index files and feeding their
//! records into `debapt_cache::gen::CacheGenerator`.
//!
//! A Release file is merged first via [`merge::merge_release`] (it gates
//! every `Packages` file listed under it on both signature trust and
//! freshness); each `Packages` file is then merged via
//! [`merge::PackagesFile::merge`]. Decompression and `.deb`/`.dsc`
//! reading are `debapt_archive`'s job; signature/freshness decisions are
//! `debapt_trust`'s. This crate only turns already-decided-trustworthy
//! bytes into cache records.

pub mod merge;
pub mod packages;
pub mod records;
pub mod release;
pub mod sources;

pub use merge::{merge_release, PackagesFile, ReleaseMerge};
pub use packages::{parse_packages, PackageStanza, RelationAlternative, RelationField};
pub use records::{DownloadRecord, Records};
pub use release::{parse_release, FileHash, ReleaseFields};
pub use sources::{parse_sources, SourceFile, SourceStanza};

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive error: {0}")]
    Archive(#[from] debapt_archive::ArchiveError),
    #[error("trust error: {0}")]
    Trust(#[from] debapt_trust::TrustError),
    #[error("malformed index: {0}")]
    Parse(String),
}
