//! Index-file decompression and local archive reading, the ambient
//! collaborator `debapt-index` leans on to turn a fetched file into bytes
//! it can feed to a control-stanza parser: gzip/xz/bzip2/zstd decompression
//! for `Packages`/`Sources`/`Release`, and `ar`+`tar` extraction for a
//! locally-provided `.deb`/`.dsc`.

pub mod compress;
pub mod deb;
pub mod dsc;

pub use compress::{decompress_file, decompress_reader, Compression};
pub use deb::read_control;
pub use dsc::read_dsc;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed archive: {0}")]
    Malformed(String),
}
