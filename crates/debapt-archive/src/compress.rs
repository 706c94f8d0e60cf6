//! Decompression for index files: a `Packages`/`Sources`/`Release` file is
//! fetched compressed (`.gz`/`.xz`/`.bz2`/`.zst`) and read in full before
//! `debapt-index` hands its stanzas to the cache generator.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::ArchiveError;

/// The compression an index file's extension names. `None` is a plain,
/// uncompressed file (apt still prefers compressed transfers, but a local
/// mirror or `file://` source may serve the stanza file directly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Xz,
    Bzip2,
    Zstd,
}

impl Compression {
    /// Detect compression from an index filename's extension, e.g.
    /// `Packages.gz`, `Sources.xz`.
    #[must_use]
    pub fn from_filename(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with(".gz") {
            Self::Gzip
        } else if lower.ends_with(".xz") {
            Self::Xz
        } else if lower.ends_with(".bz2") {
            Self::Bzip2
        } else if lower.ends_with(".zst") {
            Self::Zstd
        } else {
            Self::None
        }
    }
}

/// Read and fully decompress an index file.
///
/// # Errors
/// Returns [`ArchiveError::Io`] if the file can't be opened or the
/// compressed stream is truncated or corrupt.
pub fn decompress_file(path: &Path) -> Result<Vec<u8>, ArchiveError> {
    let compression = Compression::from_filename(&path.to_string_lossy());
    let file = File::open(path).map_err(ArchiveError::Io)?;
    decompress_reader(file, compression)
}

/// Decompress an already-open reader given its known compression, used
/// when the compression is determined by a `Content-Type`/method response
/// rather than a filename (e.g. a just-downloaded partial file).
///
/// # Errors
/// Returns [`ArchiveError::Io`] if the stream is truncated or corrupt.
pub fn decompress_reader(mut reader: impl Read, compression: Compression) -> Result<Vec<u8>, ArchiveError> {
    let mut out = Vec::new();
    match compression {
        Compression::None => {
            reader.read_to_end(&mut out).map_err(ArchiveError::Io)?;
        }
        Compression::Gzip => {
            flate2::read::GzDecoder::new(reader).read_to_end(&mut out).map_err(ArchiveError::Io)?;
        }
        Compression::Xz => {
            xz2::read::XzDecoder::new(reader).read_to_end(&mut out).map_err(ArchiveError::Io)?;
        }
        Compression::Bzip2 => {
            bzip2::read::BzDecoder::new(reader).read_to_end(&mut out).map_err(ArchiveError::Io)?;
        }
        Compression::Zstd => {
            let mut decoder = zstd::stream::Decoder::new(reader).map_err(ArchiveError::Io)?;
            decoder.read_to_end(&mut out).map_err(ArchiveError::Io)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn detects_compression_from_extension() {
        assert_eq!(Compression::from_filename("Packages.gz"), Compression::Gzip);
        assert_eq!(Compression::from_filename("Packages.xz"), Compression::Xz);
        assert_eq!(Compression::from_filename("Sources.bz2"), Compression::Bzip2);
        assert_eq!(Compression::from_filename("Packages.zst"), Compression::Zstd);
        assert_eq!(Compression::from_filename("Release"), Compression::None);
    }

    #[test]
    fn round_trips_gzip_content() {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"Package: foo\n\n").unwrap();
        let compressed = encoder.finish().unwrap();
        let out = decompress_reader(&compressed[..], Compression::Gzip).unwrap();
        assert_eq!(out, b"Package: foo\n\n");
    }

    #[test]
    fn plain_reader_passes_through_unchanged() {
        let out = decompress_reader(&b"Package: foo\n\n"[..], Compression::None).unwrap();
        assert_eq!(out, b"Package: foo\n\n");
    }
}
