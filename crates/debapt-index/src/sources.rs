//! Parsing a `Sources` index stanza: the `dsc(5)`-adjacent metadata
//! (`Build-Depends`, the `Files` list) a source-fetch or build-dep plan
//! needs. Unlike `Packages`, a `Sources` stanza never feeds
//! `debapt_cache::gen::CacheGenerator` -- source packages aren't part of
//! the solver's binary dependency graph (`spec.md`'s Non-goal on source
//! packages participating in resolution), so this stays a standalone
//! parse path consumed directly by `debapt-plan`.

use deb::control::Paragraph;

use crate::packages::{parse_relation_field, RelationField};
use crate::IndexError;

/// One file listed under a source stanza's `Files`/`Checksums-Sha256`
/// fields: the `.dsc` itself, the upstream tarball, and the Debian
/// diff/tarball.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub size: u64,
    pub md5: String,
    pub sha256: Option<String>,
}

/// A `Sources` stanza's fields, enough to plan a `dget`-style fetch of
/// every file it lists and a synthetic build-dependency request.
#[derive(Debug, Clone)]
pub struct SourceStanza {
    pub package: String,
    pub version: String,
    /// Pool path the `Files` entries are relative to.
    pub directory: String,
    pub build_depends: RelationField,
    pub build_depends_indep: RelationField,
    pub build_depends_arch: RelationField,
    pub files: Vec<SourceFile>,
}

/// Parse every stanza out of a `Sources` file's decompressed text, the
/// same blank-line-separated RFC822 framing as `Packages`.
///
/// # Errors
/// Returns [`IndexError::Parse`] if a stanza isn't valid RFC822, or is
/// missing `Package`/`Version`/`Directory`.
pub fn parse_sources(text: &str) -> Result<Vec<SourceStanza>, IndexError> {
    text.split("\n\n").map(str::trim).filter(|stanza| !stanza.is_empty()).map(parse_one_stanza).collect()
}

fn parse_one_stanza(text: &str) -> Result<SourceStanza, IndexError> {
    let paragraph = Paragraph::parse(text).map_err(|e| IndexError::Parse(e.to_string()))?;
    let require = |name: &str| -> Result<String, IndexError> {
        paragraph.get(name).map(|v| v.trim().to_owned()).ok_or_else(|| IndexError::Parse(format!("missing {name} field")))
    };
    let optional = |name: &str| paragraph.get(name).map(|v| v.trim().to_owned());

    let build_depends = optional("Build-Depends").map(|v| parse_relation_field(&v)).unwrap_or_default();
    let build_depends_indep = optional("Build-Depends-Indep").map(|v| parse_relation_field(&v)).unwrap_or_default();
    let build_depends_arch = optional("Build-Depends-Arch").map(|v| parse_relation_field(&v)).unwrap_or_default();

    let files = parse_files_field(optional("Files").as_deref().unwrap_or(""));
    let sha256_by_name = parse_checksum_field(optional("Checksums-Sha256").as_deref().unwrap_or(""));
    let files = files
        .into_iter()
        .map(|mut f| {
            f.sha256 = sha256_by_name.get(&f.name).cloned();
            f
        })
        .collect();

    Ok(SourceStanza {
        package: require("Package")?,
        version: require("Version")?,
        directory: require("Directory")?,
        build_depends,
        build_depends_indep,
        build_depends_arch,
        files,
    })
}

/// `Files:` is a folded field: one `<md5> <size> <name>` triple per
/// (indented) line.
fn parse_files_field(value: &str) -> Vec<SourceFile> {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let md5 = parts.next()?.to_owned();
            let size = parts.next()?.parse().ok()?;
            let name = parts.next()?.to_owned();
            Some(SourceFile { name, size, md5, sha256: None })
        })
        .collect()
}

/// `Checksums-Sha256:` has the same folded shape as `Files` but with a
/// sha256 hex digest in place of the md5sum, keyed here by filename.
fn parse_checksum_field(value: &str) -> std::collections::HashMap<String, String> {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let sha256 = parts.next()?.to_owned();
            let _size = parts.next()?;
            let name = parts.next()?.to_owned();
            Some((name, sha256))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Package: curl\nVersion: 8.4.0-1\nDirectory: pool/main/c/curl\nBuild-Depends: debhelper (>= 13), libssl-dev (>= 3.0) | libssl1.1-dev\nFiles:\n 3858f40230cf98d7d6a5e92d4e59f5a3 2490 curl_8.4.0-1.dsc\n 7c1b0e6e6a1c9c5f9e8d7c6b5a4f3e2d 123456 curl_8.4.0.orig.tar.gz\nChecksums-Sha256:\n abc123 2490 curl_8.4.0-1.dsc\n def456 123456 curl_8.4.0.orig.tar.gz\n";

    #[test]
    fn parses_core_fields() {
        let stanzas = parse_sources(SAMPLE).unwrap();
        assert_eq!(stanzas.len(), 1);
        let src = &stanzas[0];
        assert_eq!(src.package, "curl");
        assert_eq!(src.version, "8.4.0-1");
        assert_eq!(src.directory, "pool/main/c/curl");
    }

    #[test]
    fn parses_build_depends_with_or_group() {
        let stanzas = parse_sources(SAMPLE).unwrap();
        let field = &stanzas[0].build_depends;
        assert_eq!(field[0][0].package, "debhelper");
        assert_eq!(field[1].len(), 2);
        assert_eq!(field[1][1].package, "libssl1.1-dev");
    }

    #[test]
    fn parses_files_and_merges_sha256() {
        let stanzas = parse_sources(SAMPLE).unwrap();
        let files = &stanzas[0].files;
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "curl_8.4.0-1.dsc");
        assert_eq!(files[0].size, 2490);
        assert_eq!(files[0].sha256.as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let stanza = "Package: foo\nVersion: 1\n";
        assert!(parse_sources(stanza).is_err());
    }
}
