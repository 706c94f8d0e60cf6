//! Parsing a `Release`/`InRelease` stanza into the fields
//! `debapt_cache::CacheGenerator::new_release_file` and the trust/freshness
//! gate need.

use std::collections::HashMap;

use deb::control::Paragraph;

use crate::IndexError;

/// One `SHA256`/`MD5Sum` line: `<hash> <size> <path>`, keyed by `path` once
/// parsed.
#[derive(Debug, Clone)]
pub struct FileHash {
    pub hash: String,
    pub size: u64,
}

/// A parsed Release/InRelease stanza, before the trust gate has run.
#[derive(Debug, Clone)]
pub struct ReleaseFields {
    pub origin: String,
    pub label: String,
    pub suite: String,
    pub codename: String,
    pub architectures: Vec<String>,
    pub components: Vec<String>,
    pub date: Option<String>,
    pub valid_until: Option<String>,
    /// Path (relative to the Release file's directory) to expected hash,
    /// preferring `SHA256` and falling back to `MD5Sum` per apt's own
    /// hash-strength ordering.
    pub file_hashes: HashMap<String, FileHash>,
}

/// Parse a Release stanza's RFC822 text.
///
/// # Errors
/// Returns [`IndexError::Parse`] if the text isn't a single valid RFC822
/// paragraph.
pub fn parse_release(text: &str) -> Result<ReleaseFields, IndexError> {
    let paragraph = Paragraph::parse(text).map_err(|e| IndexError::Parse(e.to_string()))?;

    let field = |name: &str| paragraph.get(name).unwrap_or_default().trim().to_owned();
    let list_field = |name: &str| field(name).split_whitespace().map(str::to_owned).collect();

    let mut file_hashes = HashMap::new();
    if let Some(block) = paragraph.get("SHA256") {
        parse_hash_block(block, &mut file_hashes);
    } else if let Some(block) = paragraph.get("MD5Sum") {
        parse_hash_block(block, &mut file_hashes);
    }

    Ok(ReleaseFields {
        origin: field("Origin"),
        label: field("Label"),
        suite: field("Suite"),
        codename: field("Codename"),
        architectures: list_field("Architectures"),
        components: list_field("Components"),
        date: paragraph.get("Date").map(|s| s.trim().to_owned()),
        valid_until: paragraph.get("Valid-Until").map(|s| s.trim().to_owned()),
        file_hashes,
    })
}

/// A `SHA256`/`MD5Sum` field's value is a blank line followed by one
/// `<hash> <size> <path>` triple per continuation line.
fn parse_hash_block(block: &str, out: &mut HashMap<String, FileHash>) {
    for line in block.lines() {
        let mut parts = line.split_whitespace();
        let (Some(hash), Some(size), Some(path)) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        let Ok(size) = size.parse::<u64>() else { continue };
        out.insert(path.to_owned(), FileHash { hash: hash.to_owned(), size });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Origin: Debian\nLabel: Debian\nSuite: stable\nCodename: bookworm\nDate: Mon, 01 Jan 2024 00:00:00 UTC\nValid-Until: Mon, 08 Jan 2024 00:00:00 UTC\nArchitectures: amd64 arm64\nComponents: main contrib\nSHA256:\n 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824 1234 main/binary-amd64/Packages.gz\n\n";

    #[test]
    fn parses_core_fields() {
        let release = parse_release(SAMPLE).unwrap();
        assert_eq!(release.origin, "Debian");
        assert_eq!(release.codename, "bookworm");
        assert_eq!(release.architectures, vec!["amd64", "arm64"]);
        assert_eq!(release.components, vec!["main", "contrib"]);
    }

    #[test]
    fn parses_sha256_hash_block() {
        let release = parse_release(SAMPLE).unwrap();
        let entry = release.file_hashes.get("main/binary-amd64/Packages.gz").unwrap();
        assert_eq!(entry.size, 1234);
        assert!(entry.hash.starts_with("2cf24dba"));
    }
}
