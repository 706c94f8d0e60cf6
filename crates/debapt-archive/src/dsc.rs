//! Reading a local `.dsc`: a control stanza that's usually clearsigned.
//! Unwrapping the clearsign armor here is a plain textual strip, not a
//! signature check -- `debapt-trust::verify_inline` is what decides
//! whether the result should be trusted.

use std::fs;
use std::path::Path;

use crate::ArchiveError;

const BEGIN_SIGNED: &str = "-----BEGIN PGP SIGNED MESSAGE-----";
const BEGIN_SIGNATURE: &str = "-----BEGIN PGP SIGNATURE-----";

/// Read a `.dsc` file, returning its control stanza with any clearsign
/// armor stripped. An unsigned `.dsc` is returned unchanged.
///
/// # Errors
/// Returns [`ArchiveError::Io`] if the file can't be read, or
/// [`ArchiveError::Malformed`] if it has a clearsign header but no
/// terminating signature block.
pub fn read_dsc(path: &Path) -> Result<String, ArchiveError> {
    let raw = fs::read_to_string(path).map_err(ArchiveError::Io)?;
    Ok(strip_clearsign(&raw).unwrap_or(raw))
}

fn strip_clearsign(text: &str) -> Option<String> {
    let body_start = text.find(BEGIN_SIGNED)?;
    let after_header = &text[body_start..];
    let blank_line = after_header.find("\n\n")?;
    let body = &after_header[blank_line + 2..];
    let sig_start = body.find(BEGIN_SIGNATURE)?;
    let stanza = &body[..sig_start];

    Some(stanza.lines().map(|line| line.strip_prefix("- ").unwrap_or(line)).collect::<Vec<_>>().join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_unsigned_dsc() {
        let text = "Source: foo\nVersion: 1.0-1\n";
        assert_eq!(strip_clearsign(text), None);
    }

    #[test]
    fn strips_clearsign_armor() {
        let text = "-----BEGIN PGP SIGNED MESSAGE-----\nHash: SHA256\n\nSource: foo\nVersion: 1.0-1\n-----BEGIN PGP SIGNATURE-----\n...\n-----END PGP SIGNATURE-----\n";
        let stripped = strip_clearsign(text).unwrap();
        assert_eq!(stripped.trim(), "Source: foo\nVersion: 1.0-1");
    }

    #[test]
    fn unescapes_dash_escaped_lines() {
        let text = "-----BEGIN PGP SIGNED MESSAGE-----\nHash: SHA256\n\nSource: foo\n- this line was dash-escaped\n-----BEGIN PGP SIGNATURE-----\n...\n-----END PGP SIGNATURE-----\n";
        let stripped = strip_clearsign(text).unwrap();
        assert!(stripped.contains("this line was dash-escaped"));
        assert!(!stripped.contains("- this line"));
    }
}
