//! Trusted-key loading: the set of certificates a Release signature is
//! allowed to be checked against, mirroring `Signed-By` and the system
//! `trusted.gpg.d` directory apt falls back to when a sources-list entry
//! doesn't name one.

use std::fs;
use std::path::Path;

use sequoia_openpgp::cert::{Cert, CertParser};
use sequoia_openpgp::parse::Parse;
use sequoia_openpgp::Fingerprint;

use crate::TrustError;

/// A set of certificates a Release file's signature may be verified
/// against. Built either from a `Signed-By` keyring file (one sources-list
/// entry's own trust anchor) or by merging every keyring found under a
/// `trusted.gpg.d`-style directory.
#[derive(Debug, Default, Clone)]
pub struct Keyring {
    certs: Vec<Cert>,
}

impl Keyring {
    /// An empty keyring: every signature check against it fails closed.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a single armored or binary OpenPGP keyring file, as named by a
    /// sources-list entry's `Signed-By` option.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or doesn't parse as a
    /// sequence of OpenPGP certificates.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, TrustError> {
        let path = path.as_ref();
        let certs = CertParser::from_file(path)
            .map_err(|e| TrustError::Keyring(format!("{}: {e}", path.display())))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(Self { certs })
    }

    /// Load every `*.gpg`/`*.asc` keyring under a directory (the
    /// `/etc/apt/trusted.gpg.d/` equivalent apt consults when a source has
    /// no `Signed-By` of its own).
    ///
    /// # Errors
    /// Returns an error if the directory cannot be listed; a keyring file
    /// inside it that fails to parse is skipped with a warning rather than
    /// aborting the whole load, matching apt's "ignore stray junk in
    /// trusted.gpg.d" behavior.
    pub fn load_dir(path: impl AsRef<Path>) -> Result<Self, TrustError> {
        let path = path.as_ref();
        let mut certs = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| TrustError::Keyring(format!("{}: {e}", path.display())))? {
            let entry = entry.map_err(|e| TrustError::Keyring(e.to_string()))?;
            let entry_path = entry.path();
            let is_keyring = entry_path.extension().is_some_and(|ext| ext == "gpg" || ext == "asc");
            if !is_keyring {
                continue;
            }
            match CertParser::from_file(&entry_path) {
                Ok(parser) => certs.extend(parser.filter_map(|r| r.ok())),
                Err(e) => tracing::warn!(file = %entry_path.display(), error = %e, "skipping unreadable keyring"),
            }
        }
        Ok(Self { certs })
    }

    /// Merge another keyring's certificates into this one (a source's
    /// `Signed-By` keyring is checked in addition to, not instead of, any
    /// keyring explicitly passed alongside it).
    pub fn merge(&mut self, other: Self) {
        self.certs.extend(other.certs);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    #[must_use]
    pub fn certs(&self) -> &[Cert] {
        &self.certs
    }

    /// Every fingerprint this keyring would accept a signature from.
    #[must_use]
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        self.certs.iter().map(Cert::fingerprint).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_keyring_has_no_certs() {
        let keyring = Keyring::empty();
        assert!(keyring.is_empty());
        assert!(keyring.fingerprints().is_empty());
    }

    #[test]
    fn merge_combines_certificate_lists() {
        let mut a = Keyring::empty();
        let b = Keyring::empty();
        a.merge(b);
        assert!(a.is_empty());
    }

    #[test]
    fn load_dir_skips_non_keyring_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README"), b"not a keyring").unwrap();
        let keyring = Keyring::load_dir(dir.path()).unwrap();
        assert!(keyring.is_empty());
    }
}
