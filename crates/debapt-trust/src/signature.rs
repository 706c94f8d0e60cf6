//! OpenPGP signature acceptance for `Release`/`InRelease` files.
//!
//! apt accepts two shapes for the same content: a clearsigned `InRelease`
//! (the signature wraps the Release stanza inline) or a plain `Release`
//! file plus a detached `Release.gpg`. Both end up verified the same way
//! here: produce the cleartext and the set of fingerprints that produced a
//! valid signature over it.

use std::io::Read;

use sequoia_openpgp::cert::Cert;
use sequoia_openpgp::parse::stream::{
    DetachedVerifierBuilder, MessageLayer, MessageStructure, VerificationHelper, VerifierBuilder,
};
use sequoia_openpgp::parse::Parse;
use sequoia_openpgp::policy::StandardPolicy;
use sequoia_openpgp::{Fingerprint, KeyHandle};

use crate::keyring::Keyring;
use crate::TrustError;

/// A Release file whose signature has been checked, with the cleartext
/// ready for RFC822 parsing and the fingerprints that signed it.
#[derive(Debug, Clone)]
pub struct VerifiedRelease {
    pub content: Vec<u8>,
    pub signed_by: Vec<Fingerprint>,
}

struct Helper<'a> {
    candidates: &'a [Cert],
    good: Vec<Fingerprint>,
}

impl VerificationHelper for Helper<'_> {
    fn get_certs(&mut self, _ids: &[KeyHandle]) -> sequoia_openpgp::Result<Vec<Cert>> {
        Ok(self.candidates.to_vec())
    }

    fn check(&mut self, structure: MessageStructure) -> sequoia_openpgp::Result<()> {
        for layer in structure {
            let MessageLayer::SignatureGroup { results } = layer else {
                continue;
            };
            for result in results {
                let good = result?;
                self.good.push(good.ka.cert().fingerprint());
            }
        }
        Ok(())
    }
}

/// Verify a clearsigned `InRelease` document against `keyring`, returning
/// the recovered cleartext.
///
/// # Errors
/// Returns [`TrustError::Signature`] if no signature in the message
/// verifies against any certificate in `keyring`, or the message doesn't
/// parse as an OpenPGP signed message.
pub fn verify_inline(data: &[u8], keyring: &Keyring) -> Result<VerifiedRelease, TrustError> {
    if keyring.is_empty() {
        return Err(TrustError::Signature("no trusted keys configured".into()));
    }
    let policy = StandardPolicy::new();
    let helper = Helper { candidates: keyring.certs(), good: Vec::new() };
    let mut verifier = VerifierBuilder::from_bytes(data)
        .map_err(|e| TrustError::Signature(e.to_string()))?
        .with_policy(&policy, None, helper)
        .map_err(|e| TrustError::Signature(e.to_string()))?;

    let mut content = Vec::new();
    verifier.read_to_end(&mut content).map_err(|e| TrustError::Signature(e.to_string()))?;
    let signed_by = verifier.into_helper().good;
    if signed_by.is_empty() {
        return Err(TrustError::Signature("no valid signature from a trusted key".into()));
    }
    Ok(VerifiedRelease { content, signed_by })
}

/// Verify a plain `Release` file's content against a detached
/// `Release.gpg` signature.
///
/// # Errors
/// Returns [`TrustError::Signature`] under the same conditions as
/// [`verify_inline`].
pub fn verify_detached(content: &[u8], signature: &[u8], keyring: &Keyring) -> Result<VerifiedRelease, TrustError> {
    if keyring.is_empty() {
        return Err(TrustError::Signature("no trusted keys configured".into()));
    }
    let policy = StandardPolicy::new();
    let helper = Helper { candidates: keyring.certs(), good: Vec::new() };
    let mut verifier = DetachedVerifierBuilder::from_bytes(signature)
        .map_err(|e| TrustError::Signature(e.to_string()))?
        .with_policy(&policy, None, helper)
        .map_err(|e| TrustError::Signature(e.to_string()))?;

    verifier.verify_bytes(content).map_err(|e| TrustError::Signature(e.to_string()))?;
    let signed_by = verifier.into_helper().good;
    if signed_by.is_empty() {
        return Err(TrustError::Signature("no valid signature from a trusted key".into()));
    }
    Ok(VerifiedRelease { content: content.to_vec(), signed_by })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_keyring_rejects_inline() {
        let keyring = Keyring::empty();
        let err = verify_inline(b"anything", &keyring).unwrap_err();
        assert!(matches!(err, TrustError::Signature(_)));
    }

    #[test]
    fn empty_keyring_rejects_detached() {
        let keyring = Keyring::empty();
        let err = verify_detached(b"release", b"sig", &keyring).unwrap_err();
        assert!(matches!(err, TrustError::Signature(_)));
    }
}
