//! Release-file trust: the gate `debapt-index` runs a fetched
//! `Release`/`InRelease` through before registering it with the cache
//! generator.
//!
//! Two independent checks, both of which apt runs regardless of which one
//! a given source actually needs:
//! - [`signature`]: the Release's OpenPGP signature verifies against a
//!   [`keyring::Keyring`] built from `Signed-By` or the system
//!   `trusted.gpg.d`.
//! - [`freshness`]: the Release's `Date`/`Valid-Until` fields satisfy
//!   `Check-Valid-Until`/`Max-FutureTime`/`Min-ValidTime`/`Max-ValidTime`.
//!
//! A sources-list entry marked `Trusted=yes` skips the signature check
//! entirely; [`accept_release`] logs that as a warning rather than silently
//! treating it the same as a verified source.

pub mod freshness;
pub mod keyring;
pub mod signature;

use chrono::{DateTime, Utc};

pub use freshness::{check_freshness, parse_release_date, FreshnessPolicy};
pub use keyring::Keyring;
pub use signature::{verify_detached, verify_inline, VerifiedRelease};

#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    #[error("keyring error: {0}")]
    Keyring(String),
    #[error("signature error: {0}")]
    Signature(String),
    #[error("freshness check failed: {0}")]
    Freshness(String),
}

/// One Release file as read off disk, in whichever of the two shapes apt
/// accepts.
pub enum ReleaseSource<'a> {
    /// A clearsigned `InRelease`: the signature wraps the content inline.
    Inline(&'a [u8]),
    /// A plain `Release` plus its detached `Release.gpg`.
    Detached { content: &'a [u8], signature: &'a [u8] },
}

/// The outcome of running a Release file through the trust gate: the
/// cleartext ready for RFC822 parsing, and whether it's safe to set
/// `debapt_cache`'s `TrustFlags::TRUSTED` bit on the resulting
/// `ReleaseFile` record.
#[derive(Debug, Clone)]
pub struct TrustVerdict {
    pub content: Vec<u8>,
    pub trusted: bool,
}

/// Run the full trust gate described in `SPEC_FULL.md` §4.6: signature
/// acceptance (unless `trusted_override` bypasses it) followed by
/// freshness evaluation, which always runs.
///
/// # Errors
/// Returns [`TrustError::Signature`] if the signature doesn't verify and
/// `trusted_override` is `false`, or [`TrustError::Freshness`] if the
/// Release's `Date`/`Valid-Until` fields fail `policy`.
pub fn accept_release(
    release: &ReleaseSource<'_>,
    keyring: &Keyring,
    trusted_override: bool,
    date: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    policy: &FreshnessPolicy,
) -> Result<TrustVerdict, TrustError> {
    let content = if trusted_override {
        tracing::warn!("accepting unsigned Release: source is configured Trusted=yes");
        match release {
            ReleaseSource::Inline(data) => (*data).to_vec(),
            ReleaseSource::Detached { content, .. } => (*content).to_vec(),
        }
    } else {
        let verified = match release {
            ReleaseSource::Inline(data) => verify_inline(data, keyring)?,
            ReleaseSource::Detached { content, signature } => verify_detached(content, signature, keyring)?,
        };
        tracing::debug!(signers = verified.signed_by.len(), "Release signature verified");
        verified.content
    };

    check_freshness(date, valid_until, now, policy)?;

    Ok(TrustVerdict { content, trusted: !trusted_override })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trusted_override_bypasses_signature_check() {
        let keyring = Keyring::empty();
        let policy = FreshnessPolicy::default();
        let now = parse_release_date("Mon, 01 Jan 2024 00:00:00 UTC").unwrap();
        let release = ReleaseSource::Inline(b"Origin: test\n");
        let verdict = accept_release(&release, &keyring, true, None, None, now, &policy).unwrap();
        assert!(!verdict.trusted);
        assert_eq!(verdict.content, b"Origin: test\n");
    }

    #[test]
    fn untrusted_empty_keyring_is_rejected() {
        let keyring = Keyring::empty();
        let policy = FreshnessPolicy::default();
        let now = parse_release_date("Mon, 01 Jan 2024 00:00:00 UTC").unwrap();
        let release = ReleaseSource::Inline(b"Origin: test\n");
        let err = accept_release(&release, &keyring, false, None, None, now, &policy).unwrap_err();
        assert!(matches!(err, TrustError::Signature(_)));
    }

    #[test]
    fn freshness_failure_surfaces_even_with_override() {
        let keyring = Keyring::empty();
        let policy = FreshnessPolicy::default();
        let now = parse_release_date("Mon, 15 Jan 2024 00:00:00 UTC").unwrap();
        let date = parse_release_date("Mon, 01 Jan 2024 00:00:00 UTC").unwrap();
        let valid_until = parse_release_date("Mon, 08 Jan 2024 00:00:00 UTC").unwrap();
        let release = ReleaseSource::Inline(b"Origin: test\n");
        let err = accept_release(&release, &keyring, true, Some(date), Some(valid_until), now, &policy).unwrap_err();
        assert!(matches!(err, TrustError::Freshness(_)));
    }
}
