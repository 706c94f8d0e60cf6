//! `Check-Valid-Until`, `Date-Max-Future`, and `Valid-Until-Min`/
//! `Valid-Until-Max` evaluation for a Release file's `Date`/`Valid-Until`
//! fields, independent of whether the signature over them verified --
//! apt runs both checks, and a stale-but-signed Release is still rejected.

use chrono::{DateTime, Duration, Utc};

use crate::TrustError;

/// Configured freshness bounds, the equivalents of
/// `Acquire::Check-Valid-Until`, `Acquire::Max-ValidTime`,
/// `Acquire::Min-ValidTime`, and `Acquire::Max-FutureTime`.
#[derive(Debug, Clone, Copy)]
pub struct FreshnessPolicy {
    /// `Acquire::Check-Valid-Until`: reject a Release whose `Valid-Until`
    /// has passed. `Trusted=yes` sources typically also disable this.
    pub check_valid_until: bool,
    /// `Acquire::Max-FutureTime`: how far past `now` a Release's `Date` may
    /// claim to be before it's rejected as clock-skewed or replayed.
    pub date_max_future: Duration,
    /// `Acquire::Min-ValidTime`: the minimum `Valid-Until - Date` span a
    /// repository must promise, overriding a shorter one the Release
    /// itself declares.
    pub valid_until_min: Option<Duration>,
    /// `Acquire::Max-ValidTime`: a cap on how far in the future
    /// `Valid-Until` may be, even if the Release claims longer.
    pub valid_until_max: Option<Duration>,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            check_valid_until: true,
            date_max_future: Duration::hours(24),
            valid_until_min: None,
            valid_until_max: None,
        }
    }
}

/// Parse a Release file's `Date`/`Valid-Until` field (RFC 2822, the format
/// `apt-pkg/deb/debmetaindex.cc` writes and reads).
///
/// # Errors
/// Returns [`TrustError::Freshness`] if `value` doesn't parse as RFC 2822.
pub fn parse_release_date(value: &str) -> Result<DateTime<Utc>, TrustError> {
    DateTime::parse_from_rfc2822(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TrustError::Freshness(format!("invalid date {value:?}: {e}")))
}

/// Evaluate a Release file's declared `Date` and `Valid-Until` against
/// `policy` as of `now`.
///
/// # Errors
/// Returns [`TrustError::Freshness`] if the Release's `Date` is too far in
/// the future, if `Valid-Until` has already passed and
/// `policy.check_valid_until` is set, or if the declared validity window
/// falls outside `valid_until_min`/`valid_until_max`.
pub fn check_freshness(
    date: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    policy: &FreshnessPolicy,
) -> Result<(), TrustError> {
    if let Some(date) = date {
        if date - now > policy.date_max_future {
            return Err(TrustError::Freshness(format!(
                "Release Date {date} is more than {} in the future",
                policy.date_max_future
            )));
        }
    }

    let Some(valid_until) = valid_until else {
        return Ok(());
    };

    if policy.check_valid_until && valid_until < now {
        return Err(TrustError::Freshness(format!("Release expired: Valid-Until {valid_until} has passed")));
    }

    let span = date.map(|date| valid_until - date);
    if let (Some(span), Some(min)) = (span, policy.valid_until_min) {
        if span < min {
            return Err(TrustError::Freshness(format!("Release validity window {span} is shorter than the configured minimum {min}")));
        }
    }
    if let (Some(span), Some(max)) = (span, policy.valid_until_max) {
        if span > max {
            return Err(TrustError::Freshness(format!("Release validity window {span} exceeds the configured maximum {max}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(rfc2822: &str) -> DateTime<Utc> {
        parse_release_date(rfc2822).unwrap()
    }

    #[test]
    fn accepts_a_release_within_its_validity_window() {
        let policy = FreshnessPolicy::default();
        let date = dt("Mon, 01 Jan 2024 00:00:00 UTC");
        let valid_until = dt("Mon, 08 Jan 2024 00:00:00 UTC");
        let now = dt("Wed, 03 Jan 2024 00:00:00 UTC");
        assert!(check_freshness(Some(date), Some(valid_until), now, &policy).is_ok());
    }

    #[test]
    fn rejects_an_expired_release() {
        let policy = FreshnessPolicy::default();
        let date = dt("Mon, 01 Jan 2024 00:00:00 UTC");
        let valid_until = dt("Mon, 08 Jan 2024 00:00:00 UTC");
        let now = dt("Mon, 15 Jan 2024 00:00:00 UTC");
        let err = check_freshness(Some(date), Some(valid_until), now, &policy).unwrap_err();
        assert!(matches!(err, TrustError::Freshness(_)));
    }

    #[test]
    fn disabling_check_valid_until_accepts_expired_release() {
        let policy = FreshnessPolicy { check_valid_until: false, ..FreshnessPolicy::default() };
        let date = dt("Mon, 01 Jan 2024 00:00:00 UTC");
        let valid_until = dt("Mon, 08 Jan 2024 00:00:00 UTC");
        let now = dt("Mon, 15 Jan 2024 00:00:00 UTC");
        assert!(check_freshness(Some(date), Some(valid_until), now, &policy).is_ok());
    }

    #[test]
    fn rejects_a_release_dated_too_far_in_the_future() {
        let policy = FreshnessPolicy::default();
        let now = dt("Mon, 01 Jan 2024 00:00:00 UTC");
        let date = dt("Thu, 04 Jan 2024 00:00:00 UTC");
        let err = check_freshness(Some(date), None, now, &policy).unwrap_err();
        assert!(matches!(err, TrustError::Freshness(_)));
    }

    #[test]
    fn rejects_a_validity_window_shorter_than_the_configured_minimum() {
        let policy = FreshnessPolicy { valid_until_min: Some(Duration::days(10)), ..FreshnessPolicy::default() };
        let date = dt("Mon, 01 Jan 2024 00:00:00 UTC");
        let valid_until = dt("Mon, 08 Jan 2024 00:00:00 UTC");
        let now = dt("Mon, 01 Jan 2024 00:00:00 UTC");
        let err = check_freshness(Some(date), Some(valid_until), now, &policy).unwrap_err();
        assert!(matches!(err, TrustError::Freshness(_)));
    }
}
