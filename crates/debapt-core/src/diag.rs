//! The diagnostics accumulator that replaces apt's process-wide
//! push/revert/merge error stack (`spec.md` §7, §9).
//!
//! The original threads a single global `pkgAcquireStatus`-adjacent error
//! stack through every call; code that tries several strategies pushes a
//! scope, lets the attempt run, and either reverts (discarding whatever the
//! failed attempt logged) or merges (keeping it) into the outer scope. We
//! get the same scoping without global mutable state: every operation that
//! can fail partially returns its own `Diagnostics`, and callers decide
//! whether to fold a child's diagnostics into their own.

use std::fmt;

/// How serious a diagnostic is, mirroring `spec.md` §7's taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational; no operation was impaired.
    Notice,
    /// Recorded and continue; e.g. a non-fatal chown failure.
    Warning,
    /// Abort the current operation; e.g. unmet dependency, hash mismatch.
    Error,
    /// Abort the whole run; e.g. lockfile contention, cache corruption.
    Fatal,
}

/// One entry in a `Diagnostics` accumulator.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity of this entry.
    pub severity: Severity,
    /// Localizable-in-principle message; we don't do translation (an
    /// explicit Non-goal), so this is just English text.
    pub message: String,
    /// Optional context naming what produced the diagnostic, e.g. a
    /// package name or URI.
    pub source: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {} ({src})", self.severity, self.message),
            None => write!(f, "{:?}: {}", self.severity, self.message),
        }
    }
}

/// An ordered collection of diagnostics produced by one operation (or one
/// attempt within an operation).
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// An empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.entries.push(Diagnostic { severity, message: message.into(), source: None });
    }

    /// Record a diagnostic with a named source (package, URI, ...).
    pub fn push_for(&mut self, severity: Severity, source: impl Into<String>, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            severity,
            message: message.into(),
            source: Some(source.into()),
        });
    }

    /// Fold another accumulator's entries into this one. This is the
    /// "merge" half of push/revert/merge: call it when a child attempt
    /// succeeded, or when it's the final failed attempt whose diagnostics
    /// should surface to the user.
    pub fn merge(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// Discard `other` without folding it in. This is the "revert" half:
    /// call it when a child attempt failed but a later strategy succeeded,
    /// so the failed attempt's noise shouldn't reach the user.
    pub fn revert(&mut self, other: Diagnostics) {
        drop(other);
    }

    /// True if any entry is `Error` or `Fatal`.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity >= Severity::Error)
    }

    /// True if any entry is `Fatal`.
    #[must_use]
    pub fn has_fatal(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Fatal)
    }

    /// Iterate all entries in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// True if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_discards_child_entries() {
        let mut outer = Diagnostics::new();
        let mut inner = Diagnostics::new();
        inner.push(Severity::Error, "tried https, failed");
        outer.revert(inner);
        assert!(outer.is_empty());
    }

    #[test]
    fn merge_keeps_child_entries() {
        let mut outer = Diagnostics::new();
        let mut inner = Diagnostics::new();
        inner.push(Severity::Warning, "fell back to ftp");
        outer.merge(inner);
        assert_eq!(outer.len(), 1);
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let mut d = Diagnostics::new();
        d.push(Severity::Warning, "non-fatal");
        assert!(!d.has_errors());
        d.push(Severity::Error, "fatal enough");
        assert!(d.has_errors());
    }
}
