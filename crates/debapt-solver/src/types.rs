//! Solver-local types: per-version decisions, work-item group labels, and
//! the error/output shapes the backtracking loop in [`crate::resolver`]
//! produces.
//!
//! Grounded in `apt-pkg/solver3.cc`'s `Decision`, `Solver::Group` and
//! `Solver::Work` (the ordered work-queue entry).

use debapt_core::ids::{PkgId, VerId};

/// A version's current truth value in the partial assignment.
///
/// Unlike `debapt_depcache::Mode` (which package the *user* wants), this
/// tracks what the *solver* has proven about one specific version: every
/// version starts `Undecided`, and the loop drives every reachable one to
/// `Must` or `MustNot` before it can produce a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decision {
    #[default]
    Undecided,
    Must,
    MustNot,
}

/// Why a version was decided, kept for diagnostics and for the
/// `SolveError::Unsatisfiable` explanation.
#[derive(Debug, Clone, Copy)]
pub enum Reason {
    /// Named directly by the caller's transaction request.
    Request,
    /// Forced `MustNot` because a sibling version of the same package was
    /// committed `Must`.
    SiblingOf(VerId),
    /// Forced by a dependency of a committed version.
    DependencyOf(VerId),
    /// Forced `MustNot` by a Conflicts/Breaks/Obsoletes of a committed version.
    NegativeDepOf(VerId),
    /// Forced `MustNot` because it was the last live alternative of an
    /// OR-group all of whose other members are already `MustNot`.
    GroupExhausted,
    /// A choice point tried this version and it led to a contradiction.
    BacktrackExhausted,
}

/// Work-queue group label, highest priority first (`spec.md` §4.4). The
/// declaration order here is cosmetic; [`GroupLabel::rank`] is the actual
/// ordering the queue sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupLabel {
    HoldOrDelete,
    KeepAuto,
    InstallManual,
    UpgradeManual,
    UpgradeAuto,
    Satisfy,
    SatisfyNew,
    SatisfyObsolete,
    NewUnsatRecommends,
}

impl GroupLabel {
    /// Higher rank is serviced first by the work queue's max-heap.
    pub(crate) const fn rank(self) -> u8 {
        match self {
            Self::HoldOrDelete => 8,
            Self::KeepAuto => 7,
            Self::InstallManual => 6,
            Self::UpgradeManual => 5,
            Self::UpgradeAuto => 4,
            Self::Satisfy => 3,
            Self::SatisfyNew => 2,
            Self::SatisfyObsolete => 1,
            Self::NewUnsatRecommends => 0,
        }
    }
}

/// Where a work item's candidate list came from, used as the queue's last
/// tie-break ("package-origin reasons before version-origin ones").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A whole package the caller asked to install/remove/upgrade.
    Package,
    /// One OR-group of a committed version's dependency list.
    Version,
}

/// What the caller wants the transaction to achieve, before solving.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub install: Vec<PkgId>,
    pub remove: Vec<PkgId>,
}

impl Request {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, pkg: PkgId) -> &mut Self {
        self.install.push(pkg);
        self
    }

    pub fn remove(&mut self, pkg: PkgId) -> &mut Self {
        self.remove.push(pkg);
        self
    }
}

/// One resolved package decision, ready to apply to a
/// `debapt_depcache::DepCache`.
#[derive(Debug, Clone, Copy)]
pub struct Decided {
    pub package: PkgId,
    pub version: VerId,
    /// Pulled in to satisfy a dependency rather than named by the request.
    pub auto: bool,
}

/// The solver's output: which packages to install at which version, and
/// which currently-installed packages to remove.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    pub install: Vec<Decided>,
    pub remove: Vec<PkgId>,
}

#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error("no assignment satisfies the request: {0}")]
    Unsatisfiable(String),
    #[error("solver exceeded its backtracking depth budget")]
    DepthExceeded,
    #[error("package {0:?} has no install candidate")]
    NoCandidate(PkgId),
}
