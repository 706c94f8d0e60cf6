use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("package {0} is marked for install but has no install candidate recorded")]
    MissingCandidate(String),
    #[error("no download record for {package} {version} (index merge never saw a Filename for it)")]
    MissingRecord { package: String, version: String },
    #[error("version is not backed by any package file (loose/local deb), nothing to fetch")]
    NoBackingFile,
    #[error("none of {0}'s build-dependency alternatives have a candidate in the cache")]
    NoBuildDepCandidate(String),
    #[error("solving the build-dependency request failed: {0}")]
    Solve(#[from] debapt_solver::SolveError),
    #[error("applying the build-dependency transaction failed: {0}")]
    Mark(#[from] debapt_depcache::MarkError),
}

pub type Result<T> = std::result::Result<T, PlanError>;
