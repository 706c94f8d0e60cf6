//! Unix-only ambient services: advisory locking, privilege drop, and the
//! `partial/` staging directory setup apt performs before an Acquire run.
//!
//! Debian's apt only ever targets POSIX/Debian-family hosts, so unlike the
//! layer this crate replaces, there's no Windows branch to carry forward.

#![warn(clippy::all)]
#![cfg(unix)]

pub mod dirs;
pub mod lock;
pub mod sandbox;

pub use lock::{FileLock, LockError};
pub use sandbox::{SandboxUser, drop_privileges};
