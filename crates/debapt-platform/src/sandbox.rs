//! Privilege drop for Acquire worker processes.
//!
//! Grounded in `apt-pkg/acquire.cc`'s `CheckDropPrivsMustBeDisabled` and the
//! `seteuid`/`setegid`/`setgroups` sequence it runs before spawning a
//! method. Our workers are spawned with `std::process::Command`, so instead
//! of an in-process `seteuid` that must later be undone, [`drop_privileges`]
//! is meant to be called from a `pre_exec` hook right before `execve`:
//! permanent, irreversible, and scoped to the child only.

use nix::unistd::{Gid, Uid, User, initgroups, setgid, setuid};

/// A resolved sandbox user, the Rust analog of apt's `APT::Sandbox::User`
/// (`_apt` by default on Debian systems).
#[derive(Debug, Clone)]
pub struct SandboxUser {
    pub name: String,
    pub uid: Uid,
    pub gid: Gid,
}

impl SandboxUser {
    /// Resolve `name` via `getpwnam`. Returns `Ok(None)` if the account
    /// doesn't exist, mirroring apt's "no sandbox user, can not drop
    /// privileges" warning-and-continue-as-root behavior rather than a
    /// hard error.
    pub fn resolve(name: &str) -> nix::Result<Option<Self>> {
        Ok(User::from_name(name)?.map(|u| Self { name: name.to_owned(), uid: u.uid, gid: u.gid }))
    }
}

/// Permanently drop from root to `user`, in the order the original uses:
/// supplementary groups, then gid, then uid. Order matters -- dropping uid
/// first would forfeit the permission needed to change gid/groups
/// afterward.
///
/// Must be called from a child process (or a `pre_exec` closure) that is
/// about to `exec` and never needs root again. Calling it in a long-lived
/// process would be a one-way trip with no way back to root.
///
/// # Errors
///
/// Returns the underlying `nix::Error` if any of `initgroups`/`setgid`/
/// `setuid` fails; per the original this is treated as fatal by the
/// caller, since continuing as root after a failed partial drop is unsafe.
pub fn drop_privileges(user: &SandboxUser) -> nix::Result<()> {
    let name = std::ffi::CString::new(user.name.as_str()).map_err(|_| nix::Error::EINVAL)?;
    initgroups(&name, user.gid)?;
    setgid(user.gid)?;
    setuid(user.uid)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_missing_user_is_none() {
        let resolved = SandboxUser::resolve("no-such-sandbox-user-hopefully").unwrap();
        assert!(resolved.is_none());
    }
}
