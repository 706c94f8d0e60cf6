//! `partial/` staging directory setup, grounded in
//! `apt-pkg/acquire.cc`'s `SetupAPTPartialDirectory`: create the directory
//! if missing, chown it to the sandbox user (best-effort; a failure here is
//! a warning, not fatal -- a read-only parent just means downloads proceed
//! unsandboxed) and lock it down to `0700` so other local users can't see
//! in-flight partial downloads.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use nix::unistd::{Gid, Uid, chown};

use crate::sandbox::SandboxUser;

/// Ensure `parent/partial` exists and is owned/mode-restricted as apt's
/// method workers expect. Returns diagnostics rather than failing hard when
/// the chown/chmod step can't complete, matching the original's
/// warn-and-continue behavior.
pub fn setup_partial_dir(parent: &Path, sandbox: Option<&SandboxUser>) -> std::io::Result<debapt_core::Diagnostics> {
    let mut diag = debapt_core::Diagnostics::new();
    let partial = parent.join("partial");
    fs::create_dir_all(&partial)?;

    if let Some(user) = sandbox {
        if let Err(e) = chown(&partial, Some(Uid::from_raw(user.uid.as_raw())), Some(Gid::from_raw(user.gid.as_raw()))) {
            diag.push_for(
                debapt_core::Severity::Warning,
                partial.display().to_string(),
                format!("chown to {} failed: {e}", user.name),
            );
        }
    }

    if let Err(e) = fs::set_permissions(&partial, fs::Permissions::from_mode(0o700)) {
        diag.push_for(
            debapt_core::Severity::Warning,
            partial.display().to_string(),
            format!("chmod 0700 failed: {e}"),
        );
    }

    Ok(diag)
}
