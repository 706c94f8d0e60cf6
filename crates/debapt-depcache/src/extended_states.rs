//! Extended states file (`spec.md` §6): one RFC822 stanza per
//! auto-installed package -- `Package:`, `Architecture:`,
//! `Auto-Installed: 1` -- the only piece of [`DepCache`](crate::DepCache)
//! state that survives a process restart. Round-tripped the same
//! atomic-write-then-rename way `debapt_cache::image::write_atomic`
//! persists the binary cache image (write to `<path>.apt-new`, `fsync`,
//! `rename`), guarded by an `fs2` advisory lock on the state directory so
//! two concurrent apt invocations can't interleave writes.

use std::fs::{self, File};
use std::path::Path;

use debapt_cache::Cache;
use debapt_core::ids::PkgId;
use debapt_core::{Error, Result};
use fs2::FileExt;
use std::io::Write;

use crate::overlay::DepCache;

/// One `Package:`/`Architecture:`/`Auto-Installed: 1` stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedStateEntry {
    pub package: String,
    pub architecture: String,
}

/// Parse the on-disk extended-states text into its stanza list.
///
/// # Errors
/// Returns [`Error::Malformed`] if a stanza is missing `Package`/
/// `Architecture`, or carries `Auto-Installed: 0` (apt never writes that;
/// a package that stops being auto-installed has its stanza dropped, not
/// zeroed).
pub fn parse(text: &str) -> Result<Vec<ExtendedStateEntry>> {
    text.split("\n\n").map(str::trim).filter(|s| !s.is_empty()).map(parse_one).collect()
}

fn parse_one(stanza: &str) -> Result<ExtendedStateEntry> {
    let mut package = None;
    let mut architecture = None;
    let mut auto_installed = false;
    for line in stanza.lines() {
        let Some((key, value)) = line.split_once(':') else {
            return Err(Error::Malformed(format!("extended-states: malformed line {line:?}")));
        };
        match key.trim() {
            "Package" => package = Some(value.trim().to_owned()),
            "Architecture" => architecture = Some(value.trim().to_owned()),
            "Auto-Installed" => auto_installed = value.trim() == "1",
            _ => {}
        }
    }
    let package = package.ok_or_else(|| Error::Malformed("extended-states: stanza missing Package".to_owned()))?;
    let architecture = architecture.ok_or_else(|| Error::Malformed("extended-states: stanza missing Architecture".to_owned()))?;
    if !auto_installed {
        return Err(Error::Malformed(format!("{package}: extended-states stanza without Auto-Installed: 1")));
    }
    Ok(ExtendedStateEntry { package, architecture })
}

/// Render entries back to the on-disk RFC822 form, one blank line between
/// stanzas, matching `apt-pkg/deb/debsystem.cc`'s `WriteStateFile` layout.
#[must_use]
pub fn render(entries: &[ExtendedStateEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str("Package: ");
        out.push_str(&entry.package);
        out.push_str("\nArchitecture: ");
        out.push_str(&entry.architecture);
        out.push_str("\nAuto-Installed: 1\n\n");
    }
    out
}

/// Load `path`'s extended-states file. A missing file isn't an error --
/// it just means no package has ever been marked auto-installed.
pub fn load(path: &Path) -> Result<Vec<ExtendedStateEntry>> {
    match fs::read_to_string(path) {
        Ok(text) => parse(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Mark every listed package auto-installed on a freshly built
/// [`DepCache`]. A package the current cache no longer knows about (an
/// index it dropped since the file was written) is silently skipped.
pub fn apply(depcache: &mut DepCache<'_>, cache: &Cache, entries: &[ExtendedStateEntry]) {
    for entry in entries {
        if let Some(pkg) = cache.find_package(&entry.package, &entry.architecture) {
            depcache.mark_auto(pkg, true);
        }
    }
}

/// Collect every package [`DepCache`] currently considers auto-installed,
/// in ascending [`PkgId`] order, ready for [`write`].
#[must_use]
pub fn collect(depcache: &DepCache<'_>, cache: &Cache) -> Vec<ExtendedStateEntry> {
    let mut entries = Vec::new();
    for raw in 1..=cache.header().package_count {
        let pkg = PkgId::new(raw);
        if depcache.is_auto_installed(pkg) {
            entries.push(ExtendedStateEntry { package: cache.package_name(pkg).to_owned(), architecture: cache.package_arch(pkg).to_owned() });
        }
    }
    entries
}

/// Write `entries` to `path` atomically, holding an `fs2` advisory lock on
/// a `.lock` file beside it for the duration so a concurrent writer can't
/// observe, or produce, a half-written file.
///
/// # Errors
/// Returns [`Error::Io`] on any filesystem failure and [`Error::Lock`] if
/// the advisory lock is already held elsewhere.
pub fn write(path: &Path, entries: &[ExtendedStateEntry]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let lock_path = dir.join("lock");
    let lock_file = File::create(&lock_path).map_err(|e| Error::io(&lock_path, e))?;
    lock_file.try_lock_exclusive().map_err(|e| Error::lock(&lock_path, e.to_string()))?;

    let tmp_path = path.with_extension("apt-new");
    let mut tmp = File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;
    tmp.write_all(render(entries).as_bytes()).map_err(|e| Error::io(&tmp_path, e))?;
    tmp.sync_all().map_err(|e| Error::io(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| Error::io(path, e))?;

    FileExt::unlock(&lock_file).map_err(|e| Error::io(&lock_path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_render_and_parse() {
        let entries = vec![
            ExtendedStateEntry { package: "libssl3".to_owned(), architecture: "amd64".to_owned() },
            ExtendedStateEntry { package: "libfoo".to_owned(), architecture: "i386".to_owned() },
        ];
        let text = render(&entries);
        assert_eq!(parse(&text).unwrap(), entries);
    }

    #[test]
    fn write_then_load_round_trips_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extended_states");
        let entries = vec![ExtendedStateEntry { package: "libssl3".to_owned(), architecture: "amd64".to_owned() }];

        write(&path, &entries).unwrap();
        assert_eq!(load(&path).unwrap(), entries);
    }

    #[test]
    fn load_missing_file_is_empty_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extended_states");
        assert_eq!(load(&path).unwrap(), Vec::new());
    }

    #[test]
    fn parse_rejects_stanza_without_auto_installed() {
        let text = "Package: foo\nArchitecture: amd64\n";
        assert!(parse(text).is_err());
    }
}
