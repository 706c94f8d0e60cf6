//! A temporary on-disk apt root: `var/lib/apt`, `var/cache/apt`, `etc/apt`
//! laid out under a [`tempfile::TempDir`], for tests that need real paths
//! instead of an in-memory [`Cache`](debapt_cache::Cache). Grounded on
//! [`DirLayout::rooted_at`] (the same rooting `debapt-config` itself uses
//! for chroot testing) plus [`setup_partial_dir`] for the `archives/partial`
//! and `lists/partial` staging directories the acquire engine expects.

use std::fs;
use std::path::Path;

use debapt_config::types::DirLayout;
use debapt_platform::dirs::setup_partial_dir;

/// A temporary apt root directory, built up with a fluent API before any
/// code under test touches it.
pub struct TempAptRoot {
    dir: tempfile::TempDir,
    layout: DirLayout,
}

impl TempAptRoot {
    /// Create the skeleton directories (`lists`, `lists/partial`,
    /// `archives`, `archives/partial`, `sources.list.d`) under a fresh
    /// temp dir, with nothing in them yet.
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let layout = DirLayout::rooted_at(dir.path());

        fs::create_dir_all(&layout.state_lists)?;
        fs::create_dir_all(&layout.cache_archives)?;
        fs::create_dir_all(&layout.etc_sourceparts)?;
        setup_partial_dir(&layout.state_lists, None)?;
        setup_partial_dir(&layout.cache_archives, None)?;

        Ok(Self { dir, layout })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn layout(&self) -> &DirLayout {
        &self.layout
    }

    /// Write `content` as the root's main `sources.list`.
    pub fn with_sources_list(self, content: &str) -> std::io::Result<Self> {
        fs::write(&self.layout.etc_sourcelist, content)?;
        Ok(self)
    }

    /// Write an extra fragment under `sources.list.d/<name>`.
    pub fn with_sources_list_d(self, name: &str, content: &str) -> std::io::Result<Self> {
        fs::write(self.layout.etc_sourceparts.join(name), content)?;
        Ok(self)
    }

    /// Write `content` as `var/lib/dpkg/status` (the installed-package
    /// database the dep-cache overlay reads at startup).
    pub fn with_status_file(self, content: &str) -> std::io::Result<Self> {
        let dpkg_dir = self.dir.path().join("var/lib/dpkg");
        fs::create_dir_all(&dpkg_dir)?;
        fs::write(dpkg_dir.join("status"), content)?;
        Ok(self)
    }

    /// Drop a pre-fetched `Packages` (or `Release`) file straight into
    /// `lists/`, as if a previous `update` had already run.
    pub fn with_list_file(self, name: &str, content: &[u8]) -> std::io::Result<Self> {
        fs::write(self.layout.state_lists.join(name), content)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_dirs_exist() {
        let root = TempAptRoot::new().unwrap();
        assert!(root.layout().state_lists.join("partial").is_dir());
        assert!(root.layout().cache_archives.join("partial").is_dir());
        assert!(root.layout().etc_sourceparts.is_dir());
    }

    #[test]
    fn fluent_writers_land_in_the_right_place() {
        let root = TempAptRoot::new()
            .unwrap()
            .with_sources_list("deb http://deb.example.org/debian bookworm main\n")
            .unwrap()
            .with_status_file("Package: base\nStatus: install ok installed\n")
            .unwrap();

        assert!(root.layout().etc_sourcelist.exists());
        assert!(root.path().join("var/lib/dpkg/status").exists());
    }
}
