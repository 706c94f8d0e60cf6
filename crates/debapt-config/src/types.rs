//! The immutable configuration tree built once at startup
//! (`SPEC_FULL.md` §6's "Global configuration" design note).
//!
//! Nothing mutates a `Config` after [`Config::load`] returns; callers that
//! need a different view (e.g. a worker's filtered `601 Configuration`
//! dump) derive a new value from it rather than patching it in place.

use std::path::PathBuf;

use crate::env::EnvSnapshot;
use crate::sources::SourceEntry;

/// Proxy settings derived from the environment (`spec.md` §6).
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub no_proxy: Vec<String>,
}

impl ProxyConfig {
    fn from_env(env: &EnvSnapshot) -> Self {
        Self {
            http_proxy: env.http_proxy.clone(),
            https_proxy: env.https_proxy.clone(),
            no_proxy: env
                .no_proxy
                .as_deref()
                .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect())
                .unwrap_or_default(),
        }
    }
}

/// Filesystem roots apt's directory knobs (`Dir::*`) resolve to.
#[derive(Debug, Clone)]
pub struct DirLayout {
    pub state: PathBuf,
    pub state_lists: PathBuf,
    pub cache: PathBuf,
    pub cache_archives: PathBuf,
    pub etc: PathBuf,
    pub etc_sourcelist: PathBuf,
    pub etc_sourceparts: PathBuf,
    pub etc_netrc: PathBuf,
}

impl DirLayout {
    /// Standard Debian layout rooted at `/`.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            state: PathBuf::from("/var/lib/apt"),
            state_lists: PathBuf::from("/var/lib/apt/lists"),
            cache: PathBuf::from("/var/cache/apt"),
            cache_archives: PathBuf::from("/var/cache/apt/archives"),
            etc: PathBuf::from("/etc/apt"),
            etc_sourcelist: PathBuf::from("/etc/apt/sources.list"),
            etc_sourceparts: PathBuf::from("/etc/apt/sources.list.d"),
            etc_netrc: PathBuf::from("/etc/apt/auth.conf"),
        }
    }

    /// A layout rooted under `root`, for tests and chroots.
    #[must_use]
    pub fn rooted_at(root: &std::path::Path) -> Self {
        Self {
            state: root.join("var/lib/apt"),
            state_lists: root.join("var/lib/apt/lists"),
            cache: root.join("var/cache/apt"),
            cache_archives: root.join("var/cache/apt/archives"),
            etc: root.join("etc/apt"),
            etc_sourcelist: root.join("etc/apt/sources.list"),
            etc_sourceparts: root.join("etc/apt/sources.list.d"),
            etc_netrc: root.join("etc/apt/auth.conf"),
        }
    }
}

/// Sandbox/privilege-drop knobs, consumed by `debapt-platform` and
/// `debapt-acquire`.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub user: String,
    pub debug_no_locking: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self { user: "_apt".to_owned(), debug_no_locking: false }
    }
}

/// Queue-naming mode for the acquire engine's `Queue`s (`spec.md` §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// One queue per URI scheme.
    Access,
    /// One queue per `(scheme, host)`, up to [`AcquireConfig::queue_host_limit`].
    Host,
}

/// Acquire-engine knobs, consumed by `debapt-acquire`.
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    pub queue_mode: QueueMode,
    /// `Acquire::QueueHost::Limit`, default 2x online CPUs.
    pub queue_host_limit: usize,
    /// `Acquire::http::Pipeline-Depth`/generic `MaxPipeDepth`.
    pub max_pipe_depth: usize,
    pub pulse_interval: std::time::Duration,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            queue_mode: QueueMode::Host,
            queue_host_limit: 2 * num_cpus::get(),
            max_pipe_depth: 10,
            pulse_interval: std::time::Duration::from_millis(500),
        }
    }
}

/// Install-recommends/suggests policy knobs, consumed by
/// `debapt-depcache::policy`.
#[derive(Debug, Clone)]
pub struct InstallPolicy {
    pub install_recommends: bool,
    pub install_suggests: bool,
}

impl Default for InstallPolicy {
    fn default() -> Self {
        Self { install_recommends: true, install_suggests: false }
    }
}

/// The fully assembled, immutable configuration tree.
#[derive(Debug, Clone)]
pub struct Config {
    pub dirs: DirLayout,
    pub proxy: ProxyConfig,
    pub sandbox: SandboxConfig,
    pub install_policy: InstallPolicy,
    pub acquire: AcquireConfig,
    pub sources: Vec<SourceEntry>,
    pub sudo_user: Option<String>,
    pub sudo_command: Option<String>,
    pub shell: Option<String>,
    pub architectures: Vec<String>,
}

impl Config {
    /// Assemble a `Config` from defaults, the process environment, and the
    /// parsed sources list rooted at `dirs`. Nothing here is revisited
    /// later: a caller that needs different settings builds a new `Config`
    /// rather than mutating this one.
    pub fn load(dirs: DirLayout, native_arch: &str) -> crate::error::Result<Self> {
        let env = EnvSnapshot::capture();
        let sources = crate::sources::load_tree(&dirs.etc_sourcelist, &dirs.etc_sourceparts)?;
        Ok(Self {
            proxy: ProxyConfig::from_env(&env),
            sandbox: SandboxConfig::default(),
            install_policy: InstallPolicy::default(),
            acquire: AcquireConfig::default(),
            sudo_user: env.sudo_user,
            sudo_command: env.sudo_command,
            shell: env.shell,
            architectures: vec![native_arch.to_owned()],
            dirs,
            sources,
        })
    }

    /// Binary (`deb`) entries only.
    pub fn binary_sources(&self) -> impl Iterator<Item = &SourceEntry> {
        self.sources.iter().filter(|e| matches!(e.source_type, crate::sources::SourceType::Binary))
    }

    /// Source (`deb-src`) entries only.
    pub fn source_sources(&self) -> impl Iterator<Item = &SourceEntry> {
        self.sources.iter().filter(|e| matches!(e.source_type, crate::sources::SourceType::Source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooted_layout_nests_under_root() {
        let layout = DirLayout::rooted_at(std::path::Path::new("/tmp/chroot"));
        assert_eq!(layout.state_lists, PathBuf::from("/tmp/chroot/var/lib/apt/lists"));
    }
}
