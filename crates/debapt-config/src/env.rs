//! The environment variables apt consumes directly (`spec.md` §6). Everything
//! else, notably `DPKG_*`, passes through to dpkg untouched and is never
//! read by this workspace.

/// One of the environment variables apt reads when building its
/// configuration tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvVar {
    /// `no_proxy` - hosts to bypass any proxy for.
    NoProxy,
    /// `http_proxy` - proxy for plain HTTP acquisition.
    HttpProxy,
    /// `https_proxy` - proxy for HTTPS acquisition.
    HttpsProxy,
    /// `SUDO_USER` - the user who invoked `sudo`, consulted by the sandbox
    /// and history-logging code.
    SudoUser,
    /// `SUDO_COMMAND` - the command line `sudo` was invoked with.
    SudoCommand,
    /// `SHELL` - consulted by the pager/editor invocation helpers.
    Shell,
    /// `APT_CONFIG` - path to an additional apt.conf fragment.
    AptConfig,
}

impl EnvVar {
    /// The variable's name as it appears in the process environment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoProxy => "no_proxy",
            Self::HttpProxy => "http_proxy",
            Self::HttpsProxy => "https_proxy",
            Self::SudoUser => "SUDO_USER",
            Self::SudoCommand => "SUDO_COMMAND",
            Self::Shell => "SHELL",
            Self::AptConfig => "APT_CONFIG",
        }
    }

    /// Read this variable from the current process environment.
    #[must_use]
    pub fn read(self) -> Option<String> {
        std::env::var(self.as_str()).ok()
    }

    /// All variables this workspace consumes, in the order `spec.md` §6
    /// lists them.
    pub const ALL: [Self; 7] = [
        Self::NoProxy,
        Self::HttpProxy,
        Self::HttpsProxy,
        Self::SudoUser,
        Self::SudoCommand,
        Self::Shell,
        Self::AptConfig,
    ];
}

/// The subset of environment state that feeds [`crate::types::Config`].
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    pub no_proxy: Option<String>,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub sudo_user: Option<String>,
    pub sudo_command: Option<String>,
    pub shell: Option<String>,
    pub apt_config: Option<String>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            no_proxy: EnvVar::NoProxy.read(),
            http_proxy: EnvVar::HttpProxy.read(),
            https_proxy: EnvVar::HttpsProxy.read(),
            sudo_user: EnvVar::SudoUser.read(),
            sudo_command: EnvVar::SudoCommand.read(),
            shell: EnvVar::Shell.read(),
            apt_config: EnvVar::AptConfig.read(),
        }
    }
}
