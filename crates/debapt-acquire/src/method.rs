//! `MethodConfig`: per-scheme flags a worker announces via its `100
//! Capabilities` stanza (`spec.md` §4.5).

use crate::protocol::Stanza;

/// Capability flags a method announces at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodConfig {
    pub single_instance: bool,
    pub pipeline: bool,
    pub send_config: bool,
    pub local_only: bool,
    pub needs_cleanup: bool,
    pub removable: bool,
}

impl MethodConfig {
    /// Parse a `100 Capabilities` stanza's boolean fields.
    #[must_use]
    pub fn from_stanza(stanza: &Stanza) -> Self {
        let flag = |name: &str| stanza.field(name).is_some_and(|v| v.eq_ignore_ascii_case("true"));
        Self {
            single_instance: flag("Single-Instance"),
            pipeline: flag("Pipeline"),
            send_config: flag("Send-Config"),
            local_only: flag("Local-Only"),
            needs_cleanup: flag("Needs-Cleanup"),
            removable: flag("Removable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::code;

    #[test]
    fn parses_true_flags_case_insensitively() {
        let stanza = Stanza::new(code::CAPABILITIES, "Capabilities")
            .with_field("Pipeline", "true")
            .with_field("Local-Only", "True")
            .with_field("Removable", "false");
        let config = MethodConfig::from_stanza(&stanza);
        assert!(config.pipeline);
        assert!(config.local_only);
        assert!(!config.removable);
    }
}
