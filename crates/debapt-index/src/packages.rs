//! Parsing one `Packages`/`Sources` stanza into the fields
//! `debapt_cache::gen::CacheGenerator::new_version`/`new_depends`/
//! `new_provides` need.

use deb::control::Paragraph;
use debapt_cache::entities::{CompareOp, DepKind, MultiArch, Priority, ProvideFlags};
use debapt_cache::gen::{DependencyRequest, ProvidesRequest};

use crate::IndexError;

/// One parsed relation alternative: `foo (>= 1.0) [amd64]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationAlternative {
    pub package: String,
    pub arch: Option<String>,
    pub constraint: Option<(CompareOp, String)>,
}

/// One control-file dependency field, split on `,` into groups and `|`
/// into OR-alternatives within a group, per `deb-control(5)`.
pub type RelationField = Vec<Vec<RelationAlternative>>;

/// A `Packages` stanza's fields, enough to build one binary [`Version`].
///
/// [`Version`]: debapt_cache::entities::Version
#[derive(Debug, Clone)]
pub struct PackageStanza {
    pub package: String,
    pub version: String,
    pub architecture: String,
    pub multi_arch: MultiArch,
    pub priority: Priority,
    pub section: Option<String>,
    pub source_package: Option<String>,
    pub source_version: Option<String>,
    pub installed_size: u64,
    pub filename: String,
    pub size: u64,
    pub sha256: Option<String>,
    pub depends: Vec<(DepKind, RelationField)>,
    pub provides: Vec<RelationAlternative>,
}

/// Parse every stanza (separated by blank lines) out of a `Packages` file's
/// decompressed text.
///
/// # Errors
/// Returns [`IndexError::Parse`] if a stanza isn't valid RFC822, or is
/// missing `Package`/`Version`/`Architecture`.
pub fn parse_packages(text: &str) -> Result<Vec<PackageStanza>, IndexError> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|stanza| !stanza.is_empty())
        .map(parse_one_stanza)
        .collect()
}

fn parse_one_stanza(text: &str) -> Result<PackageStanza, IndexError> {
    let paragraph = Paragraph::parse(text).map_err(|e| IndexError::Parse(e.to_string()))?;
    let require = |name: &str| -> Result<String, IndexError> {
        paragraph.get(name).map(|v| v.trim().to_owned()).ok_or_else(|| IndexError::Parse(format!("missing {name} field")))
    };
    let optional = |name: &str| paragraph.get(name).map(|v| v.trim().to_owned());

    let multi_arch = match optional("Multi-Arch").as_deref() {
        Some("same") => MultiArch::Same,
        Some("foreign") => MultiArch::Foreign,
        Some("allowed") => MultiArch::Allowed,
        _ => MultiArch::None,
    };
    let priority = match optional("Priority").as_deref() {
        Some("required") => Priority::Required,
        Some("important") => Priority::Important,
        Some("standard") => Priority::Standard,
        Some("optional") => Priority::Optional,
        Some("extra") => Priority::Extra,
        _ => Priority::Unknown,
    };

    let (source_package, source_version) = match optional("Source") {
        Some(value) => parse_source_field(&value),
        None => (None, None),
    };

    let mut depends = Vec::new();
    for (field, kind) in DEPENDENCY_FIELDS {
        if let Some(value) = optional(field) {
            depends.push((kind, parse_relation_field(&value)));
        }
    }
    let provides = optional("Provides").map(|v| parse_relation_field(&v).into_iter().flatten().collect()).unwrap_or_default();

    Ok(PackageStanza {
        package: require("Package")?,
        version: require("Version")?,
        architecture: require("Architecture")?,
        multi_arch,
        priority,
        section: optional("Section"),
        source_package,
        source_version,
        installed_size: optional("Installed-Size").and_then(|v| v.parse().ok()).unwrap_or(0),
        filename: optional("Filename").unwrap_or_default(),
        size: optional("Size").and_then(|v| v.parse().ok()).unwrap_or(0),
        sha256: optional("SHA256"),
        depends,
        provides,
    })
}

const DEPENDENCY_FIELDS: [(&str, DepKind); 9] = [
    ("Depends", DepKind::DEPENDS),
    ("Pre-Depends", DepKind::PRE_DEPENDS),
    ("Recommends", DepKind::RECOMMENDS),
    ("Suggests", DepKind::SUGGESTS),
    ("Enhances", DepKind::ENHANCES),
    ("Conflicts", DepKind::CONFLICTS),
    ("Breaks", DepKind::BREAKS),
    ("Replaces", DepKind::REPLACES),
    ("Obsoletes", DepKind::OBSOLETES),
];

/// `Source: foo (1.2-3)` -> `("foo", Some("1.2-3"))`; `Source: foo` ->
/// `("foo", None)` (binary version applies).
fn parse_source_field(value: &str) -> (Option<String>, Option<String>) {
    match value.split_once('(') {
        Some((name, rest)) => {
            let version = rest.trim_end().trim_end_matches(')').trim().to_owned();
            (Some(name.trim().to_owned()), Some(version))
        }
        None => (Some(value.trim().to_owned()), None),
    }
}

/// Parse a relation field: comma-separated groups of pipe-separated
/// alternatives, each `name [(op version)] [[arch]]`.
#[must_use]
pub fn parse_relation_field(value: &str) -> RelationField {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|group| group.split('|').map(str::trim).filter_map(parse_one_alternative).collect())
        .collect()
}

fn parse_one_alternative(text: &str) -> Option<RelationAlternative> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (before_arch, arch) = match text.split_once('[') {
        Some((head, tail)) => (head.trim(), Some(tail.trim_end_matches(']').trim().to_owned())),
        None => (text, None),
    };

    let (package, constraint) = match before_arch.split_once('(') {
        Some((name, rest)) => {
            let inner = rest.trim_end().trim_end_matches(')').trim();
            (name.trim().to_owned(), parse_constraint(inner))
        }
        None => (before_arch.trim().to_owned(), None),
    };

    Some(RelationAlternative { package, arch, constraint })
}

fn parse_constraint(inner: &str) -> Option<(CompareOp, String)> {
    const OPS: [(&str, CompareOp); 6] = [
        (">=", CompareOp::GreaterEq),
        ("<=", CompareOp::LessEq),
        ("<<", CompareOp::Less),
        (">>", CompareOp::Greater),
        ("=", CompareOp::Equal),
        ("!=", CompareOp::NotEqual),
    ];
    for (token, op) in OPS {
        if let Some(rest) = inner.strip_prefix(token) {
            return Some((op, rest.trim().to_owned()));
        }
    }
    None
}

/// Turn a parsed [`RelationField`] into the flat, OR-group-annotated
/// sequence [`debapt_cache::gen::CacheGenerator::new_depends`] expects.
#[must_use]
pub fn depends_requests(kind: DepKind, field: &RelationField) -> Vec<DependencyRequest<'_>> {
    let mut out = Vec::new();
    for group in field {
        let len = group.len();
        for (i, alt) in group.iter().enumerate() {
            out.push(DependencyRequest {
                target_package: &alt.package,
                target_arch: alt.arch.as_deref(),
                version_constraint: alt.constraint.as_ref().map(|(op, v)| (*op, v.as_str())),
                kind,
                or_group: i + 1 < len,
            });
        }
    }
    out
}

/// Turn the parsed `Provides` field into requests for
/// [`debapt_cache::gen::CacheGenerator::new_provides`].
#[must_use]
pub fn provides_requests(provides: &[RelationAlternative]) -> Vec<ProvidesRequest<'_>> {
    provides
        .iter()
        .map(|alt| ProvidesRequest {
            target_package: &alt.package,
            provide_version: alt.constraint.as_ref().map(|(_, v)| v.as_str()),
            flags: ProvideFlags(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Package: curl\nVersion: 8.4.0-1\nArchitecture: amd64\nMulti-Arch: foreign\nPriority: optional\nSection: web\nInstalled-Size: 456\nFilename: pool/main/c/curl/curl_8.4.0-1_amd64.deb\nSize: 123456\nSHA256: abc123\nDepends: libc6 (>= 2.34), libcurl4 (= 8.4.0-1)\nRecommends: ca-certificates\nProvides: web-client\n";

    #[test]
    fn parses_core_fields() {
        let stanzas = parse_packages(SAMPLE).unwrap();
        assert_eq!(stanzas.len(), 1);
        let pkg = &stanzas[0];
        assert_eq!(pkg.package, "curl");
        assert_eq!(pkg.version, "8.4.0-1");
        assert_eq!(pkg.multi_arch, MultiArch::Foreign);
        assert_eq!(pkg.priority, Priority::Optional);
        assert_eq!(pkg.installed_size, 456);
    }

    #[test]
    fn parses_depends_with_or_group_and_constraint() {
        let stanzas = parse_packages(SAMPLE).unwrap();
        let (kind, field) = stanzas[0].depends.iter().find(|(k, _)| *k == DepKind::DEPENDS).unwrap();
        assert_eq!(*kind, DepKind::DEPENDS);
        assert_eq!(field.len(), 2);
        assert_eq!(field[0][0].package, "libc6");
        assert_eq!(field[0][0].constraint, Some((CompareOp::GreaterEq, "2.34".to_owned())));
    }

    #[test]
    fn parses_provides() {
        let stanzas = parse_packages(SAMPLE).unwrap();
        assert_eq!(stanzas[0].provides[0].package, "web-client");
    }

    #[test]
    fn depends_requests_marks_all_but_last_in_or_group() {
        let field = parse_relation_field("foo | bar | baz");
        let requests = depends_requests(DepKind::DEPENDS, &field);
        assert!(requests[0].or_group);
        assert!(requests[1].or_group);
        assert!(!requests[2].or_group);
    }

    #[test]
    fn parses_source_field_with_version_override() {
        assert_eq!(parse_source_field("foo (1.2-3)"), (Some("foo".to_owned()), Some("1.2-3".to_owned())));
        assert_eq!(parse_source_field("foo"), (Some("foo".to_owned()), None));
    }
}
