//! Proptest strategies for Debian package/dependency types.
//!
//! This module provides strategies for generating random instances of
//! `debapt` domain types (package names, dpkg version strings, relation
//! fields) for property-based testing.

use proptest::prelude::*;

/// Strategy for generating valid Debian package names (`debian-policy`
/// §5.6.7: lowercase letters, digits, `+-.`, starting alphanumeric).
pub fn package_name_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9+.-]{2,30}".prop_map(|s| s)
}

/// Strategy for generating a declared architecture tag.
pub fn architecture_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("amd64".to_owned()),
        Just("i386".to_owned()),
        Just("arm64".to_owned()),
        Just("armhf".to_owned()),
        Just("all".to_owned()),
    ]
}

/// Strategy for an upstream version component: digits and dots only, no
/// leading zero-stripping surprises.
fn upstream_strategy() -> impl Strategy<Value = String> {
    (0u32..50, 0u32..50, 0u32..100).prop_map(|(a, b, c)| format!("{a}.{b}.{c}"))
}

/// Strategy for a Debian revision suffix (`-N` or `-NubuntuM`).
fn revision_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u32..20).prop_map(|n| format!("-{n}")),
        (1u32..20, 1u32..5).prop_map(|(n, u)| format!("-{n}ubuntu{u}")),
    ]
}

/// Strategy for generating a dpkg-format version string (`[epoch:]
/// upstream[-revision]`), `spec.md`'s "version string" field on
/// `Version`. Parseable by `deb::version::Version::from_str`.
pub fn dpkg_version_strategy() -> impl Strategy<Value = String> {
    let epoch = prop_oneof![Just(String::new()), (1u32..5).prop_map(|e| format!("{e}:"))];
    let revision = prop_oneof![Just(String::new()), revision_strategy()];
    (epoch, upstream_strategy(), revision).prop_map(|(epoch, upstream, revision)| format!("{epoch}{upstream}{revision}"))
}

/// Strategy for a version-constraint relational operator as it appears in
/// a `Depends` field (`>=`, `<<`, `=`, ...).
pub fn relation_operator_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(">="), Just("<="), Just(">>"), Just("<<"), Just("=")]
}

/// Strategy for one relation alternative, e.g. `libfoo (>= 1.2-3)`.
pub fn relation_alternative_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => package_name_strategy(),
        1 => (package_name_strategy(), relation_operator_strategy(), dpkg_version_strategy())
            .prop_map(|(pkg, op, ver)| format!("{pkg} ({op} {ver})")),
        1 => (package_name_strategy(), architecture_strategy())
            .prop_map(|(pkg, arch)| format!("{pkg} [{arch}]")),
    ]
}

/// Strategy for a full `Depends`-style field: comma-separated groups of
/// pipe-separated alternatives.
pub fn relation_field_strategy() -> impl Strategy<Value = String> {
    let group = prop::collection::vec(relation_alternative_strategy(), 1..=3).prop_map(|alts| alts.join(" | "));
    prop::collection::vec(group, 0..=4).prop_map(|groups| groups.join(", "))
}

/// Strategy for a `Priority` field value.
pub fn priority_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("required"), Just("important"), Just("standard"), Just("optional"), Just("extra")]
}

/// Strategy for a `sources.list` entry line.
pub fn sources_list_line_strategy() -> impl Strategy<Value = String> {
    let suite = prop_oneof![Just("stable".to_owned()), Just("bookworm".to_owned()), Just("testing".to_owned())];
    let component = prop_oneof![Just("main".to_owned()), Just("contrib".to_owned()), Just("non-free".to_owned())];
    let ty = prop_oneof![Just("deb"), Just("deb-src")];
    (ty, suite, prop::collection::vec(component, 1..=3))
        .prop_map(|(ty, suite, comps)| format!("{ty} http://deb.example.org/debian {suite} {}", comps.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_package_name_strategy_shape() {
        let mut runner = TestRunner::default();
        for _ in 0..100 {
            let name = package_name_strategy().new_tree(&mut runner).unwrap().current();
            assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+-.".contains(c)));
        }
    }

    #[test]
    fn test_dpkg_version_strategy_parses() {
        let mut runner = TestRunner::default();
        for _ in 0..100 {
            let version = dpkg_version_strategy().new_tree(&mut runner).unwrap().current();
            assert!(version.parse::<deb::version::Version>().is_ok(), "{version} should parse");
        }
    }

    proptest! {
        #[test]
        fn prop_package_name_nonempty(name in package_name_strategy()) {
            assert!(!name.is_empty());
        }

        #[test]
        fn prop_dpkg_version_is_reflexive(version in dpkg_version_strategy()) {
            let parsed: deb::version::Version = version.parse().unwrap();
            assert_eq!(parsed.cmp(&parsed), std::cmp::Ordering::Equal);
        }

        #[test]
        fn prop_relation_field_no_panic(field in relation_field_strategy()) {
            let _ = debapt_index::packages::parse_relation_field(&field);
        }
    }
}
