#![no_main]

use libfuzzer_sys::fuzz_target;

/// `Depends`/`Conflicts`/`Provides` relation fields (`foo (>= 1.0) [amd64]
/// | bar`) are the part of a `Packages` stanza with the most internal
/// punctuation-driven structure; exercise the comma/pipe/bracket splitter
/// directly rather than only through a full stanza.
fuzz_target!(|data: &str| {
    let _ = debapt_index::packages::parse_relation_field(data);
});
