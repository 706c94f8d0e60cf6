#![no_main]

use libfuzzer_sys::fuzz_target;

/// A `Packages` file is untrusted network input until the release-file
/// hash gate runs; the stanza parser itself must reject malformed input
/// instead of panicking.
fuzz_target!(|data: &str| {
    let _ = debapt_index::parse_packages(data);
});
