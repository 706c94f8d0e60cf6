#![no_main]

use libfuzzer_sys::fuzz_target;

/// `Release`/`InRelease` stanzas are only fed through `parse_release` after
/// clearsign-unwrap, but the unwrapped body is still attacker-controlled
/// until the signature is checked against a trusted keyring.
fuzz_target!(|data: &str| {
    let _ = debapt_index::parse_release(data);
});
