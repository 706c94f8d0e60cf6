#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;

/// `sources.list`/`sources.list.d/*.list` are locally-editable but still
/// worth hardening: a malformed entry must produce an error, not a panic,
/// so one bad line in `/etc/apt/sources.list.d/` can't wedge the whole
/// config load.
fuzz_target!(|data: &str| {
    let _ = debapt_config::sources::parse(Path::new("sources.list"), data);
});
