#![no_main]

use libfuzzer_sys::fuzz_target;

/// Dpkg version strings are user-controlled (come straight off the wire in
/// a `Packages` file); the comparator must never panic regardless of epoch,
/// upstream, or revision garbage.
fuzz_target!(|data: (&str, &str)| {
    let (a, b) = data;
    if let (Ok(va), Ok(vb)) = (a.parse::<deb::version::Version>(), b.parse::<deb::version::Version>()) {
        let _ = va.cmp(&vb);
        // Antisymmetry: cmp must agree with itself when arguments are swapped.
        assert_eq!(va.cmp(&vb).reverse(), vb.cmp(&va));
    }
});
