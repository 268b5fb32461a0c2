#![no_main]

use ferry_core::reference::{has_bare_references, rewrite_with_prefix, scan};
use libfuzzer_sys::fuzz_target;

const PREFIX: &str = "acme/old";

fuzz_target!(|data: &[u8]| {
    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };

    let once = rewrite_with_prefix(content, PREFIX);
    let twice = rewrite_with_prefix(&once, PREFIX);
    assert_eq!(once, twice, "rewrite must be idempotent");

    assert!(!has_bare_references(&once));
    if scan(content).is_empty() {
        assert_eq!(once, content);
    } else {
        assert_eq!(once.len(), content.len() + scan(content).len() * PREFIX.len());
    }
});
