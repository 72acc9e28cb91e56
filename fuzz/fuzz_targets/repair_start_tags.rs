#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let once = annotate::repair_start_tags(&input).into_owned();
    let twice = annotate::repair_start_tags(&once);
    assert_eq!(once, twice, "repair must be idempotent");
});
