#![no_main]

use libfuzzer_sys::fuzz_target;
use robodeploy::infrastructure::requirements::parse_requirement;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        if let Ok(req) = parse_requirement(line) {
            assert!(!req.name.is_empty());
            assert!(!req.version.is_empty());
        }
    }
});
