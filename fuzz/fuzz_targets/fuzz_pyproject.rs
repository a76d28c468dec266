#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use robodeploy::infrastructure::requirements::parse_pyproject;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        let _ = parse_pyproject(Path::new("pyproject.toml"), content);
    }
});
