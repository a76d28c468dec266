#![no_main]

use libfuzzer_sys::fuzz_target;
use robodeploy::application::parse_pip_list;

fuzz_target!(|data: &[u8]| {
    if let Ok(output) = std::str::from_utf8(data) {
        let _ = parse_pip_list(output);
    }
});
