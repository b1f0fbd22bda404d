#![no_main]

use libfuzzer_sys::fuzz_target;
use trellis_resolver::Version;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(version) = Version::parse(s) {
            let _ = version.to_string();
            let _ = version.release();
            let _ = version.cmp(&Version::new(1, 0, 0));
        }
    }
});
