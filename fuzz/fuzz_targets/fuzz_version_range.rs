#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use trellis_resolver::{Version, VersionRange, find_best_match};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    range: &'a str,
    versions: Vec<(u8, u8, u8, Option<&'a str>)>,
}

fuzz_target!(|input: Input<'_>| {
    let Ok(range) = VersionRange::parse(input.range) else {
        return;
    };
    let _ = range.to_string();
    let _ = range.is_floating();

    let versions: Vec<Version> = input
        .versions
        .iter()
        .map(|&(major, minor, patch, release)| {
            let version = Version::new(u64::from(major), u64::from(minor), u64::from(patch));
            match release {
                Some(label) => version.with_release(label),
                None => version,
            }
        })
        .collect();

    for version in &versions {
        let _ = range.satisfies(version);
    }
    let _ = find_best_match(&versions, &range, |v| v);
});
