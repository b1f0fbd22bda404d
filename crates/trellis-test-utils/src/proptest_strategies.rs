//! Proptest strategies for Trellis types.

use proptest::prelude::*;
use trellis_resolver::{FloatBehavior, Version, VersionRange};

/// Strategy for stable three-part versions.
pub fn stable_version_strategy() -> impl Strategy<Value = Version> {
    (0u64..10, 0u64..10, 0u64..10).prop_map(|(major, minor, patch)| Version::new(major, minor, patch))
}

/// Strategy for versions with an optional release label.
pub fn version_strategy() -> impl Strategy<Value = Version> {
    let release = prop_oneof![
        Just("alpha".to_string()),
        Just("beta".to_string()),
        Just("rc".to_string()),
        (1u32..10).prop_map(|n| format!("beta.{n}")),
        (1u32..10).prop_map(|n| format!("rc.{n}")),
    ];

    (stable_version_strategy(), prop::option::of(release)).prop_map(|(version, release)| {
        match release {
            Some(label) => version.with_release(label),
            None => version,
        }
    })
}

/// Strategy for version strings in the accepted notation.
pub fn version_string_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        version_strategy().prop_map(|v| v.to_string()),
        (0u64..10, 0u64..10).prop_map(|(major, minor)| format!("{major}.{minor}")),
        (0u64..10, 0u64..10, 0u64..10, 1u64..10)
            .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}")),
    ]
}

/// Strategy for pinned, bounded and floating ranges.
pub fn version_range_strategy() -> impl Strategy<Value = VersionRange> {
    prop_oneof![
        stable_version_strategy().prop_map(VersionRange::pinned),
        stable_version_strategy().prop_map(VersionRange::exact),
        (stable_version_strategy(), 1u64..5).prop_map(|(min, span)| {
            let max = Version::new(min.major + span, 0, 0);
            VersionRange::between(min, max)
        }),
        (stable_version_strategy(), floating_behavior_strategy())
            .prop_map(|(min, behavior)| VersionRange::floating(min, behavior)),
    ]
}

fn floating_behavior_strategy() -> impl Strategy<Value = FloatBehavior> {
    prop_oneof![
        Just(FloatBehavior::Revision),
        Just(FloatBehavior::Build),
        Just(FloatBehavior::Minor),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_version_strings_parse(s in version_string_strategy()) {
            prop_assert!(Version::parse(&s).is_ok());
        }

        #[test]
        fn generated_ranges_admit_their_minimum(range in version_range_strategy()) {
            prop_assert!(range.satisfies(range.min_version()));
        }
    }
}
