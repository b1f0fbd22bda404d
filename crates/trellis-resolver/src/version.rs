//! Versions, version ranges and the "is this candidate better?" comparator.
//!
//! Versions have up to four numeric components plus an optional release
//! label and build metadata:
//!
//! - `1.2.3`, `1.2`, `1`, `1.2.3.4`
//! - `1.0.0-beta`, `1.0.0-rc.2`
//! - `1.0.0+build.7` (metadata is ignored when comparing)
//!
//! Ranges support interval notation and floating patterns:
//!
//! - Minimum: `1.0` (at least 1.0)
//! - Exact: `[1.0]`
//! - Interval: `[1.0, 2.0)`, `(1.0, )`, `(, 2.0]`
//! - Floating: `*`, `1.*`, `1.2.*`, `1.2.3.*`, `1.0.0-beta*`, `1.0.0-*`

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^
        (\d+)                           # major
        (?:\.(\d+))?                    # minor
        (?:\.(\d+))?                    # patch
        (?:\.(\d+))?                    # revision
        (?:-([0-9A-Za-z.\-]+))?         # release label
        (?:\+([0-9A-Za-z.\-]+))?        # build metadata
        $
        ",
    )
    .expect("valid regex")
});

/// Error when parsing a version or version range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version '{input}': {reason}")]
pub struct VersionParseError {
    /// The rejected input.
    pub input: String,
    /// What was wrong with it.
    pub reason: &'static str,
}

impl VersionParseError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

impl From<VersionParseError> for trellis_core::Error {
    fn from(err: VersionParseError) -> Self {
        Self::invalid_version(err.input, err.reason)
    }
}

/// A library version.
#[derive(Clone)]
pub struct Version {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
    /// Fourth component, zero when absent.
    pub revision: u64,
    release: Option<Arc<str>>,
    metadata: Option<Arc<str>>,
}

impl Version {
    /// Create a stable three-part version.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: 0,
            release: None,
            metadata: None,
        }
    }

    /// Set the fourth component.
    #[must_use]
    pub const fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// Set the release label.
    ///
    /// The label is not validated; an empty label sorts below every other
    /// alphanumeric label and is used as the floor of `1.0.0-*` ranges.
    #[must_use]
    pub fn with_release(mut self, release: impl AsRef<str>) -> Self {
        self.release = Some(Arc::from(release.as_ref()));
        self
    }

    /// Parse a version string.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_resolver::Version;
    ///
    /// let v = Version::parse("1.2.3-beta.1").unwrap();
    /// assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
    /// assert_eq!(v.release(), Some("beta.1"));
    /// ```
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionParseError::new(input, "empty version"));
        }

        let caps = VERSION_REGEX
            .captures(trimmed)
            .ok_or_else(|| VersionParseError::new(input, "expected major[.minor[.patch[.revision]]][-label]"))?;

        let component = |idx: usize| -> Result<u64, VersionParseError> {
            caps.get(idx).map_or(Ok(0), |m| {
                m.as_str()
                    .parse()
                    .map_err(|_| VersionParseError::new(input, "numeric component out of range"))
            })
        };

        Ok(Self {
            major: component(1)?,
            minor: component(2)?,
            patch: component(3)?,
            revision: component(4)?,
            release: caps.get(5).map(|m| Arc::from(m.as_str())),
            metadata: caps.get(6).map(|m| Arc::from(m.as_str())),
        })
    }

    /// Release label, if any.
    #[must_use]
    #[inline]
    pub fn release(&self) -> Option<&str> {
        self.release.as_deref()
    }

    /// Build metadata, if any.
    #[must_use]
    #[inline]
    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    /// Check if this version carries a release label.
    #[must_use]
    #[inline]
    pub fn is_prerelease(&self) -> bool {
        self.release.is_some()
    }

    /// The same version without release label or metadata.
    #[must_use]
    pub const fn numeric(&self) -> Self {
        Self::new(self.major, self.minor, self.patch).with_revision(self.revision)
    }

    #[inline]
    const fn components(&self) -> (u64, u64, u64, u64) {
        (self.major, self.minor, self.patch, self.revision)
    }

    fn write_numeric(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.revision > 0 {
            write!(f, ".{}", self.revision)?;
        }
        Ok(())
    }
}

/// Compare release labels identifier by identifier.
fn compare_release(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(n), Ok(m)) => n.cmp(&m),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x
                        .bytes()
                        .map(|c| c.to_ascii_lowercase())
                        .cmp(y.bytes().map(|c| c.to_ascii_lowercase())),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// ASCII case-insensitive `starts_with`.
fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.len() >= prefix.len()
        && value.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

impl Default for Version {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({self})")
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_numeric(f)?;
        if let Some(release) = &self.release {
            write!(f, "-{release}")?;
        }
        if let Some(metadata) = &self.metadata {
            write!(f, "+{metadata}")?;
        }
        Ok(())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components().hash(state);
        if let Some(release) = &self.release {
            for identifier in release.split('.') {
                match identifier.parse::<u64>() {
                    Ok(n) => n.hash(state),
                    Err(_) => {
                        for byte in identifier.bytes() {
                            state.write_u8(byte.to_ascii_lowercase());
                        }
                    }
                }
                state.write_u8(b'.');
            }
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components()
            .cmp(&other.components())
            .then_with(|| match (&self.release, &other.release) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => compare_release(a, b),
            })
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// How a range floats towards newer versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FloatBehavior {
    /// Not floating: the minimum is preferred.
    #[default]
    None,
    /// Newest release label with the given prefix (`1.0.0-beta*`).
    Prerelease,
    /// Newest fourth component (`1.2.3.*`).
    Revision,
    /// Newest patch (`1.2.*`).
    Build,
    /// Newest minor (`1.*`).
    Minor,
    /// Newest of anything (`*`).
    Major,
}

/// A version constraint with an optional floating policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    min_version: Version,
    is_min_inclusive: bool,
    max_version: Option<Version>,
    is_max_inclusive: bool,
    float_behavior: FloatBehavior,
}

impl VersionRange {
    /// Create a range from its parts.
    #[must_use]
    pub const fn new(
        min_version: Version,
        is_min_inclusive: bool,
        max_version: Option<Version>,
        is_max_inclusive: bool,
        float_behavior: FloatBehavior,
    ) -> Self {
        Self {
            min_version,
            is_min_inclusive,
            max_version,
            is_max_inclusive,
            float_behavior,
        }
    }

    /// At least `version`, preferring `version` itself.
    #[must_use]
    pub const fn pinned(version: Version) -> Self {
        Self::new(version, true, None, false, FloatBehavior::None)
    }

    /// Exactly `version`.
    #[must_use]
    pub fn exact(version: Version) -> Self {
        Self::new(version.clone(), true, Some(version), true, FloatBehavior::None)
    }

    /// `[min, max)`, preferring `min`.
    #[must_use]
    pub const fn between(min: Version, max: Version) -> Self {
        Self::new(min, true, Some(max), false, FloatBehavior::None)
    }

    /// A floating range anchored at `min_version`.
    #[must_use]
    pub const fn floating(min_version: Version, float_behavior: FloatBehavior) -> Self {
        Self::new(min_version, true, None, false, float_behavior)
    }

    /// Parse a range in interval or floating notation.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_resolver::{FloatBehavior, Version, VersionRange};
    ///
    /// let range = VersionRange::parse("1.*").unwrap();
    /// assert_eq!(range.float_behavior(), FloatBehavior::Minor);
    /// assert!(range.equals_floating(&Version::new(1, 9, 0)));
    /// ```
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(VersionParseError::new(input, "empty range"));
        }

        if s.starts_with('[') || s.starts_with('(') {
            return Self::parse_interval(input, s);
        }

        if s == "*" {
            return Ok(Self::floating(Version::default(), FloatBehavior::Major));
        }

        if let Some(prefix) = s.strip_suffix('*') {
            return Self::parse_floating(input, prefix);
        }

        Version::parse(s).map(Self::pinned)
    }

    fn parse_interval(input: &str, s: &str) -> Result<Self, VersionParseError> {
        let is_min_inclusive = s.starts_with('[');
        let is_max_inclusive = if s.ends_with(']') {
            true
        } else if s.ends_with(')') {
            false
        } else {
            return Err(VersionParseError::new(input, "unterminated interval"));
        };
        let inner = s[1..s.len() - 1].trim();

        let Some((low, high)) = inner.split_once(',') else {
            if !(is_min_inclusive && is_max_inclusive) {
                return Err(VersionParseError::new(input, "single-version intervals must use [x]"));
            }
            return Version::parse(inner).map(Self::exact);
        };

        let (low, high) = (low.trim(), high.trim());
        let (min_version, is_min_inclusive) = if low.is_empty() {
            (Version::default(), true)
        } else {
            (Version::parse(low)?, is_min_inclusive)
        };
        let max_version = if high.is_empty() {
            None
        } else {
            Some(Version::parse(high)?)
        };

        if let Some(max) = &max_version {
            match min_version.cmp(max) {
                Ordering::Greater => {
                    return Err(VersionParseError::new(input, "minimum is above maximum"));
                }
                Ordering::Equal if !(is_min_inclusive && is_max_inclusive) => {
                    return Err(VersionParseError::new(input, "interval is empty"));
                }
                _ => {}
            }
        }

        Ok(Self::new(
            min_version,
            is_min_inclusive,
            max_version,
            is_max_inclusive,
            FloatBehavior::None,
        ))
    }

    fn parse_floating(input: &str, prefix: &str) -> Result<Self, VersionParseError> {
        if let Some((numeric, label)) = prefix.split_once('-') {
            let base = Version::parse(numeric)?;
            if base.is_prerelease() || label.contains('*') {
                return Err(VersionParseError::new(input, "malformed prerelease pattern"));
            }
            return Ok(Self::floating(
                base.with_release(label),
                FloatBehavior::Prerelease,
            ));
        }

        let Some(numeric) = prefix.strip_suffix('.') else {
            return Err(VersionParseError::new(input, "'*' must follow '.' or '-'"));
        };
        let behavior = match numeric.split('.').count() {
            1 => FloatBehavior::Minor,
            2 => FloatBehavior::Build,
            3 => FloatBehavior::Revision,
            _ => return Err(VersionParseError::new(input, "too many components before '*'")),
        };
        let base = Version::parse(numeric)?;
        if base.is_prerelease() || base.metadata().is_some() {
            return Err(VersionParseError::new(input, "malformed floating pattern"));
        }
        Ok(Self::floating(base, behavior))
    }

    /// Lower bound.
    #[must_use]
    #[inline]
    pub const fn min_version(&self) -> &Version {
        &self.min_version
    }

    /// Whether the lower bound is inclusive.
    #[must_use]
    #[inline]
    pub const fn is_min_inclusive(&self) -> bool {
        self.is_min_inclusive
    }

    /// Upper bound, if any.
    #[must_use]
    #[inline]
    pub const fn max_version(&self) -> Option<&Version> {
        self.max_version.as_ref()
    }

    /// Whether the upper bound is inclusive.
    #[must_use]
    #[inline]
    pub const fn is_max_inclusive(&self) -> bool {
        self.is_max_inclusive
    }

    /// Floating policy.
    #[must_use]
    #[inline]
    pub const fn float_behavior(&self) -> FloatBehavior {
        self.float_behavior
    }

    /// Check if this range floats.
    #[must_use]
    #[inline]
    pub fn is_floating(&self) -> bool {
        self.float_behavior != FloatBehavior::None
    }

    /// Check if `version` matches the floating pattern of this range.
    ///
    /// For non-floating ranges only the minimum itself matches.
    #[must_use]
    pub fn equals_floating(&self, version: &Version) -> bool {
        let min = &self.min_version;
        match self.float_behavior {
            FloatBehavior::None => version == min,
            FloatBehavior::Prerelease => {
                version.components() == min.components()
                    && starts_with_ignore_case(
                        version.release().unwrap_or(""),
                        min.release().unwrap_or(""),
                    )
            }
            FloatBehavior::Revision => {
                (version.major, version.minor, version.patch) == (min.major, min.minor, min.patch)
            }
            FloatBehavior::Build => (version.major, version.minor) == (min.major, min.minor),
            FloatBehavior::Minor => version.major == min.major,
            FloatBehavior::Major => true,
        }
    }

    /// Check if `version` lies within the bounds of this range.
    #[must_use]
    pub fn satisfies(&self, version: &Version) -> bool {
        let above_min = if self.is_min_inclusive {
            version >= &self.min_version
        } else {
            version > &self.min_version
        };
        above_min && !self.exceeds_max(version)
    }

    fn exceeds_max(&self, version: &Version) -> bool {
        self.max_version.as_ref().is_some_and(|max| {
            if self.is_max_inclusive {
                version > max
            } else {
                version >= max
            }
        })
    }

    /// Decide whether `considering` should replace `current` as the best
    /// candidate for this range.
    ///
    /// Floating ranges favor the highest version matching the pattern;
    /// everything else favors the lowest version still in range.
    #[must_use]
    pub fn is_better(&self, current: Option<&Version>, considering: Option<&Version>) -> bool {
        let Some(considering) = considering else {
            return false;
        };

        if !self.equals_floating(considering) && considering < &self.min_version {
            return false;
        }

        if (!self.is_min_inclusive && considering == &self.min_version)
            || self.exceeds_max(considering)
        {
            return false;
        }

        let Some(current) = current else {
            return true;
        };

        if self.equals_floating(current) && self.equals_floating(considering) {
            return current < considering;
        }

        current > considering
    }
}

/// Pick the best candidate for `range` out of `items`.
///
/// Candidates are folded through [`VersionRange::is_better`] in iteration
/// order, so ties keep the earlier item.
pub fn find_best_match<'a, T, I, F>(items: I, range: &VersionRange, selector: F) -> Option<&'a T>
where
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> &Version,
{
    items.into_iter().fold(None, |best: Option<&'a T>, item| {
        if range.is_better(best.map(&selector), Some(selector(item))) {
            Some(item)
        } else {
            best
        }
    })
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let min = &self.min_version;
        match self.float_behavior {
            FloatBehavior::Major => f.write_str("*"),
            FloatBehavior::Minor => write!(f, "{}.*", min.major),
            FloatBehavior::Build => write!(f, "{}.{}.*", min.major, min.minor),
            FloatBehavior::Revision => {
                write!(f, "{}.{}.{}.*", min.major, min.minor, min.patch)
            }
            FloatBehavior::Prerelease => {
                min.write_numeric(f)?;
                write!(f, "-{}*", min.release().unwrap_or(""))
            }
            FloatBehavior::None => {
                if self.is_min_inclusive
                    && self.is_max_inclusive
                    && self.max_version.as_ref() == Some(min)
                {
                    return write!(f, "[{min}]");
                }
                f.write_str(if self.is_min_inclusive { "[" } else { "(" })?;
                write!(f, "{min}, ")?;
                if let Some(max) = &self.max_version {
                    write!(f, "{max}")?;
                }
                f.write_str(if self.is_max_inclusive { "]" } else { ")" })
            }
        }
    }
}

impl FromStr for VersionRange {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn r(s: &str) -> VersionRange {
        VersionRange::parse(s).unwrap()
    }

    mod version_parsing {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn short_forms_default_to_zero() {
            assert_eq!(v("1"), Version::new(1, 0, 0));
            assert_eq!(v("1.2"), Version::new(1, 2, 0));
            assert_eq!(v("1.2.3.4"), Version::new(1, 2, 3).with_revision(4));
        }

        #[test]
        fn release_and_metadata() {
            let parsed = v("2.0.0-rc.1+sha.5114f85");
            assert_eq!(parsed.release(), Some("rc.1"));
            assert_eq!(parsed.metadata(), Some("sha.5114f85"));
            assert!(parsed.is_prerelease());
        }

        #[test]
        fn rejects_garbage() {
            assert!(Version::parse("").is_err());
            assert!(Version::parse("v1.0").is_err());
            assert!(Version::parse("1.0.0-").is_err());
            assert!(Version::parse("1..0").is_err());
            assert!(Version::parse("99999999999999999999999").is_err());
        }

        #[test]
        fn display_is_normalized() {
            assert_eq!(v("1.2").to_string(), "1.2.0");
            assert_eq!(v("1.2.3.0").to_string(), "1.2.3");
            assert_eq!(v("1.2.3.4-beta").to_string(), "1.2.3.4-beta");
        }
    }

    mod version_ordering {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn numeric_components() {
            assert!(v("1.2.3") < v("1.10.0"));
            assert!(v("1.2.3") < v("1.2.3.1"));
        }

        #[test]
        fn stable_above_prerelease() {
            assert!(v("1.0.0-rc") < v("1.0.0"));
            assert!(v("1.0.0") < v("1.0.1-alpha"));
        }

        #[test]
        fn release_identifiers() {
            assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
            assert!(v("1.0.0-beta.2") < v("1.0.0-beta.10"));
            assert!(v("1.0.0-1") < v("1.0.0-alpha"));
            assert!(v("1.0.0-beta") < v("1.0.0-beta.1"));
        }

        #[test]
        fn labels_compare_case_insensitively() {
            assert_eq!(v("1.0.0-Beta"), v("1.0.0-beta"));
        }

        #[test]
        fn metadata_is_ignored() {
            assert_eq!(v("1.0.0+a"), v("1.0.0+b"));
        }
    }

    mod range_parsing {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn bare_version_is_minimum() {
            let range = r("1.0");
            assert_eq!(range, VersionRange::pinned(Version::new(1, 0, 0)));
            assert_eq!(range.to_string(), "[1.0.0, )");
        }

        #[test]
        fn exact() {
            let range = r("[1.2.3]");
            assert_eq!(range, VersionRange::exact(Version::new(1, 2, 3)));
            assert_eq!(range.to_string(), "[1.2.3]");
        }

        #[test]
        fn intervals() {
            let range = r("[1.0, 2.0)");
            assert_eq!(
                range,
                VersionRange::between(Version::new(1, 0, 0), Version::new(2, 0, 0))
            );
            assert!(range.satisfies(&v("1.9.9")));
            assert!(!range.satisfies(&v("2.0.0")));

            let open = r("(1.0, )");
            assert!(!open.satisfies(&v("1.0.0")));
            assert!(open.satisfies(&v("1.0.1")));

            let capped = r("(, 2.0]");
            assert_eq!(capped.min_version(), &Version::default());
            assert!(capped.satisfies(&v("2.0.0")));
        }

        #[test]
        fn floating_patterns() {
            assert_eq!(r("*").float_behavior(), FloatBehavior::Major);
            assert_eq!(r("1.*").float_behavior(), FloatBehavior::Minor);
            assert_eq!(r("1.2.*").float_behavior(), FloatBehavior::Build);
            assert_eq!(r("1.2.3.*").float_behavior(), FloatBehavior::Revision);

            let pre = r("1.0.0-beta*");
            assert_eq!(pre.float_behavior(), FloatBehavior::Prerelease);
            assert_eq!(pre.min_version().release(), Some("beta"));

            let any_pre = r("1.0.0-*");
            assert_eq!(any_pre.min_version().release(), Some(""));
        }

        #[test]
        fn display_round_trips() {
            for text in ["*", "1.*", "1.2.*", "1.2.3.*", "1.0.0-beta*", "[1.0.0, 2.0.0)", "(1.0.0, 2.0.0]"] {
                assert_eq!(r(text).to_string(), text);
            }
        }

        #[test]
        fn rejects_malformed() {
            for text in ["", "[1.0", "(1.0)", "[2.0, 1.0]", "[1.0, 1.0)", "1.2*", "1.2.3.4.*", "1.0-beta-*x"] {
                assert!(VersionRange::parse(text).is_err(), "{text} should not parse");
            }
        }
    }

    mod floating {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn none_matches_only_minimum() {
            let range = r("1.2.0");
            assert!(range.equals_floating(&v("1.2.0")));
            assert!(!range.equals_floating(&v("1.3.0")));
        }

        #[test]
        fn prerelease_matches_label_prefix() {
            let range = r("1.0.0-beta*");
            assert!(range.equals_floating(&v("1.0.0-beta")));
            assert!(range.equals_floating(&v("1.0.0-BETA2")));
            assert!(!range.equals_floating(&v("1.0.0-alpha")));
            assert!(!range.equals_floating(&v("1.0.1-beta")));

            let any = r("1.0.0-*");
            assert!(any.equals_floating(&v("1.0.0-alpha")));
            assert!(any.equals_floating(&v("1.0.0")));
        }

        #[test]
        fn component_floats() {
            assert!(r("1.2.3.*").equals_floating(&v("1.2.3.9")));
            assert!(!r("1.2.3.*").equals_floating(&v("1.2.4")));
            assert!(r("1.2.*").equals_floating(&v("1.2.40")));
            assert!(!r("1.2.*").equals_floating(&v("1.3.0")));
            assert!(r("1.*").equals_floating(&v("1.99.0")));
            assert!(!r("1.*").equals_floating(&v("2.0.0")));
            assert!(r("*").equals_floating(&v("42.0.0")));
        }
    }

    mod is_better {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn pinned_prefers_lowest_satisfying() {
            let range = r("1.2.0");
            assert!(range.is_better(Some(&v("1.3.0")), Some(&v("1.2.0"))));
            assert!(!range.is_better(Some(&v("1.2.0")), Some(&v("1.3.0"))));
        }

        #[test]
        fn floating_prefers_highest_matching() {
            let range = r("1.*");
            assert!(range.is_better(Some(&v("1.2.0")), Some(&v("1.9.0"))));
            assert!(!range.is_better(Some(&v("1.9.0")), Some(&v("1.2.0"))));
        }

        #[test]
        fn floating_prefers_pattern_over_outsider() {
            let range = r("1.*");
            assert!(!range.is_better(Some(&v("1.5.0")), Some(&v("2.0.0"))));
            assert!(range.is_better(Some(&v("2.0.0")), Some(&v("1.5.0"))));
        }

        #[test]
        fn null_handling_order() {
            let range = r("1.0.0");
            assert!(!range.is_better(None, None));
            assert!(!range.is_better(Some(&v("1.0.0")), None));
            assert!(range.is_better(None, Some(&v("1.4.0"))));
            assert!(!range.is_better(None, Some(&v("0.9.0"))));
        }

        #[test]
        fn respects_max_bound() {
            let range = r("[1.0.0, 2.0.0)");
            assert!(!range.is_better(None, Some(&v("2.0.0"))));
            assert!(range.is_better(None, Some(&v("1.99.0"))));

            let inclusive = r("[1.0.0, 2.0.0]");
            assert!(inclusive.is_better(None, Some(&v("2.0.0"))));
        }

        #[test]
        fn exclusive_minimum() {
            let range = r("(1.0.0, )");
            assert!(!range.is_better(None, Some(&v("1.0.0"))));
            assert!(range.is_better(None, Some(&v("1.0.1"))));
        }

        #[test]
        fn ties_keep_current() {
            let range = r("1.0.0");
            assert!(!range.is_better(Some(&v("1.0.0")), Some(&v("1.0.0"))));
        }
    }

    mod best_match {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn picks_per_policy() {
            let versions = [v("1.0.0"), v("1.5.0"), v("1.2.0"), v("2.1.0")];

            let pinned = find_best_match(&versions, &r("1.1.0"), |x| x);
            assert_eq!(pinned, Some(&v("1.2.0")));

            let floating = find_best_match(&versions, &r("1.*"), |x| x);
            assert_eq!(floating, Some(&v("1.5.0")));

            let none = find_best_match(&versions, &r("[3.0.0, 4.0.0)"), |x| x);
            assert_eq!(none, None);
        }

        #[test]
        fn floating_falls_back_above_pattern() {
            let versions = [v("2.0.0")];
            assert_eq!(find_best_match(&versions, &r("1.*"), |x| x), Some(&v("2.0.0")));
        }
    }
}
