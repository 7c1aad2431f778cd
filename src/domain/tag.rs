use crate::error::{ReleaseError, Result};
use semver::Version;
use std::fmt;
use std::str::FromStr;

/// Prefix every release tag carries in front of its version number
pub const TAG_PREFIX: &str = "v";

// Exactly three dot-separated runs of ASCII digits
fn is_plain_version(number: &str) -> bool {
    let parts: Vec<&str> = number.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

/// A release tag of the form `vMAJOR.MINOR.PATCH`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    version: Version,
}

impl Tag {
    /// Create a tag from its numeric components
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Tag {
            version: Version::new(major, minor, patch),
        }
    }

    /// The tag used when a branch has no release history yet
    pub fn initial() -> Self {
        Tag::new(0, 0, 0)
    }

    /// Parse a tag strictly: lowercase `v` prefix, three integer components,
    /// no pre-release or build metadata.
    pub fn parse(s: &str) -> Result<Self> {
        if !s.starts_with(TAG_PREFIX) {
            return Err(ReleaseError::malformed_tag(s, "missing 'v' prefix"));
        }

        let number = &s[TAG_PREFIX.len()..];
        if !is_plain_version(number) {
            return Err(ReleaseError::malformed_tag(s, "expected vMAJOR.MINOR.PATCH"));
        }

        let version = Version::parse(number)
            .map_err(|e| ReleaseError::malformed_tag(s, e.to_string()))?;

        Ok(Tag { version })
    }

    pub fn major(&self) -> u64 {
        self.version.major
    }

    pub fn minor(&self) -> u64 {
        self.version.minor
    }

    pub fn patch(&self) -> u64 {
        self.version.patch
    }

    /// Version number without the tag prefix (e.g. "v1.2.3" -> "1.2.3")
    pub fn version_str(&self) -> String {
        self.version.to_string()
    }

    /// The tag with its patch component incremented
    pub fn next_patch(&self) -> Result<Self> {
        let patch = self
            .version
            .patch
            .checked_add(1)
            .ok_or_else(|| ReleaseError::malformed_tag(self.to_string(), "patch overflow"))?;

        Ok(Tag::new(self.version.major, self.version.minor, patch))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", TAG_PREFIX, self.version)
    }
}

impl FromStr for Tag {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        Tag::parse(s)
    }
}

/// Computes the next release tag from a branch's tag history.
///
/// `history` is ordered most recent first, the order a walk back from HEAD
/// yields. The most recent tag is bumped by one patch; an empty history
/// starts from `v0.0.0`, so the first release is `v0.0.1`.
///
/// # Errors
/// `MalformedTag` when the most recent tag is not `vX.Y.Z`.
pub fn compute_next_tag<S: AsRef<str>>(history: &[S]) -> Result<Tag> {
    let latest = match history.first() {
        Some(name) => Tag::parse(name.as_ref())?,
        None => Tag::initial(),
    };

    latest.next_patch()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_tag() {
        let tag = Tag::parse("v1.2.3").unwrap();
        assert_eq!((tag.major(), tag.minor(), tag.patch()), (1, 2, 3));
        assert_eq!(tag.to_string(), "v1.2.3");
        assert_eq!(tag.version_str(), "1.2.3");
    }

    #[test]
    fn test_parse_rejects_missing_prefix() {
        let err = Tag::parse("1.2.3").unwrap_err();
        assert!(matches!(err, ReleaseError::MalformedTag { .. }));
    }

    #[test]
    fn test_parse_rejects_non_semver_names() {
        for bad in [
            "release-1",
            "v1.2",
            "v1.2.3.4",
            "V1.2.3",
            "v1.2.3-rc.1",
            "v1.2.3+build",
            "v1.a.3",
            "v",
            "",
        ] {
            assert!(
                matches!(Tag::parse(bad), Err(ReleaseError::MalformedTag { .. })),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_rejects_non_ascii_digits() {
        for bad in ["v1.2.\u{0663}", "v\u{FF11}.0.0", "v1..3", "v01.2.3"] {
            assert!(
                matches!(Tag::parse(bad), Err(ReleaseError::MalformedTag { .. })),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_rejects_component_overflow() {
        assert!(Tag::parse("v1.2.99999999999999999999999").is_err());
    }

    #[test]
    fn test_from_str() {
        let tag: Tag = "v0.10.7".parse().unwrap();
        assert_eq!(tag, Tag::new(0, 10, 7));
    }

    #[test]
    fn test_next_tag_bumps_patch() {
        let next = compute_next_tag(&["v1.2.3"]).unwrap();
        assert_eq!(next.to_string(), "v1.2.4");
    }

    #[test]
    fn test_next_tag_keeps_major_and_minor() {
        let next = compute_next_tag(&["v3.9.99"]).unwrap();
        assert_eq!(next, Tag::new(3, 9, 100));
    }

    #[test]
    fn test_next_tag_empty_history() {
        let history: [&str; 0] = [];
        assert_eq!(compute_next_tag(&history).unwrap().to_string(), "v0.0.1");
    }

    #[test]
    fn test_next_tag_uses_most_recent_only() {
        let history = vec!["v2.0.0".to_string(), "v1.9.9".to_string(), "junk".to_string()];
        assert_eq!(compute_next_tag(history.as_slice()).unwrap(), Tag::new(2, 0, 1));
    }

    #[test]
    fn test_next_tag_malformed_latest() {
        let err = compute_next_tag(&["release-1", "v1.0.0"]).unwrap_err();
        assert!(matches!(err, ReleaseError::MalformedTag { ref tag, .. } if tag == "release-1"));

        assert!(compute_next_tag(&["1.2.3"]).is_err());
    }

    #[test]
    fn test_next_tag_patch_overflow() {
        let tag = Tag::new(1, 0, u64::MAX);
        assert!(tag.next_patch().is_err());
    }

    #[test]
    fn test_next_tag_is_pure() {
        let history = ["v4.5.6"];
        assert_eq!(
            compute_next_tag(&history).unwrap(),
            compute_next_tag(&history).unwrap()
        );
    }
}
