use std::fmt;

use crate::domain::tag::TagScheme;
use crate::error::{DataVersionError, Result};

/// Semantic version of a dataset release
///
/// Ordering is lexicographic on `(major, minor, patch)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Version used for the very first release of a dataset
    pub const INITIAL: Version = Version {
        major: 1,
        minor: 0,
        patch: 0,
    };

    /// Create a new version
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version from a tag name of the form `<prefix>v<major>.<minor>.<patch>`.
    ///
    /// Returns `None` for any tag that does not fit that shape exactly.
    ///
    /// # Example
    /// ```
    /// use data_version::domain::Version;
    ///
    /// assert_eq!(Version::parse_tag("data-v1.2.0", "data-"), Some(Version::new(1, 2, 0)));
    /// assert_eq!(Version::parse_tag("v1.2.0", "data-"), None);
    /// ```
    pub fn parse_tag(tag: &str, prefix: &str) -> Option<Self> {
        TagScheme::new(prefix).ok()?.parse(tag)
    }

    /// Advance the minor component; major and patch are carried through.
    ///
    /// Returns `None` when the minor component is already `u32::MAX`.
    pub fn bump_minor(&self) -> Option<Self> {
        Some(Version {
            major: self.major,
            minor: self.minor.checked_add(1)?,
            patch: self.patch,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Computes the version of the next release.
///
/// Only the minor component advances; with no prior release the
/// pipeline starts at [`Version::INITIAL`].
pub fn next_version(current: Option<Version>) -> Result<Version> {
    match current {
        Some(version) => version.bump_minor().ok_or_else(|| {
            DataVersionError::tag(format!("Minor version of {} cannot be incremented", version))
        }),
        None => Ok(Version::INITIAL),
    }
}
