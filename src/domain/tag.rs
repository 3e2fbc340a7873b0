use chrono::{DateTime, Utc};
use regex::Regex;

use crate::domain::version::Version;
use crate::error::{DataVersionError, Result};

/// Prefix used by the pipeline unless configured otherwise
pub const DEFAULT_TAG_PREFIX: &str = "data-";

/// A point-in-time snapshot of the versioned repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitRef {
    /// Full hex object id
    pub id: String,
    /// Commit timestamp
    pub time: DateTime<Utc>,
}

impl CommitRef {
    pub fn new(id: impl Into<String>, time: DateTime<Utc>) -> Self {
        CommitRef {
            id: id.into(),
            time,
        }
    }

    /// First seven characters of the id, for display
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(7)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }
}

/// Represents a git tag and the commit it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub commit: CommitRef,
}

impl Tag {
    pub fn new(name: impl Into<String>, commit: CommitRef) -> Self {
        Tag {
            name: name.into(),
            commit,
        }
    }
}

/// Naming scheme for version and alias tags sharing one prefix
///
/// With the default prefix `data-` this yields `data-v1.2.0`,
/// `data-previous` and `data-latest`.
#[derive(Debug, Clone)]
pub struct TagScheme {
    prefix: String,
    pattern: Regex,
}

impl TagScheme {
    /// Create a scheme for the given prefix
    pub fn new(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        let escaped = regex::escape(&prefix);
        let pattern = Regex::new(&format!(r"^{}v([0-9]+)\.([0-9]+)\.([0-9]+)$", escaped))
            .map_err(|e| DataVersionError::tag(format!("Invalid tag prefix '{}': {}", prefix, e)))?;

        Ok(TagScheme { prefix, pattern })
    }

    /// Parse a version tag name, or `None` when it does not match the scheme
    pub fn parse(&self, tag_name: &str) -> Option<Version> {
        let captures = self.pattern.captures(tag_name)?;
        let component = |i: usize| captures.get(i)?.as_str().parse::<u32>().ok();

        Some(Version::new(component(1)?, component(2)?, component(3)?))
    }

    /// Whether the tag name is a version tag under this scheme
    pub fn matches(&self, tag_name: &str) -> bool {
        self.parse(tag_name).is_some()
    }

    /// Format the version tag name for a version
    pub fn version_tag(&self, version: &Version) -> String {
        format!("{}v{}", self.prefix, version)
    }

    /// Alias that follows the release before the newest one
    pub fn previous_alias(&self) -> String {
        format!("{}previous", self.prefix)
    }

    /// Alias that follows the newest release
    pub fn latest_alias(&self) -> String {
        format!("{}latest", self.prefix)
    }
}

/// Selects the most recent version tag by commit time.
///
/// Tags that do not parse under `scheme` are ignored. Ties on commit time keep
/// input order, so the later of two equally-timed tags wins.
pub fn select_latest<'a>(tags: &'a [Tag], scheme: &TagScheme) -> Option<&'a Tag> {
    let mut candidates: Vec<&Tag> = tags.iter().filter(|t| scheme.matches(&t.name)).collect();
    candidates.sort_by_key(|t| t.commit.time);
    candidates.last().copied()
}
