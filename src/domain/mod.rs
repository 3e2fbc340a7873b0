//! Domain logic - pure tag-versioning rules independent of git operations

pub mod tag;
pub mod version;

pub use tag::{select_latest, CommitRef, Tag, TagScheme, DEFAULT_TAG_PREFIX};
pub use version::{next_version, Version};
