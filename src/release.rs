//! Version tag computation and publication
//!
//! Combines tag selection, version incrementing and alias maintenance into the
//! tagging half of a push: create the next append-only version tag on the new
//! commit, move `<prefix>previous` to the prior release (when there is one)
//! and `<prefix>latest` to the new commit.

use tracing::{info, warn};

use crate::alias::{republish_alias, AliasOutcome};
use crate::domain::{next_version, select_latest, CommitRef, Tag, TagScheme, Version};
use crate::error::Result;
use crate::git::TagStore;
use crate::warning::PipelineWarning;

/// The next release computed from the existing tags
#[derive(Debug, Clone, PartialEq)]
pub struct ReleasePlan {
    /// Most recent version tag before this release, if any
    pub previous: Option<Tag>,
    pub version: Version,
    pub tag_name: String,
}

impl ReleasePlan {
    /// Plan the next release from a tag listing
    ///
    /// Fails when the latest version cannot be incremented.
    pub fn from_tags(tags: &[Tag], scheme: &TagScheme) -> Result<Self> {
        let previous = select_latest(tags, scheme).cloned();
        let current = previous.as_ref().and_then(|t| scheme.parse(&t.name));
        let version = next_version(current)?;

        Ok(ReleasePlan {
            previous,
            tag_name: scheme.version_tag(&version),
            version,
        })
    }

    /// Whether this is the first release of the dataset
    pub fn is_initial(&self) -> bool {
        self.previous.is_none()
    }
}

/// What [publish_release] changed
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseOutcome {
    pub plan: ReleasePlan,
    /// False when the version tag already existed and was left alone
    pub version_tag_created: bool,
    pub previous_alias: Option<AliasOutcome>,
    pub latest_alias: AliasOutcome,
    pub warnings: Vec<PipelineWarning>,
}

/// Tags `head` as the next release and moves the alias tags.
///
/// The plan is computed before any tag is created. The version tag is never
/// forced: if its name is taken it is left untouched with a warning.
pub fn publish_release<S: TagStore + ?Sized>(
    store: &S,
    remote: &str,
    scheme: &TagScheme,
    head: &CommitRef,
) -> Result<ReleaseOutcome> {
    let tags = store.list_tags()?;
    let plan = ReleasePlan::from_tags(&tags, scheme)?;
    let mut warnings = Vec::new();

    info!(
        tag = %plan.tag_name,
        previous = plan.previous.as_ref().map(|t| t.name.as_str()),
        "computed next data version"
    );

    let version_tag_created = if tags.iter().any(|t| t.name == plan.tag_name) {
        warn!(tag = %plan.tag_name, "tag already exists, skipping creation");
        warnings.push(PipelineWarning::VersionTagExists {
            tag: plan.tag_name.clone(),
        });
        false
    } else {
        store.create_tag(&plan.tag_name, head, false)?;
        store.push_tag(remote, &plan.tag_name)?;
        info!(tag = %plan.tag_name, commit = %head.id, "added new version tag");
        true
    };

    let previous_alias = match &plan.previous {
        Some(previous) => Some(republish_alias(
            store,
            remote,
            &scheme.previous_alias(),
            &previous.commit,
        )?),
        None => None,
    };

    let latest_alias = republish_alias(store, remote, &scheme.latest_alias(), head)?;

    warnings.extend(
        previous_alias
            .iter()
            .chain(std::iter::once(&latest_alias))
            .filter_map(|outcome| outcome.warning.clone()),
    );

    Ok(ReleaseOutcome {
        plan,
        version_tag_created,
        previous_alias,
        latest_alias,
        warnings,
    })
}
