//! Rolling alias tags (`<prefix>previous`, `<prefix>latest`)
//!
//! An alias is either absent or present. Moving a present alias deletes it
//! locally and at the remote before recreating it, so at most one tag with the
//! alias name exists at any time.

use tracing::{info, warn};

use crate::domain::CommitRef;
use crate::error::Result;
use crate::git::TagStore;
use crate::warning::PipelineWarning;

/// How an alias reached its new target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasTransition {
    /// The alias did not exist and was created
    Created,
    /// An existing alias was deleted and recreated
    Replaced,
}

/// Result of republishing one alias
#[derive(Debug, Clone, PartialEq)]
pub struct AliasOutcome {
    pub alias: String,
    pub target: CommitRef,
    pub transition: AliasTransition,
    pub warning: Option<PipelineWarning>,
}

/// Points `alias` at `target`, locally and on `remote`.
///
/// Presence is read from the store at call time, so republishing the same
/// target twice in a row leaves one alias on `target` and succeeds both times.
/// A failed local delete is tolerated and reported as a warning; every remote
/// failure is returned.
pub fn republish_alias<S: TagStore + ?Sized>(
    store: &S,
    remote: &str,
    alias: &str,
    target: &CommitRef,
) -> Result<AliasOutcome> {
    let mut warning = None;

    let transition = match store.find_tag(alias)? {
        None => AliasTransition::Created,
        Some(existing) => {
            if let Err(e) = store.delete_tag(alias) {
                warn!(tag = alias, error = %e, "error deleting local tag");
                warning = Some(PipelineWarning::LocalTagDeleteFailed {
                    tag: alias.to_string(),
                    reason: e.to_string(),
                });
            }
            store.delete_remote_tag(remote, alias)?;
            info!(
                tag = alias,
                from = existing.commit.short_id(),
                "removed alias tag"
            );
            AliasTransition::Replaced
        }
    };

    store.create_tag(alias, target, true)?;
    store.push_tag(remote, alias)?;
    info!(tag = alias, commit = %target.id, "added alias tag");

    Ok(AliasOutcome {
        alias: alias.to_string(),
        target: target.clone(),
        transition,
        warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{MockCall, MockOp, MockRepository};
    use chrono::{TimeZone, Utc};

    fn commit(id: &str, hour: u32) -> CommitRef {
        CommitRef::new(id, Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap())
    }

    #[test]
    fn test_absent_alias_is_created_without_deletes() {
        let repo = MockRepository::new();
        let target = commit("c1", 1);

        let outcome = republish_alias(&repo, "origin", "data-latest", &target).unwrap();

        assert_eq!(outcome.transition, AliasTransition::Created);
        assert_eq!(
            repo.calls(),
            vec![
                MockCall::CreateTag {
                    name: "data-latest".to_string(),
                    target: "c1".to_string(),
                    force: true
                },
                MockCall::PushTag {
                    remote: "origin".to_string(),
                    name: "data-latest".to_string()
                },
            ]
        );
        assert_eq!(repo.remote_tag("data-latest").unwrap().commit, target);
    }

    #[test]
    fn test_present_alias_is_deleted_then_recreated() {
        let repo = MockRepository::new();
        repo.add_tag("data-latest", commit("x", 1));
        let target = commit("y", 2);

        let outcome = republish_alias(&repo, "origin", "data-latest", &target).unwrap();

        assert_eq!(outcome.transition, AliasTransition::Replaced);
        assert_eq!(outcome.warning, None);
        let calls = repo.calls();
        assert_eq!(
            calls[0],
            MockCall::DeleteTag {
                name: "data-latest".to_string()
            }
        );
        assert_eq!(
            calls[1],
            MockCall::DeleteRemoteTag {
                remote: "origin".to_string(),
                name: "data-latest".to_string()
            }
        );
        assert_eq!(repo.remote_tag("data-latest").unwrap().commit, target);
        assert_eq!(repo.local_tag("data-latest").unwrap().commit, target);
    }

    #[test]
    fn test_republish_twice_is_idempotent() {
        let repo = MockRepository::new();
        let target = commit("c", 3);

        republish_alias(&repo, "origin", "data-latest", &target).unwrap();
        let second = republish_alias(&repo, "origin", "data-latest", &target).unwrap();

        assert_eq!(second.transition, AliasTransition::Replaced);
        let remote: Vec<_> = repo
            .remote_tags()
            .into_iter()
            .filter(|t| t.name == "data-latest")
            .collect();
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].commit, target);
    }

    #[test]
    fn test_local_delete_failure_is_tolerated() {
        let repo = MockRepository::new();
        repo.add_tag("data-previous", commit("old", 1));
        repo.fail_on(MockOp::DeleteTag);
        let target = commit("new", 2);

        let outcome = republish_alias(&repo, "origin", "data-previous", &target).unwrap();

        assert!(matches!(
            outcome.warning,
            Some(PipelineWarning::LocalTagDeleteFailed { ref tag, .. }) if tag == "data-previous"
        ));
        assert_eq!(repo.remote_tag("data-previous").unwrap().commit, target);
    }

    #[test]
    fn test_remote_delete_failure_propagates() {
        let repo = MockRepository::new();
        repo.add_tag("data-latest", commit("old", 1));
        repo.fail_on(MockOp::DeleteRemoteTag);

        let result = republish_alias(&repo, "origin", "data-latest", &commit("new", 2));

        assert!(result.is_err());
        assert!(!repo
            .calls()
            .iter()
            .any(|c| matches!(c, MockCall::CreateTag { .. })));
    }

    #[test]
    fn test_push_failure_propagates() {
        let repo = MockRepository::new();
        repo.fail_on(MockOp::PushTag);

        assert!(republish_alias(&repo, "origin", "data-latest", &commit("c", 1)).is_err());
    }
}
