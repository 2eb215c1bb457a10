//! Diff default privileges (`ALTER DEFAULT PRIVILEGES`) between catalogs.
//!
//! Mirrors [`crate::diff::grants`]'s per-subject set-difference, but without
//! that module's two object-privilege-only complications: there's no
//! `acldefault()`-synthesized baseline (a `pg_default_acl` row only exists
//! once someone has actually run the `ALTER DEFAULT PRIVILEGES ... GRANT`),
//! and the grantor of a default privilege is never an object owner, so there
//! is no owner-grant special case to skip.

use crate::catalog::default_privilege::DefaultPrivilege;
use crate::diff::operations::{DefaultPrivilegeOperation, MigrationStep};
use std::collections::{BTreeMap, BTreeSet};

fn build_privilege(
    sample: &DefaultPrivilege,
    privileges: Vec<String>,
    with_grant_option: bool,
) -> DefaultPrivilege {
    DefaultPrivilege {
        grantor: sample.grantor.clone(),
        scope: sample.scope.clone(),
        object_type: sample.object_type,
        grantee: sample.grantee.clone(),
        privileges,
        with_grant_option,
        depends_on: sample.depends_on.clone(),
    }
}

/// Per-subject privilege set-difference for one (grantor, scope, object_type,
/// grantee) subject. `olds`/`news` are every row fetched for that subject on
/// each side - usually one, sometimes split by `with_grant_option`.
fn diff_subject(
    olds: &[&DefaultPrivilege],
    news: &[&DefaultPrivilege],
) -> Vec<MigrationStep> {
    let mut old_privs: BTreeMap<&str, bool> = BTreeMap::new();
    for privilege in olds {
        for name in &privilege.privileges {
            old_privs.insert(name, privilege.with_grant_option);
        }
    }
    let mut new_privs: BTreeMap<&str, bool> = BTreeMap::new();
    for privilege in news {
        for name in &privilege.privileges {
            new_privs.insert(name, privilege.with_grant_option);
        }
    }

    let all_privileges: BTreeSet<&str> = old_privs.keys().chain(new_privs.keys()).copied().collect();

    let mut grant_no_option = Vec::new();
    let mut grant_with_option = Vec::new();
    let mut revoke = Vec::new();
    let mut revoke_grant_option = Vec::new();

    for privilege in all_privileges {
        match (old_privs.get(privilege), new_privs.get(privilege)) {
            (None, Some(&grantable)) => {
                if grantable {
                    grant_with_option.push(privilege.to_string());
                } else {
                    grant_no_option.push(privilege.to_string());
                }
            }
            (Some(_), None) => {
                revoke.push(privilege.to_string());
            }
            (Some(&old_grantable), Some(&new_grantable)) if old_grantable == new_grantable => {
                // unchanged
            }
            (Some(&false), Some(&true)) => {
                grant_with_option.push(privilege.to_string());
            }
            (Some(&true), Some(&false)) => {
                revoke_grant_option.push(privilege.to_string());
            }
            (None, None) => unreachable!(),
        }
    }

    let old_sample = olds.first().copied();
    let new_sample = news.first().copied();
    let Some(sample) = new_sample.or(old_sample) else {
        return vec![];
    };

    let mut steps = Vec::new();
    if !grant_no_option.is_empty() {
        steps.push(MigrationStep::DefaultPrivilege(
            DefaultPrivilegeOperation::Grant {
                privilege: build_privilege(new_sample.unwrap_or(sample), grant_no_option, false),
            },
        ));
    }
    if !grant_with_option.is_empty() {
        steps.push(MigrationStep::DefaultPrivilege(
            DefaultPrivilegeOperation::Grant {
                privilege: build_privilege(new_sample.unwrap_or(sample), grant_with_option, true),
            },
        ));
    }
    if !revoke.is_empty() {
        steps.push(MigrationStep::DefaultPrivilege(
            DefaultPrivilegeOperation::Revoke {
                privilege: build_privilege(old_sample.unwrap_or(sample), revoke, false),
            },
        ));
    }
    if !revoke_grant_option.is_empty() {
        steps.push(MigrationStep::DefaultPrivilege(
            DefaultPrivilegeOperation::RevokeGrantOption {
                privilege: build_privilege(old_sample.unwrap_or(sample), revoke_grant_option, true),
            },
        ));
    }
    steps
}

pub fn diff_default_privileges(
    old_privileges: &[DefaultPrivilege],
    new_privileges: &[DefaultPrivilege],
) -> Vec<MigrationStep> {
    let mut old_by_subject: BTreeMap<String, Vec<&DefaultPrivilege>> = BTreeMap::new();
    for privilege in old_privileges {
        old_by_subject
            .entry(privilege.subject_key())
            .or_default()
            .push(privilege);
    }
    let mut new_by_subject: BTreeMap<String, Vec<&DefaultPrivilege>> = BTreeMap::new();
    for privilege in new_privileges {
        new_by_subject
            .entry(privilege.subject_key())
            .or_default()
            .push(privilege);
    }

    let all_subjects: BTreeSet<&String> = old_by_subject.keys().chain(new_by_subject.keys()).collect();

    all_subjects
        .into_iter()
        .flat_map(|key| {
            let empty = Vec::new();
            let olds = old_by_subject.get(key).unwrap_or(&empty);
            let news = new_by_subject.get(key).unwrap_or(&empty);
            diff_subject(olds, news)
        })
        .collect()
}
