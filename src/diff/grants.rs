//! Diff grants between catalogs.
//!
//! Privileges are compared per-subject (`grantee`, `object`), not per fetched
//! `Grant` row: `fetch_*_privileges` buckets rows by `with_grant_option`, so a
//! single grantee/object pair can legitimately arrive as two or more `Grant`
//! structs (e.g. SELECT granted plain, UPDATE granted WITH GRANT OPTION).
//! Pairing by `Grant::id()` would silently drop one side of that split; §4.1.2's
//! `(privilege, grantable)` keyed set-difference is computed here instead, one
//! privilege name at a time, then the results are batched back into up to four
//! `MigrationStep::Grant` operations per subject.

use crate::catalog::grant::{Grant, GranteeType};
use crate::diff::operations::{GrantOperation, MigrationStep};
use std::collections::{BTreeMap, BTreeSet};

/// Owner grants are implicit in PostgreSQL (the owner always has every
/// privilege) and never need an explicit GRANT/REVOKE.
fn is_owner_grant(grantee: &GranteeType, object_owner: &str) -> bool {
    match grantee {
        GranteeType::Role(role_name) => role_name == object_owner,
        GranteeType::Public => false,
    }
}

fn build_grant(sample: &Grant, privileges: Vec<String>, with_grant_option: bool, is_default_acl: bool) -> Grant {
    Grant {
        grantee: sample.grantee.clone(),
        object: sample.object.clone(),
        privileges,
        with_grant_option,
        depends_on: sample.depends_on.clone(),
        object_owner: sample.object_owner.clone(),
        is_default_acl,
    }
}

/// Per-subject privilege set-difference implementing the §4.1.2 upgrade/
/// downgrade law. `olds`/`news` are every `Grant` row fetched for the same
/// (grantee, object) subject on each side — usually one, sometimes split by
/// `with_grant_option`.
fn diff_subject(olds: &[&Grant], news: &[&Grant]) -> Vec<MigrationStep> {
    let Some(sample) = news.first().or_else(|| olds.first()) else {
        return vec![];
    };
    if is_owner_grant(&sample.grantee, &sample.object_owner) {
        return vec![];
    }

    // privilege name -> (grantable, is_default_acl)
    let mut old_privs: BTreeMap<&str, (bool, bool)> = BTreeMap::new();
    for grant in olds {
        for privilege in &grant.privileges {
            old_privs.insert(privilege, (grant.with_grant_option, grant.is_default_acl));
        }
    }
    let mut new_privs: BTreeMap<&str, (bool, bool)> = BTreeMap::new();
    for grant in news {
        for privilege in &grant.privileges {
            new_privs.insert(privilege, (grant.with_grant_option, grant.is_default_acl));
        }
    }

    let all_privileges: BTreeSet<&str> = old_privs.keys().chain(new_privs.keys()).copied().collect();

    let mut grant_no_option = Vec::new();
    let mut grant_with_option = Vec::new();
    let mut revoke = Vec::new();
    let mut revoke_is_default = true;
    let mut revoke_grant_option = Vec::new();

    for privilege in all_privileges {
        match (old_privs.get(privilege), new_privs.get(privilege)) {
            (None, Some(&(grantable, _))) => {
                if grantable {
                    grant_with_option.push(privilege.to_string());
                } else {
                    grant_no_option.push(privilege.to_string());
                }
            }
            (Some(&(_, is_default)), None) => {
                revoke_is_default &= is_default;
                revoke.push(privilege.to_string());
            }
            (Some(&(old_grantable, _)), Some(&(new_grantable, _))) if old_grantable == new_grantable => {
                // unchanged
            }
            (Some(&(false, _)), Some(&(true, _))) => {
                // upgrade: a single GRANT ... WITH GRANT OPTION covers it,
                // suppressing the base revoke entirely.
                grant_with_option.push(privilege.to_string());
            }
            (Some(&(true, _)), Some(&(false, _))) => {
                // downgrade: the base privilege is retained, only the
                // grant option is withdrawn.
                revoke_grant_option.push(privilege.to_string());
            }
            (None, None) => unreachable!(),
        }
    }

    let new_default = news.first().map(|g| g.is_default_acl).unwrap_or(false);
    let old_sample = olds.first().copied().unwrap_or(sample);
    let new_sample = news.first().copied().unwrap_or(sample);

    let mut steps = Vec::new();
    if !grant_no_option.is_empty() {
        steps.push(MigrationStep::Grant(GrantOperation::Grant {
            grant: build_grant(new_sample, grant_no_option, false, new_default),
        }));
    }
    if !grant_with_option.is_empty() {
        steps.push(MigrationStep::Grant(GrantOperation::Grant {
            grant: build_grant(new_sample, grant_with_option, true, new_default),
        }));
    }
    if !revoke.is_empty() {
        steps.push(MigrationStep::Grant(GrantOperation::Revoke {
            grant: build_grant(old_sample, revoke, false, revoke_is_default),
        }));
    }
    if !revoke_grant_option.is_empty() {
        steps.push(MigrationStep::Grant(GrantOperation::RevokeGrantOption {
            grant: build_grant(old_sample, revoke_grant_option, true, new_default),
        }));
    }
    steps
}

/// Diff every grant subject present in either catalog. Grants whose default
/// ACL disappeared between snapshots surface here too: `fetch_*_privileges`
/// synthesizes default rows via `COALESCE(acl, acldefault(...))`, so a
/// revoked default is just an absent subject on the new side, handled by the
/// same union as an explicit revoke — no separate default-ACL pass needed.
pub fn diff_grants(old_grants: &[Grant], new_grants: &[Grant]) -> Vec<MigrationStep> {
    let mut old_by_subject: BTreeMap<String, Vec<&Grant>> = BTreeMap::new();
    for grant in old_grants {
        old_by_subject.entry(grant.subject_key()).or_default().push(grant);
    }
    let mut new_by_subject: BTreeMap<String, Vec<&Grant>> = BTreeMap::new();
    for grant in new_grants {
        new_by_subject.entry(grant.subject_key()).or_default().push(grant);
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
