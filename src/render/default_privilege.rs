//! SQL rendering for default privilege operations

use crate::catalog::id::StableId;
use crate::diff::operations::DefaultPrivilegeOperation;
use crate::render::{RenderedSql, SqlRenderer};

impl SqlRenderer for DefaultPrivilegeOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            DefaultPrivilegeOperation::Grant { privilege } => {
                vec![RenderedSql::new(
                    crate::render::sql::render_default_privilege_grant(privilege),
                )]
            }
            DefaultPrivilegeOperation::Revoke { privilege } => {
                vec![RenderedSql::new(
                    crate::render::sql::render_default_privilege_revoke(privilege),
                )]
            }
            DefaultPrivilegeOperation::RevokeGrantOption { privilege } => {
                vec![RenderedSql::new(
                    crate::render::sql::render_default_privilege_revoke_grant_option(privilege),
                )]
            }
        }
    }

    fn db_object_id(&self) -> StableId {
        match self {
            DefaultPrivilegeOperation::Grant { privilege }
            | DefaultPrivilegeOperation::Revoke { privilege }
            | DefaultPrivilegeOperation::RevokeGrantOption { privilege } => privilege.stable_id(),
        }
    }
}
