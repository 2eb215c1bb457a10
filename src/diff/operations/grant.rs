//! Grant operations

use crate::catalog::grant::Grant;

#[derive(Debug, Clone)]
pub enum GrantOperation {
    Grant { grant: Grant },
    Revoke { grant: Grant },
    /// `REVOKE GRANT OPTION FOR ... ON ... FROM ...` — downgrade from
    /// grantable to non-grantable while the base privilege is kept.
    RevokeGrantOption { grant: Grant },
}
