//! Default privilege operations (`ALTER DEFAULT PRIVILEGES`)

use crate::catalog::default_privilege::DefaultPrivilege;

#[derive(Debug, Clone)]
pub enum DefaultPrivilegeOperation {
    Grant { privilege: DefaultPrivilege },
    Revoke { privilege: DefaultPrivilege },
    RevokeGrantOption { privilege: DefaultPrivilege },
}
