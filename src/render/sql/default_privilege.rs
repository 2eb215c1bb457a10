//! Shared SQL rendering for `ALTER DEFAULT PRIVILEGES` statements

use crate::catalog::default_privilege::{DefaultPrivilege, DefaultPrivilegeScope};
use crate::catalog::grant::GranteeType;
use crate::render::quote_ident;

fn for_clause(privilege: &DefaultPrivilege) -> String {
    format!("FOR ROLE {}", quote_ident(&privilege.grantor))
}

fn in_schema_clause(scope: &DefaultPrivilegeScope) -> String {
    match scope {
        DefaultPrivilegeScope::Global => String::new(),
        DefaultPrivilegeScope::Schema(name) => format!(" IN SCHEMA {}", quote_ident(name)),
    }
}

fn grantee_sql(grantee: &GranteeType) -> String {
    match grantee {
        GranteeType::Role(name) => quote_ident(name),
        GranteeType::Public => "PUBLIC".to_string(),
    }
}

pub fn render_default_privilege_grant(privilege: &DefaultPrivilege) -> String {
    let privileges = privilege.privileges.join(", ");
    let grant_option = if privilege.with_grant_option {
        " WITH GRANT OPTION"
    } else {
        ""
    };

    format!(
        "ALTER DEFAULT PRIVILEGES {}{} GRANT {} ON {} TO {}{};",
        for_clause(privilege),
        in_schema_clause(&privilege.scope),
        privileges,
        privilege.object_type.as_str(),
        grantee_sql(&privilege.grantee),
        grant_option
    )
}

pub fn render_default_privilege_revoke(privilege: &DefaultPrivilege) -> String {
    let privileges = privilege.privileges.join(", ");

    format!(
        "ALTER DEFAULT PRIVILEGES {}{} REVOKE {} ON {} FROM {};",
        for_clause(privilege),
        in_schema_clause(&privilege.scope),
        privileges,
        privilege.object_type.as_str(),
        grantee_sql(&privilege.grantee)
    )
}

pub fn render_default_privilege_revoke_grant_option(privilege: &DefaultPrivilege) -> String {
    let privileges = privilege.privileges.join(", ");

    format!(
        "ALTER DEFAULT PRIVILEGES {}{} REVOKE GRANT OPTION FOR {} ON {} FROM {};",
        for_clause(privilege),
        in_schema_clause(&privilege.scope),
        privileges,
        privilege.object_type.as_str(),
        grantee_sql(&privilege.grantee)
    )
}
