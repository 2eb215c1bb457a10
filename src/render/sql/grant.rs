//! Shared SQL rendering for GRANT and REVOKE statements
//!
//! This module provides consistent grant rendering across both schema generation
//! and migration operations to ensure identical SQL output.

use crate::catalog::grant::{Grant, GranteeType, ObjectType};
use crate::render::quote_ident;

/// Render a complete GRANT statement for the given grant.
///
/// This function handles all PostgreSQL grant object types:
/// - Tables and views (without object type keyword)
/// - Schemas, functions, sequences, types (with object type keyword)
/// - Role and PUBLIC grantees
/// - WITH GRANT OPTION clause
/// - Proper SQL formatting and identifier quoting
pub fn render_grant_statement(grant: &Grant) -> String {
    let privileges = grant.privileges.join(", ");
    let grantee = match &grant.grantee {
        GranteeType::Role(name) => quote_ident(name),
        GranteeType::Public => "PUBLIC".to_string(),
    };

    let object_clause = render_grant_object_clause(&grant.object);
    let grant_option = if grant.with_grant_option {
        " WITH GRANT OPTION"
    } else {
        ""
    };

    format!(
        "GRANT {} ON {} TO {}{};",
        privileges, object_clause, grantee, grant_option
    )
}

/// Render a complete REVOKE statement for the given grant.
pub fn render_revoke_statement(grant: &Grant) -> String {
    let privileges = grant.privileges.join(", ");
    let grantee = match &grant.grantee {
        GranteeType::Role(name) => quote_ident(name),
        GranteeType::Public => "PUBLIC".to_string(),
    };

    let object_clause = render_grant_object_clause(&grant.object);

    format!(
        "REVOKE {} ON {} FROM {};",
        privileges, object_clause, grantee
    )
}

/// Render `REVOKE GRANT OPTION FOR ... ON ... FROM ...` — downgrades a
/// grantable privilege to non-grantable without touching the base grant.
pub fn render_revoke_grant_option_statement(grant: &Grant) -> String {
    let privileges = grant.privileges.join(", ");
    let grantee = match &grant.grantee {
        GranteeType::Role(name) => quote_ident(name),
        GranteeType::Public => "PUBLIC".to_string(),
    };

    let object_clause = render_grant_object_clause(&grant.object);

    format!(
        "REVOKE GRANT OPTION FOR {} ON {} FROM {};",
        privileges, object_clause, grantee
    )
}

/// Render the object clause for GRANT/REVOKE statements.
///
/// PostgreSQL GRANT syntax rules:
/// - Tables and views: No object type keyword (just schema.name)
/// - Other objects: Require object type keyword (e.g., SCHEMA name, FUNCTION schema.name)
pub fn render_grant_object_clause(object: &ObjectType) -> String {
    match object {
        ObjectType::Table { schema, name } => {
            // PostgreSQL grants on tables don't require the TABLE keyword
            format!("{}.{}", quote_ident(schema), quote_ident(name))
        }
        ObjectType::View { schema, name } => {
            // PostgreSQL grants on views don't require the VIEW keyword
            format!("{}.{}", quote_ident(schema), quote_ident(name))
        }
        ObjectType::Schema { name } => {
            format!("SCHEMA {}", quote_ident(name))
        }
        ObjectType::Function {
            schema,
            name,
            arguments,
        } => {
            format!(
                "FUNCTION {}.{}({})",
                quote_ident(schema),
                quote_ident(name),
                arguments
            )
        }
        ObjectType::Procedure {
            schema,
            name,
            arguments,
        } => {
            format!(
                "PROCEDURE {}.{}({})",
                quote_ident(schema),
                quote_ident(name),
                arguments
            )
        }
        ObjectType::Aggregate {
            schema,
            name,
            arguments,
        } => {
            // PostgreSQL grants on aggregates use FUNCTION keyword, not AGGREGATE
            format!(
                "FUNCTION {}.{}({})",
                quote_ident(schema),
                quote_ident(name),
                arguments
            )
        }
        ObjectType::Sequence { schema, name } => {
            format!("SEQUENCE {}.{}", quote_ident(schema), quote_ident(name))
        }
        ObjectType::Type { schema, name } => {
            format!("TYPE {}.{}", quote_ident(schema), quote_ident(name))
        }
        ObjectType::Domain { schema, name } => {
            format!("DOMAIN {}.{}", quote_ident(schema), quote_ident(name))
        }
    }
}
