//! Fetch `ALTER DEFAULT PRIVILEGES` entries from pg_default_acl.
//!
//! Unlike `catalog::grant`, there's no `acldefault()` fallback here: a row in
//! pg_default_acl only exists once someone has actually run `ALTER DEFAULT
//! PRIVILEGES ... GRANT`, so every row fetched is an explicit, diffable
//! default and there's no synthesized baseline to filter out.
use anyhow::Result;
use sqlx::PgConnection;

use super::grant::GranteeType;
use super::id::{DependsOn, StableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DefaultPrivilegeObjectType {
    Tables,
    Sequences,
    Routines,
    Types,
    Schemas,
}

impl DefaultPrivilegeObjectType {
    fn from_defaclobjtype(c: char) -> Option<Self> {
        match c {
            'r' => Some(Self::Tables),
            'S' => Some(Self::Sequences),
            'f' => Some(Self::Routines),
            'T' => Some(Self::Types),
            'n' => Some(Self::Schemas),
            _ => None,
        }
    }

    /// The keyword used after `ON` in both `ALTER DEFAULT PRIVILEGES ...
    /// GRANT ... ON <kw>` and the `defaclobjtype` -> stable-id string used
    /// for grouping/identity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tables => "TABLES",
            Self::Sequences => "SEQUENCES",
            Self::Routines => "ROUTINES",
            Self::Types => "TYPES",
            Self::Schemas => "SCHEMAS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DefaultPrivilegeScope {
    Global,
    Schema(String),
}

impl DefaultPrivilegeScope {
    pub fn as_str(&self) -> String {
        match self {
            Self::Global => "global".to_string(),
            Self::Schema(name) => format!("schema:{name}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DefaultPrivilege {
    pub grantor: String,
    pub scope: DefaultPrivilegeScope,
    pub object_type: DefaultPrivilegeObjectType,
    pub grantee: GranteeType,
    pub privileges: Vec<String>,
    pub with_grant_option: bool,
    pub depends_on: Vec<StableId>,
}

impl DefaultPrivilege {
    /// The `(grantor, scope, object_type, grantee)` pairing key used to
    /// match a row across old/new snapshots — mirrors `Grant::subject_key`,
    /// but every field already has a plain string form so no extra key
    /// function is needed.
    pub fn subject_key(&self) -> String {
        format!(
            "{}@{}@{}@{}",
            self.grantor,
            self.scope.as_str(),
            self.object_type.as_str(),
            grantee_key(&self.grantee)
        )
    }

    pub fn stable_id(&self) -> StableId {
        StableId::DefaultPrivilege {
            grantor: self.grantor.clone(),
            scope: self.scope.as_str(),
            object_type: self.object_type.as_str().to_string(),
            grantee: grantee_key(&self.grantee),
        }
    }
}

fn grantee_key(grantee: &GranteeType) -> String {
    match grantee {
        GranteeType::Role(name) => name.clone(),
        GranteeType::Public => "public".to_string(),
    }
}

impl DependsOn for DefaultPrivilege {
    fn id(&self) -> StableId {
        self.stable_id()
    }

    fn depends_on(&self) -> &[StableId] {
        &self.depends_on
    }
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<DefaultPrivilege>> {
    let rows = sqlx::query!(
        r#"
        SELECT
            grantor_role.rolname            AS "grantor!",
            ns.nspname                      AS "schema_name?",
            d.defaclobjtype::text           AS "objtype!",
            CASE
                WHEN acl.grantee = 0 THEN 'PUBLIC'
                ELSE r.rolname
            END                              AS "grantee!",
            acl.privilege_type               AS "privilege_type!",
            CASE WHEN acl.is_grantable THEN 'YES' ELSE 'NO' END AS "is_grantable!"
        FROM pg_default_acl d
        JOIN pg_roles grantor_role ON d.defaclrole = grantor_role.oid
        LEFT JOIN pg_namespace ns ON d.defaclnamespace = ns.oid,
        LATERAL aclexplode(d.defaclacl) AS acl
        LEFT JOIN pg_roles r ON r.oid = acl.grantee
        ORDER BY
            grantor_role.rolname,
            ns.nspname,
            d.defaclobjtype,
            CASE WHEN acl.grantee = 0 THEN 'PUBLIC' ELSE r.rolname END,
            acl.privilege_type
        "#
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut result: Vec<DefaultPrivilege> = Vec::new();
    let mut current: Option<DefaultPrivilege> = None;

    for row in rows {
        let Some(object_type) = row
            .objtype
            .chars()
            .next()
            .and_then(DefaultPrivilegeObjectType::from_defaclobjtype)
        else {
            continue; // unrecognized defaclobjtype; nothing pgdiff models yet
        };

        let scope = match row.schema_name {
            Some(name) => DefaultPrivilegeScope::Schema(name),
            None => DefaultPrivilegeScope::Global,
        };

        let grantee = if row.grantee == "PUBLIC" {
            GranteeType::Public
        } else {
            GranteeType::Role(row.grantee.clone())
        };

        let with_grant_option = row.is_grantable == "YES";

        match &mut current {
            Some(entry)
                if entry.grantor == row.grantor
                    && entry.scope == scope
                    && entry.object_type == object_type
                    && entry.grantee == grantee
                    && entry.with_grant_option == with_grant_option =>
            {
                entry.privileges.push(row.privilege_type);
            }
            _ => {
                if let Some(entry) = current.take() {
                    result.push(entry);
                }

                // A default privilege depends only on the schema it's
                // scoped to (global ones have nothing to depend on) — the
                // grantor/grantee roles are assumed to exist externally.
                let depends_on = match &scope {
                    DefaultPrivilegeScope::Schema(name) => vec![StableId::Schema {
                        name: name.clone(),
                    }],
                    DefaultPrivilegeScope::Global => vec![],
                };

                current = Some(DefaultPrivilege {
                    grantor: row.grantor.clone(),
                    scope,
                    object_type,
                    grantee,
                    privileges: vec![row.privilege_type],
                    with_grant_option,
                    depends_on,
                });
            }
        }
    }

    if let Some(entry) = current {
        result.push(entry);
    }

    Ok(result)
}
