use std::fmt;

/// Canonical identity for any object tracked in a catalog snapshot.
///
/// Every persistent entity gets a colon-delimited identity string (see
/// `Display`); equal StableIds denote the same object across extractions of
/// an unchanged database, and are the sole currency of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StableId {
    Schema {
        name: String,
    },
    Role {
        name: String,
    },
    RoleMembership {
        role: String,
        member: String,
    },
    Table {
        schema: String,
        name: String,
    },
    Column {
        schema: String,
        table: String,
        column: String,
    },
    View {
        schema: String,
        name: String,
    },
    MaterializedView {
        schema: String,
        name: String,
    },
    Type {
        schema: String,
        name: String,
    },
    Domain {
        schema: String,
        name: String,
    },
    Function {
        schema: String,
        name: String,
        arguments: String,
    },
    Procedure {
        schema: String,
        name: String,
        arguments: String,
    },
    Aggregate {
        schema: String,
        name: String,
        arguments: String,
    },
    Sequence {
        schema: String,
        name: String,
    },
    Index {
        schema: String,
        name: String,
    },
    Constraint {
        schema: String,
        table: String,
        name: String,
    },
    Trigger {
        schema: String,
        table: String,
        name: String,
    },
    Policy {
        schema: String,
        table: String,
        name: String,
    },
    Extension {
        name: String,
    },
    /// Cluster-scoped procedural language. No fetch/diff is implemented in
    /// this revision (see SPEC_FULL.md §3+ deferred kinds); the variant is
    /// reserved so the resolver's object model stays exhaustive if/when it
    /// is added.
    Language {
        name: String,
    },
    /// Reserved for the same reason as `Language`.
    EventTrigger {
        name: String,
    },
    Grant {
        id: String,
    },
    DefaultPrivilege {
        grantor: String,
        scope: String,
        object_type: String,
        grantee: String,
    },
    Comment {
        object_id: Box<StableId>,
    },
    /// An object referenced by a catalog `depends` edge that the extractor
    /// could not resolve to a known kind. Per spec §4.3/§7, edges touching
    /// `Unknown` are filtered out of the dependency model rather than
    /// erroring.
    Unknown {
        raw: String,
    },
}

impl StableId {
    /// Schema this object lives in, if it has one.
    pub fn schema(&self) -> Option<&str> {
        match self {
            StableId::Schema { name } => Some(name.as_str()),
            StableId::Table { schema, .. }
            | StableId::Column { schema, .. }
            | StableId::View { schema, .. }
            | StableId::MaterializedView { schema, .. }
            | StableId::Type { schema, .. }
            | StableId::Domain { schema, .. }
            | StableId::Function { schema, .. }
            | StableId::Procedure { schema, .. }
            | StableId::Aggregate { schema, .. }
            | StableId::Sequence { schema, .. }
            | StableId::Index { schema, .. }
            | StableId::Constraint { schema, .. }
            | StableId::Trigger { schema, .. }
            | StableId::Policy { schema, .. } => Some(schema.as_str()),
            StableId::Role { .. }
            | StableId::RoleMembership { .. }
            | StableId::Grant { .. }
            | StableId::DefaultPrivilege { .. }
            | StableId::Extension { .. }
            | StableId::Language { .. }
            | StableId::EventTrigger { .. }
            | StableId::Unknown { .. } => None,
            StableId::Comment { object_id } => object_id.schema(),
        }
    }

    /// True for cluster-level kinds that the file grouper routes to
    /// `cluster/...` instead of `schemas/<schema>/...` (spec §4.4).
    pub fn is_cluster_level(&self) -> bool {
        matches!(
            self,
            StableId::Role { .. }
                | StableId::RoleMembership { .. }
                | StableId::Extension { .. }
                | StableId::Language { .. }
                | StableId::EventTrigger { .. }
        )
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StableId::Schema { name } => write!(f, "schema:{name}"),
            StableId::Role { name } => write!(f, "role:{name}"),
            StableId::RoleMembership { role, member } => {
                write!(f, "rolemembership:{role}:{member}")
            }
            StableId::Table { schema, name } => write!(f, "table:{schema}.{name}"),
            StableId::Column {
                schema,
                table,
                column,
            } => write!(f, "column:{schema}.{table}.{column}"),
            StableId::View { schema, name } => write!(f, "view:{schema}.{name}"),
            StableId::MaterializedView { schema, name } => {
                write!(f, "materializedview:{schema}.{name}")
            }
            StableId::Type { schema, name } => write!(f, "type:{schema}.{name}"),
            StableId::Domain { schema, name } => write!(f, "domain:{schema}.{name}"),
            StableId::Function {
                schema,
                name,
                arguments,
            } => write!(f, "function:{schema}.{name}({arguments})"),
            StableId::Procedure {
                schema,
                name,
                arguments,
            } => write!(f, "procedure:{schema}.{name}({arguments})"),
            StableId::Aggregate {
                schema,
                name,
                arguments,
            } => write!(f, "aggregate:{schema}.{name}({arguments})"),
            StableId::Sequence { schema, name } => write!(f, "sequence:{schema}.{name}"),
            StableId::Index { schema, name } => write!(f, "index:{schema}.{name}"),
            StableId::Constraint {
                schema,
                table,
                name,
            } => write!(f, "constraint:{schema}.{table}.{name}"),
            StableId::Trigger {
                schema,
                table,
                name,
            } => write!(f, "trigger:{schema}.{table}.{name}"),
            StableId::Policy {
                schema,
                table,
                name,
            } => write!(f, "policy:{schema}.{table}.{name}"),
            StableId::Extension { name } => write!(f, "extension:{name}"),
            StableId::Language { name } => write!(f, "language:{name}"),
            StableId::EventTrigger { name } => write!(f, "eventtrigger:{name}"),
            StableId::Grant { id } => write!(f, "acl:{id}"),
            StableId::DefaultPrivilege {
                grantor,
                scope,
                object_type,
                grantee,
            } => write!(f, "defacl:{grantor}:{object_type}:{scope}:grantee:{grantee}"),
            StableId::Comment { object_id } => write!(f, "comment:{object_id}"),
            StableId::Unknown { raw } => write!(f, "unknown:{raw}"),
        }
    }
}

pub trait DependsOn {
    fn id(&self) -> StableId;
    fn depends_on(&self) -> &[StableId];
}
