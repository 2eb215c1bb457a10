//! Assigns each ordered migration step to an output file and groups the
//! steps per file via a catalog-driven classifier plus a standalone
//! grouping pass.

use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::catalog::id::StableId;
use crate::diff::operations::{
    AggregateOperation, ConstraintOperation, DefaultPrivilegeOperation, DomainOperation,
    FunctionOperation, GrantOperation, IndexOperation, MaterializedViewOperation, MigrationStep,
    PolicyOperation, SequenceOperation, TableOperation, TriggerOperation, TypeOperation,
    ViewOperation,
};

/// Export layout: Detailed keeps a per-kind directory split; Simple
/// co-locates every table-ish and routine-ish object into one file each,
/// for small schemas where dozens of one-line files are noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    Detailed,
    Simple,
}

/// Tie-breaker for groups that land on the same effective topological
/// index (see `FileGroup::sort_key`). Order here is meaningless on its
/// own — it only disambiguates equal indices deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileCategory {
    Schema,
    Extension,
    Type,
    Domain,
    Sequence,
    Table,
    ForeignKey,
    Index,
    Policy,
    View,
    MaterializedView,
    Function,
    Aggregate,
    Grant,
    DefaultPrivilege,
}

#[derive(Debug, Clone)]
pub struct FileGroup {
    pub path: String,
    pub category: FileCategory,
    pub schema_name: Option<String>,
    pub object_name: Option<String>,
    pub changes: Vec<MigrationStep>,
    pub min_index: usize,
    pub max_index: usize,
    pub create_object_max_index: usize,
}

impl FileGroup {
    /// The index `groupChangesByFile`'s final ordering sorts on before
    /// falling back to category then path, per spec §4.4 point 1: object-
    /// creating categories (tables, functions/procedures, aggregates) sort
    /// by the latest CREATE they contain, so a table's file lands right
    /// after the last column or constraint that had to exist for it to be
    /// created. Terminal categories that only ever reference other objects
    /// (foreign keys, policies, indexes) sort by the latest change of any
    /// kind, since they have no "creation" of their own to wait on.
    /// Everything else (schemas, extensions, types, domains, sequences,
    /// views, grants) sorts by its earliest change — these are
    /// prerequisites other files depend on, not things to place late.
    fn effective_index(&self) -> usize {
        match self.category {
            FileCategory::Table | FileCategory::Function | FileCategory::Aggregate => {
                self.create_object_max_index
            }
            FileCategory::ForeignKey | FileCategory::Policy | FileCategory::Index => {
                self.max_index
            }
            _ => self.min_index,
        }
    }
}

struct Classified {
    category: FileCategory,
    path_suffix: String,
    schema: Option<String>,
    name: Option<String>,
}

fn schema_prefix(schema: &str, flat: bool) -> String {
    if flat {
        String::new()
    } else {
        format!("{}/", schema)
    }
}

fn find_index_table<'a>(catalog: &'a Catalog, schema: &str, name: &str) -> Option<&'a str> {
    catalog
        .indexes
        .iter()
        .find(|idx| idx.schema == schema && idx.name == name)
        .map(|idx| idx.table_name.as_str())
}

fn find_owning_table_for_sequence(catalog: &Catalog, schema: &str, name: &str) -> Option<String> {
    catalog
        .sequences
        .iter()
        .find(|s| s.schema == schema && s.name == name)
        .and_then(|s| s.owned_by.as_ref())
        .and_then(|owned_by| {
            let parts: Vec<&str> = owned_by.split('.').collect();
            if parts.len() >= 2 {
                Some(parts[1].to_string())
            } else {
                None
            }
        })
}

fn classify_table_like(schema: String, name: String) -> Classified {
    Classified {
        category: FileCategory::Table,
        path_suffix: format!("tables/{}.sql", name),
        schema: Some(schema),
        name: Some(name),
    }
}

/// Indexes get their own terminal category and per-table file (per spec
/// §4.4's category priority list and `maxIndex` ordering rule), distinct
/// from `foreign_keys/<table>.sql` and the table's own file.
fn classify_index_like(schema: String, table_name: String) -> Classified {
    Classified {
        category: FileCategory::Index,
        path_suffix: format!("indexes/{}.sql", table_name),
        schema: Some(schema),
        name: Some(table_name),
    }
}

fn classify_sequence(catalog: &Catalog, schema: String, name: String) -> Classified {
    if let Some(table_name) = find_owning_table_for_sequence(catalog, &schema, &name) {
        classify_table_like(schema, table_name)
    } else {
        Classified {
            category: FileCategory::Sequence,
            path_suffix: format!("sequences/{}.sql", name),
            schema: Some(schema),
            name: Some(name),
        }
    }
}

fn classify_grant(catalog: &Catalog, op: &GrantOperation) -> Classified {
    use crate::catalog::grant::ObjectType;

    let grant = match op {
        GrantOperation::Grant { grant } => grant,
        GrantOperation::Revoke { grant } => grant,
        GrantOperation::RevokeGrantOption { grant } => grant,
    };

    match &grant.object {
        ObjectType::Table { schema, name } => classify_table_like(schema.clone(), name.clone()),
        ObjectType::View { schema, name } => Classified {
            category: FileCategory::View,
            path_suffix: format!("views/{}.sql", name),
            schema: Some(schema.clone()),
            name: Some(name.clone()),
        },
        ObjectType::Function { schema, name, .. } => Classified {
            category: FileCategory::Function,
            path_suffix: format!("functions/{}.sql", name),
            schema: Some(schema.clone()),
            name: Some(name.clone()),
        },
        ObjectType::Procedure { schema, name, .. } => Classified {
            category: FileCategory::Function,
            path_suffix: format!("functions/{}.sql", name),
            schema: Some(schema.clone()),
            name: Some(name.clone()),
        },
        ObjectType::Aggregate { schema, name, .. } => Classified {
            category: FileCategory::Aggregate,
            path_suffix: format!("aggregates/{}.sql", name),
            schema: Some(schema.clone()),
            name: Some(name.clone()),
        },
        ObjectType::Schema { .. } => Classified {
            category: FileCategory::Schema,
            path_suffix: "schemas.sql".to_string(),
            schema: None,
            name: None,
        },
        ObjectType::Type { schema, .. } => Classified {
            category: FileCategory::Type,
            path_suffix: format!("{}types.sql", schema_prefix(schema, false)),
            schema: Some(schema.clone()),
            name: None,
        },
        ObjectType::Domain { schema, .. } => Classified {
            category: FileCategory::Domain,
            path_suffix: format!("{}domains.sql", schema_prefix(schema, false)),
            schema: Some(schema.clone()),
            name: None,
        },
        ObjectType::Sequence { schema, name } => {
            classify_sequence(catalog, schema.clone(), name.clone())
        }
    }
}

fn classify_default_privilege(op: &DefaultPrivilegeOperation) -> Classified {
    use crate::catalog::default_privilege::DefaultPrivilegeScope;

    let privilege = match op {
        DefaultPrivilegeOperation::Grant { privilege }
        | DefaultPrivilegeOperation::Revoke { privilege }
        | DefaultPrivilegeOperation::RevokeGrantOption { privilege } => privilege,
    };

    match &privilege.scope {
        DefaultPrivilegeScope::Schema(schema) => Classified {
            category: FileCategory::DefaultPrivilege,
            path_suffix: "default_privileges.sql".to_string(),
            schema: Some(schema.clone()),
            name: None,
        },
        DefaultPrivilegeScope::Global => Classified {
            category: FileCategory::DefaultPrivilege,
            path_suffix: "default_privileges.sql".to_string(),
            schema: None,
            name: None,
        },
    }
}

/// Classifies a single step into the file it belongs in, independent of
/// schema-prefixing and Simple/Detailed merging (applied afterward in
/// `group_changes_by_file`).
fn classify_step(catalog: &Catalog, step: &MigrationStep) -> Classified {
    match step {
        MigrationStep::Schema(_) => Classified {
            category: FileCategory::Schema,
            path_suffix: "schemas.sql".to_string(),
            schema: None,
            name: None,
        },
        MigrationStep::Extension(_) => Classified {
            category: FileCategory::Extension,
            path_suffix: "extensions.sql".to_string(),
            schema: None,
            name: None,
        },
        MigrationStep::Type(op) => {
            let (schema, name) = match op {
                TypeOperation::Create { schema, name, .. }
                | TypeOperation::Drop { schema, name }
                | TypeOperation::Alter { schema, name, .. } => (schema.clone(), name.clone()),
                TypeOperation::Comment(c) => match c {
                    crate::diff::operations::CommentOperation::Set { target, .. } => {
                        (target.schema.clone(), target.name.clone())
                    }
                    crate::diff::operations::CommentOperation::Drop { target } => {
                        (target.schema.clone(), target.name.clone())
                    }
                },
            };
            Classified {
                category: FileCategory::Type,
                path_suffix: format!("types/{}.sql", name),
                schema: Some(schema),
                name: Some(name),
            }
        }
        MigrationStep::Domain(op) => {
            let (schema, name) = match op {
                DomainOperation::Create { schema, name, .. }
                | DomainOperation::Drop { schema, name }
                | DomainOperation::AlterSetNotNull { schema, name }
                | DomainOperation::AlterDropNotNull { schema, name }
                | DomainOperation::AlterSetDefault { schema, name, .. }
                | DomainOperation::AlterDropDefault { schema, name }
                | DomainOperation::AddConstraint { schema, name, .. }
                | DomainOperation::DropConstraint { schema, name, .. } => {
                    (schema.clone(), name.clone())
                }
                DomainOperation::Comment(c) => match c {
                    crate::diff::operations::CommentOperation::Set { target, .. } => {
                        (target.schema.clone(), target.name.clone())
                    }
                    crate::diff::operations::CommentOperation::Drop { target } => {
                        (target.schema.clone(), target.name.clone())
                    }
                },
            };
            Classified {
                category: FileCategory::Domain,
                path_suffix: format!("domains/{}.sql", name),
                schema: Some(schema),
                name: Some(name),
            }
        }
        MigrationStep::Sequence(op) => {
            let (schema, name) = match op {
                SequenceOperation::Create { schema, name, .. }
                | SequenceOperation::Drop { schema, name }
                | SequenceOperation::AlterOwnership { schema, name, .. }
                | SequenceOperation::AlterProperties { schema, name, .. } => {
                    (schema.clone(), name.clone())
                }
                SequenceOperation::Comment(c) => match c {
                    crate::diff::operations::CommentOperation::Set { target, .. } => {
                        (target.schema.clone(), target.name.clone())
                    }
                    crate::diff::operations::CommentOperation::Drop { target } => {
                        (target.schema.clone(), target.name.clone())
                    }
                },
            };
            classify_sequence(catalog, schema, name)
        }
        MigrationStep::Table(op) => {
            let (schema, name) = match op {
                TableOperation::Create { schema, name, .. }
                | TableOperation::Drop { schema, name }
                | TableOperation::Alter { schema, name, .. } => (schema.clone(), name.clone()),
                TableOperation::Comment(c) => match c {
                    crate::diff::operations::CommentOperation::Set { target, .. } => {
                        (target.schema.clone(), target.table.clone())
                    }
                    crate::diff::operations::CommentOperation::Drop { target } => {
                        (target.schema.clone(), target.table.clone())
                    }
                },
            };
            classify_table_like(schema, name)
        }
        MigrationStep::View(op) => {
            let (schema, name) = match op {
                ViewOperation::Create { schema, name, .. }
                | ViewOperation::Drop { schema, name }
                | ViewOperation::Replace { schema, name, .. }
                | ViewOperation::SetOption { schema, name, .. } => (schema.clone(), name.clone()),
                ViewOperation::Comment(c) => match c {
                    crate::diff::operations::CommentOperation::Set { target, .. } => {
                        (target.schema.clone(), target.name.clone())
                    }
                    crate::diff::operations::CommentOperation::Drop { target } => {
                        (target.schema.clone(), target.name.clone())
                    }
                },
            };
            Classified {
                category: FileCategory::View,
                path_suffix: format!("views/{}.sql", name),
                schema: Some(schema),
                name: Some(name),
            }
        }
        MigrationStep::MaterializedView(op) => {
            let (schema, name) = match op {
                MaterializedViewOperation::Create { schema, name, .. }
                | MaterializedViewOperation::Drop { schema, name } => {
                    (schema.clone(), name.clone())
                }
                MaterializedViewOperation::Comment(c) => match c {
                    crate::diff::operations::CommentOperation::Set { target, .. } => {
                        (target.schema.clone(), target.name.clone())
                    }
                    crate::diff::operations::CommentOperation::Drop { target } => {
                        (target.schema.clone(), target.name.clone())
                    }
                },
            };
            Classified {
                category: FileCategory::MaterializedView,
                path_suffix: format!("materialized_views/{}.sql", name),
                schema: Some(schema),
                name: Some(name),
            }
        }
        MigrationStep::Function(op) => {
            let (schema, name) = match op {
                FunctionOperation::Create { schema, name, .. }
                | FunctionOperation::Drop { schema, name, .. }
                | FunctionOperation::Replace { schema, name, .. } => {
                    (schema.clone(), name.clone())
                }
                FunctionOperation::Comment(c) => match c {
                    crate::diff::operations::CommentOperation::Set { target, .. } => {
                        (target.schema.clone(), target.name.clone())
                    }
                    crate::diff::operations::CommentOperation::Drop { target } => {
                        (target.schema.clone(), target.name.clone())
                    }
                },
            };
            Classified {
                category: FileCategory::Function,
                path_suffix: format!("functions/{}.sql", name),
                schema: Some(schema),
                name: Some(name),
            }
        }
        MigrationStep::Aggregate(op) => {
            let (schema, name) = match op {
                AggregateOperation::Create { aggregate, .. } => {
                    (aggregate.schema.clone(), aggregate.name.clone())
                }
                AggregateOperation::Drop { identifier, .. } => {
                    (identifier.schema.clone(), identifier.name.clone())
                }
                AggregateOperation::Replace { new_aggregate, .. } => {
                    (new_aggregate.schema.clone(), new_aggregate.name.clone())
                }
                AggregateOperation::Comment(c) => match c {
                    crate::diff::operations::CommentOperation::Set { target, .. } => {
                        (target.schema.clone(), target.name.clone())
                    }
                    crate::diff::operations::CommentOperation::Drop { target } => {
                        (target.schema.clone(), target.name.clone())
                    }
                },
            };
            Classified {
                category: FileCategory::Aggregate,
                path_suffix: format!("aggregates/{}.sql", name),
                schema: Some(schema),
                name: Some(name),
            }
        }
        MigrationStep::Index(op) => {
            let (schema, table_name) = match op {
                IndexOperation::Create(index) => {
                    (index.table_schema.clone(), index.table_name.clone())
                }
                IndexOperation::Drop { schema, name } => find_index_table(catalog, schema, name)
                    .map(|t| (schema.clone(), t.to_string()))
                    .unwrap_or((schema.clone(), "unknown".to_string())),
                IndexOperation::Comment(c) => {
                    let target = match c {
                        crate::diff::operations::CommentOperation::Set { target, .. } => target,
                        crate::diff::operations::CommentOperation::Drop { target } => target,
                    };
                    find_index_table(catalog, &target.schema, &target.name)
                        .map(|t| (target.schema.clone(), t.to_string()))
                        .unwrap_or((target.schema.clone(), "unknown".to_string()))
                }
                IndexOperation::Cluster {
                    table_schema,
                    table_name,
                    ..
                } => (table_schema.clone(), table_name.clone()),
                IndexOperation::SetWithoutCluster { schema, name, .. } => {
                    find_index_table(catalog, schema, name)
                        .map(|t| (schema.clone(), t.to_string()))
                        .unwrap_or((schema.clone(), name.clone()))
                }
                IndexOperation::Reindex { schema, name, .. } => {
                    find_index_table(catalog, schema, name)
                        .map(|t| (schema.clone(), t.to_string()))
                        .unwrap_or((schema.clone(), "unknown".to_string()))
                }
            };
            classify_index_like(schema, table_name)
        }
        MigrationStep::Constraint(op) => {
            let (schema, table_name, is_foreign_key) = match op {
                ConstraintOperation::Create(constraint) => (
                    constraint.schema.clone(),
                    constraint.table.clone(),
                    matches!(
                        constraint.constraint_type,
                        crate::catalog::constraint::ConstraintType::ForeignKey { .. }
                    ),
                ),
                ConstraintOperation::Drop(identifier) => {
                    let is_fk = catalog
                        .constraints
                        .iter()
                        .find(|c| c.schema == identifier.schema && c.name == identifier.name)
                        .is_some_and(|c| {
                            matches!(
                                c.constraint_type,
                                crate::catalog::constraint::ConstraintType::ForeignKey { .. }
                            )
                        });
                    (identifier.schema.clone(), identifier.table.clone(), is_fk)
                }
                ConstraintOperation::Comment(c) => {
                    let target = match c {
                        crate::diff::operations::CommentOperation::Set { target, .. } => target,
                        crate::diff::operations::CommentOperation::Drop { target } => target,
                    };
                    let is_fk = catalog
                        .constraints
                        .iter()
                        .find(|c| c.schema == target.schema && c.name == target.name)
                        .is_some_and(|c| {
                            matches!(
                                c.constraint_type,
                                crate::catalog::constraint::ConstraintType::ForeignKey { .. }
                            )
                        });
                    (target.schema.clone(), target.table.clone(), is_fk)
                }
            };

            if is_foreign_key {
                Classified {
                    category: FileCategory::ForeignKey,
                    path_suffix: format!("foreign_keys/{}.sql", table_name),
                    schema: Some(schema),
                    name: Some(table_name),
                }
            } else {
                classify_table_like(schema, table_name)
            }
        }
        MigrationStep::Trigger(op) => {
            let (schema, table_name) = match op {
                TriggerOperation::Create { trigger } => {
                    (trigger.schema.clone(), trigger.table_name.clone())
                }
                TriggerOperation::Drop { identifier } => {
                    (identifier.schema.clone(), identifier.table.clone())
                }
                TriggerOperation::Replace { new_trigger, .. } => {
                    (new_trigger.schema.clone(), new_trigger.table_name.clone())
                }
                TriggerOperation::Comment(c) => {
                    let target = match c {
                        crate::diff::operations::CommentOperation::Set { target, .. } => target,
                        crate::diff::operations::CommentOperation::Drop { target } => target,
                    };
                    (target.schema.clone(), target.table.clone())
                }
            };
            Classified {
                category: FileCategory::Policy,
                path_suffix: format!("policies/{}.sql", table_name),
                schema: Some(schema),
                name: Some(table_name),
            }
        }
        MigrationStep::Policy(op) => {
            let (schema, table_name) = match op {
                PolicyOperation::Create { policy } => {
                    (policy.schema.clone(), policy.table_name.clone())
                }
                PolicyOperation::Drop { identifier } => {
                    (identifier.schema.clone(), identifier.table.clone())
                }
                PolicyOperation::Alter { identifier, .. } => {
                    (identifier.schema.clone(), identifier.table.clone())
                }
                PolicyOperation::Replace { new_policy, .. } => {
                    (new_policy.schema.clone(), new_policy.table_name.clone())
                }
                PolicyOperation::Comment(c) => {
                    let target = match c {
                        crate::diff::operations::CommentOperation::Set { target, .. } => target,
                        crate::diff::operations::CommentOperation::Drop { target } => target,
                    };
                    (target.schema.clone(), target.table.clone())
                }
            };
            Classified {
                category: FileCategory::Policy,
                path_suffix: format!("policies/{}.sql", table_name),
                schema: Some(schema),
                name: Some(table_name),
            }
        }
        MigrationStep::Grant(op) => classify_grant(catalog, op),
        MigrationStep::DefaultPrivilege(op) => classify_default_privilege(op),
    }
}

/// Merges a Detailed-mode classification with Simple mode's coarser
/// grouping: every table-or-routine-ish category collapses into one file.
fn apply_mode(mut classified: Classified, mode: ExportMode) -> Classified {
    if mode == ExportMode::Simple {
        match classified.category {
            FileCategory::Table
            | FileCategory::View
            | FileCategory::MaterializedView
            | FileCategory::Function
            | FileCategory::Aggregate
            | FileCategory::ForeignKey
            | FileCategory::Policy => {
                classified.path_suffix = "tables_and_functions.sql".to_string();
            }
            _ => {}
        }
    }
    classified
}

/// `groupChangesByFile`: assigns every step to a file, merges steps that
/// land on the same path, and orders the resulting groups by effective
/// topological index (object-defining categories use the latest CREATE
/// they contain; everything else uses the latest change of any kind),
/// falling back to category then path for ties.
///
/// `steps` must already be dependency-ordered (as produced by
/// `diff::diff_order`) — the index within `steps` is what ordering is
/// computed from.
pub fn group_changes_by_file(
    steps: &[MigrationStep],
    catalog: &Catalog,
    mode: ExportMode,
    flat_schemas: bool,
) -> Vec<FileGroup> {
    struct Building {
        category: FileCategory,
        schema_name: Option<String>,
        object_name: Option<String>,
        indices: Vec<usize>,
    }

    let mut by_path: BTreeMap<String, Building> = BTreeMap::new();

    for (i, step) in steps.iter().enumerate() {
        let classified = apply_mode(classify_step(catalog, step), mode);
        let prefix = classified
            .schema
            .as_deref()
            .map(|s| schema_prefix(s, flat_schemas))
            .unwrap_or_default();
        let path = format!("{}{}", prefix, classified.path_suffix);

        let entry = by_path.entry(path).or_insert_with(|| Building {
            category: classified.category,
            schema_name: classified.schema.clone(),
            object_name: classified.name.clone(),
            indices: Vec::new(),
        });
        entry.indices.push(i);
    }

    let mut groups: Vec<FileGroup> = by_path
        .into_iter()
        .map(|(path, building)| {
            let min_index = *building.indices.iter().min().unwrap();
            let max_index = *building.indices.iter().max().unwrap();
            let create_object_max_index = building
                .indices
                .iter()
                .filter(|&&i| steps[i].is_create())
                .max()
                .copied()
                .unwrap_or(max_index);
            let changes = building.indices.iter().map(|&i| steps[i].clone()).collect();

            FileGroup {
                path,
                category: building.category,
                schema_name: building.schema_name,
                object_name: building.object_name,
                changes,
                min_index,
                max_index,
                create_object_max_index,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        a.effective_index()
            .cmp(&b.effective_index())
            .then(a.category.cmp(&b.category))
            .then(a.path.cmp(&b.path))
    });

    groups
}

/// Keeps only CREATE-phase steps. `Grant`/`DefaultPrivilege` REVOKEs are
/// never flagged destructive (see `SqlRenderer::is_destructive`'s default),
/// so they already survive this filter unconditionally — including REVOKEs
/// of privileges that were never explicitly granted (`is_default_acl`) and
/// `ALTER DEFAULT PRIVILEGES ... REVOKE`, both of which define desired state
/// against PostgreSQL's implicit defaults rather than undo a prior CREATE.
pub fn filter_declarative_drops(steps: Vec<MigrationStep>) -> Vec<MigrationStep> {
    steps.into_iter().filter(|step| !step.is_drop()).collect()
}

/// `SET check_function_bodies = false` guards routine files whose body
/// references objects (tables, other routines) that may not exist yet at
/// CREATE time within the same transaction — relevant for any file
/// containing a function, procedure, or aggregate definition.
pub fn needs_check_function_bodies_guard(group: &FileGroup) -> bool {
    matches!(
        group.category,
        FileCategory::Function | FileCategory::Aggregate
    )
}
