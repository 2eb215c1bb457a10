//! Hierarchical and scalable migration operations
//!
//! This module provides a more maintainable approach to migration steps
//! using hierarchical enums and trait-based rendering.

use crate::catalog::id::StableId;

// Re-export SqlRenderer from render module
pub use crate::render::SqlRenderer;

pub use aggregate::*;
pub use comments::*;
pub use constraint::*;
pub use default_privilege::*;
pub use domain::*;
pub use extension::*;
pub use function::*;
pub use grant::*;
pub use index::*;
pub use materialized_view::*;
pub use policy::*;
pub use schema::*;
pub use sequence::*;
pub use table::*;
pub use trigger::*;
pub use types::*;
pub use view::*;

pub mod aggregate;
pub mod comments;
pub mod constraint;
pub mod default_privilege;
pub mod domain;
pub mod extension;
pub mod function;
pub mod grant;
pub mod index;
pub mod materialized_view;
pub mod policy;
pub mod schema;
pub mod sequence;
pub mod table;
pub mod trigger;
pub mod types;
pub mod view;

/// Main migration step - hierarchical structure for scalability
#[derive(Debug, Clone)]
pub enum MigrationStep {
    Schema(SchemaOperation),
    Table(TableOperation),
    View(ViewOperation),
    MaterializedView(MaterializedViewOperation),
    Type(TypeOperation),
    Domain(DomainOperation),
    Sequence(SequenceOperation),
    Function(FunctionOperation),
    Aggregate(AggregateOperation),
    Index(IndexOperation),
    Constraint(ConstraintOperation),
    Trigger(TriggerOperation),
    Extension(ExtensionOperation),
    Policy(PolicyOperation),
    Grant(GrantOperation),
    DefaultPrivilege(DefaultPrivilegeOperation),
}

impl MigrationStep {
    /// Returns the database object ID for this migration step
    pub fn id(&self) -> StableId {
        self.db_object_id()
    }

    /// Returns true if this step is a destructive operation (drop)
    pub fn is_drop(&self) -> bool {
        self.is_destructive()
    }

    /// Returns true if this step is a create operation
    pub fn is_create(&self) -> bool {
        matches!(
            self,
            MigrationStep::Schema(SchemaOperation::Create { .. })
                | MigrationStep::Extension(ExtensionOperation::Create { .. })
                | MigrationStep::Table(TableOperation::Create { .. })
                | MigrationStep::View(ViewOperation::Create { .. })
                | MigrationStep::MaterializedView(MaterializedViewOperation::Create { .. })
                | MigrationStep::Type(TypeOperation::Create { .. })
                | MigrationStep::Domain(DomainOperation::Create { .. })
                | MigrationStep::Sequence(SequenceOperation::Create { .. })
                | MigrationStep::Function(FunctionOperation::Create { .. })
                | MigrationStep::Aggregate(AggregateOperation::Create { .. })
                | MigrationStep::Index(IndexOperation::Create { .. })
                | MigrationStep::Constraint(ConstraintOperation::Create(_))
                | MigrationStep::Trigger(TriggerOperation::Create { .. })
                | MigrationStep::Policy(PolicyOperation::Create { .. })
                | MigrationStep::Grant(GrantOperation::Grant { .. })
                | MigrationStep::DefaultPrivilege(DefaultPrivilegeOperation::Grant { .. })
        )
    }

    /// Returns true if this step is a "relationship" step that creates circular dependencies
    /// These steps should be executed in a second phase after all primary object creation
    pub fn is_relationship(&self) -> bool {
        match self {
            MigrationStep::Sequence(SequenceOperation::AlterOwnership { .. }) => true,
            MigrationStep::Constraint(ConstraintOperation::Create(constraint)) => {
                matches!(
                    constraint.constraint_type,
                    crate::catalog::constraint::ConstraintType::ForeignKey { .. }
                )
            }
            _ => false,
        }
    }

    /// The object this step brings into existence, if any.
    pub fn creates(&self) -> Option<StableId> {
        self.is_create().then(|| self.id())
    }

    /// The object this step removes, if any.
    pub fn drops(&self) -> Option<StableId> {
        self.is_drop().then(|| self.id())
    }

    /// Step-level prerequisites, covering every `MigrationStep` variant.
    ///
    /// Most variants carry flattened fields (schema/name/columns, ...)
    /// rather than the original catalog object, so their dependencies are
    /// looked up separately via `Catalog::forward_deps` keyed by `id()` in
    /// `order_steps_by_dependencies` — those arms return an empty vec here.
    /// The variants below carry the full catalog object and so can answer
    /// directly; this matters most for grants, where `diff_grants` splits
    /// one fetched ACL row into several per-privilege `Grant` values whose
    /// `id()` (which folds in the privilege list) never appears verbatim in
    /// `Catalog::forward_deps` — these are exactly the "dynamically
    /// generated steps" the resolver's catalog-deps lookup can't see.
    pub fn requires(&self) -> Vec<StableId> {
        match self {
            MigrationStep::Schema(_)
            | MigrationStep::Table(_)
            | MigrationStep::View(_)
            | MigrationStep::MaterializedView(_)
            | MigrationStep::Type(_)
            | MigrationStep::Domain(_)
            | MigrationStep::Sequence(_)
            | MigrationStep::Function(_)
            | MigrationStep::Index(_)
            | MigrationStep::Constraint(_) => vec![],
            MigrationStep::Aggregate(op) => match op {
                AggregateOperation::Create { aggregate } => aggregate.depends_on.clone(),
                AggregateOperation::Replace { new_aggregate, .. } => {
                    new_aggregate.depends_on.clone()
                }
                AggregateOperation::Drop { .. } | AggregateOperation::Comment(_) => vec![],
            },
            MigrationStep::Trigger(op) => match op {
                TriggerOperation::Create { trigger } => trigger.depends_on.clone(),
                TriggerOperation::Replace { new_trigger, .. } => new_trigger.depends_on.clone(),
                TriggerOperation::Drop { .. } | TriggerOperation::Comment(_) => vec![],
            },
            MigrationStep::Extension(op) => match op {
                ExtensionOperation::Create { extension } => extension.depends_on.clone(),
                ExtensionOperation::Drop { .. } | ExtensionOperation::Comment(_) => vec![],
            },
            MigrationStep::Policy(op) => match op {
                PolicyOperation::Create { policy } => policy.depends_on.clone(),
                PolicyOperation::Replace { new_policy, .. } => new_policy.depends_on.clone(),
                PolicyOperation::Drop { .. }
                | PolicyOperation::Alter { .. }
                | PolicyOperation::Comment(_) => vec![],
            },
            MigrationStep::Grant(op) => match op {
                GrantOperation::Grant { grant }
                | GrantOperation::Revoke { grant }
                | GrantOperation::RevokeGrantOption { grant } => grant.depends_on.clone(),
            },
            MigrationStep::DefaultPrivilege(op) => match op {
                DefaultPrivilegeOperation::Grant { privilege }
                | DefaultPrivilegeOperation::Revoke { privilege }
                | DefaultPrivilegeOperation::RevokeGrantOption { privilege } => {
                    privilege.depends_on.clone()
                }
            },
        }
    }
}
