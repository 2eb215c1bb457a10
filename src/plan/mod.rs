//! Plan assembly: the stable, serializable description of what applying a
//! target catalog against a source catalog would do — a superset view of
//! the same ordered steps `export::Exporter` writes to disk, packaged with
//! fingerprints and a risk verdict instead of written to files.
//!
//! Fingerprints reuse `render::{Safety, RenderedSql}` for risk
//! classification and follow a checksum-over-content idiom, swapped from
//! `md5` to `sha2::Sha256` per the explicit sha256-hex requirement and
//! computed over catalog object identity + content rather than file bytes,
//! since a plan exists before any file is written.

use anyhow::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::catalog::Catalog;
use crate::catalog::aggregate::Aggregate;
use crate::catalog::constraint::Constraint;
use crate::catalog::custom_type::CustomType;
use crate::catalog::domain::Domain;
use crate::catalog::extension::Extension;
use crate::catalog::function::Function;
use crate::catalog::id::{DependsOn, StableId};
use crate::catalog::index::Index;
use crate::catalog::sequence::Sequence;
use crate::catalog::table::Table;
use crate::catalog::view::View;
use crate::diff::operations::{MigrationStep, SqlRenderer};
use crate::diff::{diff_all, diff_order};
use crate::export::{ExportMode, grouping};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    DataLoss,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanRisk {
    pub level: RiskLevel,
    pub statements: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanFileMetadata {
    pub object_type: String,
    pub schema_name: Option<String>,
    pub object_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanFile {
    pub path: String,
    pub order: usize,
    pub statements: usize,
    pub sql: String,
    pub metadata: PlanFileMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanEndpoint {
    pub fingerprint: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEnvelope {
    pub version: u32,
    pub mode: String,
    pub generated_at: String,
    pub source: PlanEndpoint,
    pub target: PlanEndpoint,
    pub files: Vec<PlanFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<PlanRisk>,
}

pub struct PlanOptions {
    pub export_mode: ExportMode,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            export_mode: ExportMode::Detailed,
        }
    }
}

/// Every named object's `StableId` in `catalog`, used both to compute the
/// fingerprint and (implicitly, via the diff engine) to decide what the
/// plan covers. Grants are excluded here (their identity is a `String`,
/// not a `StableId`) but still enter the fingerprint through the raw
/// content dump below.
fn catalog_object_ids(catalog: &Catalog) -> Vec<StableId> {
    let mut ids = Vec::new();
    ids.extend(catalog.schemas.iter().map(|s| StableId::Schema {
        name: s.name.clone(),
    }));
    ids.extend(catalog.extensions.iter().map(Extension::id));
    ids.extend(catalog.types.iter().map(CustomType::id));
    ids.extend(catalog.domains.iter().map(Domain::id));
    ids.extend(catalog.sequences.iter().map(Sequence::id));
    ids.extend(catalog.tables.iter().map(Table::id));
    ids.extend(catalog.indexes.iter().map(Index::id));
    ids.extend(catalog.constraints.iter().map(Constraint::id));
    ids.extend(catalog.triggers.iter().map(|t| t.id()));
    ids.extend(catalog.views.iter().map(View::id));
    ids.extend(catalog.materialized_views.iter().map(|v| v.id()));
    ids.extend(catalog.functions.iter().map(Function::id));
    ids.extend(catalog.aggregates.iter().map(Aggregate::id));
    ids.extend(catalog.policies.iter().map(|p| p.id()));
    ids
}

/// `sha256(stableIds-of-plan-scope || source-catalog-data)`: the sorted
/// StableId list fixes object identity; the `{:?}` dump of every typed
/// section fixes content, so any column/definition/grant change inside an
/// otherwise-identical object set still changes the fingerprint.
pub fn fingerprint(catalog: &Catalog) -> String {
    let mut hasher = Sha256::new();

    let mut id_strings: Vec<String> = catalog_object_ids(catalog)
        .iter()
        .map(|id| id.to_string())
        .collect();
    id_strings.sort();
    for id in &id_strings {
        hasher.update(id.as_bytes());
        hasher.update(b"\0");
    }

    hasher.update(format!("{:?}", catalog.schemas).as_bytes());
    hasher.update(format!("{:?}", catalog.tables).as_bytes());
    hasher.update(format!("{:?}", catalog.views).as_bytes());
    hasher.update(format!("{:?}", catalog.materialized_views).as_bytes());
    hasher.update(format!("{:?}", catalog.types).as_bytes());
    hasher.update(format!("{:?}", catalog.domains).as_bytes());
    hasher.update(format!("{:?}", catalog.functions).as_bytes());
    hasher.update(format!("{:?}", catalog.aggregates).as_bytes());
    hasher.update(format!("{:?}", catalog.sequences).as_bytes());
    hasher.update(format!("{:?}", catalog.indexes).as_bytes());
    hasher.update(format!("{:?}", catalog.constraints).as_bytes());
    hasher.update(format!("{:?}", catalog.triggers).as_bytes());
    hasher.update(format!("{:?}", catalog.policies).as_bytes());
    hasher.update(format!("{:?}", catalog.extensions).as_bytes());
    hasher.update(format!("{:?}", catalog.grants).as_bytes());
    hasher.update(format!("{:?}", catalog.default_privileges).as_bytes());

    format!("{:x}", hasher.finalize())
}

fn category_object_type(category: grouping::FileCategory) -> &'static str {
    use grouping::FileCategory::*;
    match category {
        Schema => "schema",
        Extension => "extension",
        Type => "type",
        Domain => "domain",
        Sequence => "sequence",
        Table => "table",
        ForeignKey => "foreign_key",
        Policy => "policy",
        View => "view",
        MaterializedView => "materialized_view",
        Function => "function",
        Aggregate => "aggregate",
        Grant => "grant",
        DefaultPrivilege => "default_privilege",
    }
}

/// Builds the full plan for moving `source` to `target`: diffs the two
/// catalogs (not from-empty, unlike `export::Exporter` — a plan always
/// reflects a real source state), groups the steps into the same files an
/// export would produce, and classifies risk from any destructive step.
///
/// `target == source` is a no-op plan: `diff_all` returns no steps, so
/// `files` is empty and `risk` is `None`.
pub fn build_plan(
    source: &Catalog,
    target: &Catalog,
    options: &PlanOptions,
    generated_at: String,
) -> Result<PlanEnvelope> {
    let steps = diff_all(source, target);
    let ordered = diff_order(steps, source, target)?;

    let destructive_sql: Vec<String> = ordered
        .iter()
        .filter(|step| step.is_destructive())
        .flat_map(|step| step.to_sql().into_iter().map(|r| r.sql))
        .collect();

    let groups = grouping::group_changes_by_file(
        &ordered,
        target,
        options.export_mode,
        !target.schemas.iter().any(|s| s.name != "public"),
    );

    let files = groups
        .into_iter()
        .enumerate()
        .map(|(order, group)| {
            let sql = group
                .changes
                .iter()
                .flat_map(|step| step.to_sql().into_iter().map(|r| r.sql))
                .collect::<Vec<_>>()
                .join("\n");
            let statements = group.changes.len();
            PlanFile {
                path: group.path,
                order,
                statements,
                sql,
                metadata: PlanFileMetadata {
                    object_type: category_object_type(group.category).to_string(),
                    schema_name: group.schema_name,
                    object_name: group.object_name,
                },
            }
        })
        .collect();

    let risk = if destructive_sql.is_empty() {
        None
    } else {
        Some(PlanRisk {
            level: RiskLevel::DataLoss,
            statements: destructive_sql,
        })
    };

    Ok(PlanEnvelope {
        version: 1,
        mode: "declarative".to_string(),
        generated_at,
        source: PlanEndpoint {
            fingerprint: fingerprint(source),
        },
        target: PlanEndpoint {
            fingerprint: fingerprint(target),
        },
        files,
        risk,
    })
}
