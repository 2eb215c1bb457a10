//! SQL rendering for materialized view operations

use crate::catalog::id::StableId;
use crate::diff::operations::MaterializedViewOperation;
use crate::render::{RenderedSql, Safety, SqlRenderer, quote_ident};

impl SqlRenderer for MaterializedViewOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            MaterializedViewOperation::Create {
                schema,
                name,
                definition,
            } => vec![RenderedSql {
                sql: format!(
                    "CREATE MATERIALIZED VIEW {}.{} AS\n{};",
                    quote_ident(schema),
                    quote_ident(name),
                    definition.trim_end_matches(';'),
                ),
                safety: Safety::Safe,
            }],
            MaterializedViewOperation::Drop { schema, name } => vec![RenderedSql {
                sql: format!(
                    "DROP MATERIALIZED VIEW {}.{};",
                    quote_ident(schema),
                    quote_ident(name)
                ),
                safety: Safety::Safe,
            }],
            MaterializedViewOperation::Comment(op) => op.to_sql(),
        }
    }

    fn db_object_id(&self) -> StableId {
        match self {
            MaterializedViewOperation::Create { schema, name, .. }
            | MaterializedViewOperation::Drop { schema, name } => StableId::MaterializedView {
                schema: schema.clone(),
                name: name.clone(),
            },
            MaterializedViewOperation::Comment(op) => op.db_object_id(),
        }
    }
}
