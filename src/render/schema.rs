//! SQL rendering for schema operations

use crate::catalog::id::StableId;
use crate::diff::operations::SchemaOperation;
use crate::render::{RenderedSql, Safety, SqlRenderer, quote_ident};

impl SqlRenderer for SchemaOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            SchemaOperation::Create { name } => vec![RenderedSql {
                sql: format!("CREATE SCHEMA {};", quote_ident(name)),
                safety: Safety::Safe,
            }],
            SchemaOperation::Drop { name } => vec![RenderedSql {
                sql: format!("DROP SCHEMA {};", quote_ident(name)),
                safety: Safety::Destructive,
            }],
            SchemaOperation::Comment(op) => op.to_sql(),
        }
    }

    fn db_object_id(&self) -> StableId {
        match self {
            SchemaOperation::Create { name } | SchemaOperation::Drop { name } => {
                StableId::Schema { name: name.clone() }
            }
            SchemaOperation::Comment(op) => op.db_object_id(),
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, SchemaOperation::Drop { .. })
    }
}
