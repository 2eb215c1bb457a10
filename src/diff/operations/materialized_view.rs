//! Materialized view operations for schema migrations
//!
//! Unlike a plain view, PostgreSQL has no `CREATE OR REPLACE MATERIALIZED
//! VIEW` — any change to the query or output columns goes through a
//! Drop+Create pair instead of an in-place `Replace`.

use super::OperationKind;
use super::comments::{CommentOperation, CommentTarget};
use crate::catalog::id::StableId;
use crate::render::quote_ident;

#[derive(Debug, Clone)]
pub enum MaterializedViewOperation {
    Create {
        schema: String,
        name: String,
        definition: String,
    },
    Drop {
        schema: String,
        name: String,
    },
    Comment(CommentOperation<MaterializedViewIdentifier>),
}

impl MaterializedViewOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
            Self::Comment(_) => OperationKind::Alter,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaterializedViewIdentifier {
    pub schema: String,
    pub name: String,
}

impl CommentTarget for MaterializedViewIdentifier {
    const OBJECT_TYPE: &'static str = "MATERIALIZED VIEW";

    fn identifier(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.name))
    }

    fn db_object_id(&self) -> StableId {
        StableId::MaterializedView {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }
}
