//! View operations for schema migrations

use super::OperationKind;
use super::comments::{CommentOperation, CommentTarget};
use crate::catalog::id::StableId;
use crate::render::quote_ident;

#[derive(Debug, Clone)]
pub enum ViewOperation {
    Create {
        schema: String,
        name: String,
        definition: String,
        security_invoker: bool,
        security_barrier: bool,
    },
    Drop {
        schema: String,
        name: String,
    },
    Replace {
        schema: String,
        name: String,
        definition: String,
    },
    SetOption {
        schema: String,
        name: String,
        option: ViewOption,
        enabled: bool,
    },
    Comment(CommentOperation<ViewIdentifier>),
}

impl ViewOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
            Self::Replace { .. } => OperationKind::Alter,
            Self::SetOption { .. } => OperationKind::Alter,
            Self::Comment(_) => OperationKind::Alter,
        }
    }
}

/// A boolean view reloption that can be set or reset independently of a
/// `CREATE OR REPLACE VIEW`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOption {
    SecurityInvoker,
    SecurityBarrier,
}

impl ViewOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityInvoker => "security_invoker",
            Self::SecurityBarrier => "security_barrier",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewIdentifier {
    pub schema: String,
    pub name: String,
}

impl CommentTarget for ViewIdentifier {
    const OBJECT_TYPE: &'static str = "VIEW";

    fn identifier(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.name))
    }

    fn db_object_id(&self) -> StableId {
        StableId::View {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }
}
