//! SQL rendering for extension operations

use crate::catalog::extension::Extension;
use crate::catalog::id::StableId;
use crate::diff::operations::{CommentOperation, ExtensionIdentifier, ExtensionOperation};
use crate::render::{RenderedSql, SqlRenderer};

impl SqlRenderer for ExtensionOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            ExtensionOperation::Create { extension } => {
                vec![render_create_extension(extension)]
            }
            ExtensionOperation::Drop { identifier } => {
                vec![render_drop_extension(identifier)]
            }
            ExtensionOperation::Comment(comment_op) => comment_op.to_sql(),
        }
    }

    fn db_object_id(&self) -> StableId {
        match self {
            ExtensionOperation::Create { extension } => StableId::Extension {
                name: extension.name.clone(),
            },
            ExtensionOperation::Drop { identifier } => StableId::Extension {
                name: identifier.name.clone(),
            },
            ExtensionOperation::Comment(comment_op) => match comment_op {
                CommentOperation::Set { target, .. } | CommentOperation::Drop { target } => {
                    StableId::Extension {
                        name: target.name.clone(),
                    }
                }
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, ExtensionOperation::Drop { .. })
    }
}

fn render_create_extension(extension: &Extension) -> RenderedSql {
    let mut sql = format!("CREATE EXTENSION IF NOT EXISTS \"{}\"", extension.name);

    // Add schema if not the default
    if extension.schema != "public" {
        sql.push_str(&format!(" SCHEMA \"{}\"", extension.schema));
    }

    sql.push(';');

    // Note: We don't include VERSION in the rendered SQL to avoid conflicts
    // with existing installations. PostgreSQL will use the default/installed version.

    RenderedSql::new(sql)
}

fn render_drop_extension(identifier: &ExtensionIdentifier) -> RenderedSql {
    let sql = format!("DROP EXTENSION IF EXISTS \"{}\";", identifier.name);
    RenderedSql::destructive(sql)
}
