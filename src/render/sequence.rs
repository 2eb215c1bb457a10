//! SQL rendering for sequence operations

use crate::catalog::id::StableId;
use crate::diff::operations::SequenceOperation;
use crate::render::{RenderedSql, Safety, SqlRenderer, quote_ident};

impl SqlRenderer for SequenceOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            SequenceOperation::Create {
                schema,
                name,
                data_type,
                start_value,
                min_value,
                max_value,
                increment,
                cycle,
            } => vec![RenderedSql {
                sql: format!(
                    "CREATE SEQUENCE {}.{} AS {} START {} MINVALUE {} MAXVALUE {} INCREMENT {}{};",
                    quote_ident(schema),
                    quote_ident(name),
                    data_type,
                    start_value,
                    min_value,
                    max_value,
                    increment,
                    if *cycle { " CYCLE" } else { " NO CYCLE" }
                ),
                safety: Safety::Safe,
            }],
            SequenceOperation::Drop { schema, name } => vec![RenderedSql {
                sql: format!(
                    "DROP SEQUENCE {}.{};",
                    quote_ident(schema),
                    quote_ident(name)
                ),
                safety: Safety::Destructive,
            }],
            SequenceOperation::AlterOwnership {
                schema,
                name,
                owned_by,
            } => vec![RenderedSql {
                sql: if owned_by == "NONE" {
                    format!(
                        "ALTER SEQUENCE {}.{} OWNED BY NONE;",
                        quote_ident(schema),
                        quote_ident(name)
                    )
                } else {
                    let parts: Vec<&str> = owned_by.split('.').collect();
                    if parts.len() == 3 {
                        format!(
                            "ALTER SEQUENCE {}.{} OWNED BY {}.{}.{};",
                            quote_ident(schema),
                            quote_ident(name),
                            quote_ident(parts[0]),
                            quote_ident(parts[1]),
                            quote_ident(parts[2])
                        )
                    } else {
                        format!(
                            "ALTER SEQUENCE {}.{} OWNED BY {};",
                            quote_ident(schema),
                            quote_ident(name),
                            owned_by
                        )
                    }
                },
                safety: Safety::Safe,
            }],
            SequenceOperation::AlterProperties {
                schema,
                name,
                data_type,
                min_value,
                max_value,
                increment,
                cycle,
            } => vec![RenderedSql {
                sql: format!(
                    "ALTER SEQUENCE {}.{} AS {} MINVALUE {} MAXVALUE {} INCREMENT {}{};",
                    quote_ident(schema),
                    quote_ident(name),
                    data_type,
                    min_value,
                    max_value,
                    increment,
                    if *cycle { " CYCLE" } else { " NO CYCLE" }
                ),
                safety: Safety::Safe,
            }],
            SequenceOperation::Comment(op) => op.to_sql(),
        }
    }

    fn db_object_id(&self) -> StableId {
        match self {
            SequenceOperation::Create { schema, name, .. }
            | SequenceOperation::Drop { schema, name }
            | SequenceOperation::AlterOwnership { schema, name, .. }
            | SequenceOperation::AlterProperties { schema, name, .. } => StableId::Sequence {
                schema: schema.clone(),
                name: name.clone(),
            },
            SequenceOperation::Comment(op) => op.db_object_id(),
        }
    }
}
