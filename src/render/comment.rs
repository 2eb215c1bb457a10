//! SQL rendering for comment operations

use crate::catalog::id::StableId;
use crate::diff::operations::{CommentOperation, CommentTarget};
use crate::render::{RenderedSql, SqlRenderer, render_comment_sql};

impl<T: CommentTarget> SqlRenderer for CommentOperation<T> {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            CommentOperation::Set { target, comment } => {
                vec![render_comment_sql(
                    T::OBJECT_TYPE,
                    &target.identifier(),
                    Some(comment),
                )]
            }
            CommentOperation::Drop { target } => {
                vec![render_comment_sql(
                    T::OBJECT_TYPE,
                    &target.identifier(),
                    None,
                )]
            }
        }
    }

    fn db_object_id(&self) -> StableId {
        match self {
            CommentOperation::Set { target, .. } | CommentOperation::Drop { target } => {
                StableId::Comment {
                    object_id: Box::new(target.db_object_id()),
                }
            }
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, CommentOperation::Drop { .. })
    }
}
