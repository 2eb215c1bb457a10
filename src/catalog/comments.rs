/// Implemented by every catalog object that carries a `pg_description` entry
/// (schemas, tables, columns, views, types, domains, sequences, functions,
/// aggregates, extensions, triggers, policies), so `diff_comments` below can
/// stay generic over object kind.
pub trait Commentable {
    fn comment(&self) -> &Option<String>;
}

/// Generate comment diff actions for any commentable object.
/// Object creation/deletion is handled by each per-kind differ directly
/// (the new/dropped object's comment becomes part of its own create/drop
/// step), so this only covers the case where the object exists on both sides.
pub fn diff_comments<T: Commentable + Clone>(
    old: Option<&T>,
    new: Option<&T>,
) -> Vec<CommentAction> {
    match (old, new) {
        (Some(old_obj), Some(new_obj)) => {
            match (old_obj.comment(), new_obj.comment()) {
                (None, Some(comment)) => vec![CommentAction::SetComment {
                    comment: comment.clone(),
                }],
                (Some(_), None) => vec![CommentAction::DropComment],
                (Some(old_comment), Some(new_comment)) if old_comment != new_comment => {
                    vec![CommentAction::SetComment {
                        comment: new_comment.clone(),
                    }]
                }
                _ => vec![], // No change
            }
        }
        _ => vec![], // Object creation/deletion handles comments separately
    }
}

/// Generic comment action for any object type
#[derive(Debug, Clone)]
pub enum CommentAction {
    SetComment { comment: String },
    DropComment,
}
