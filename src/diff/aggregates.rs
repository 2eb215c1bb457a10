use crate::catalog::aggregate::Aggregate;
use crate::diff::comment_utils;
use crate::diff::operations::{AggregateIdentifier, AggregateOperation, MigrationStep};

/// Diff a single aggregate function
pub fn diff(old: Option<&Aggregate>, new: Option<&Aggregate>) -> Vec<MigrationStep> {
    match (old, new) {
        // CREATE new aggregate
        (None, Some(new_aggregate)) => {
            vec![MigrationStep::Aggregate(AggregateOperation::Create {
                aggregate: Box::new(new_aggregate.clone()),
            })]
        }

        // DROP old aggregate
        (Some(old_aggregate), None) => {
            let identifier = AggregateIdentifier::new(
                old_aggregate.schema.clone(),
                old_aggregate.name.clone(),
                old_aggregate.arguments.clone(),
            );
            vec![MigrationStep::Aggregate(AggregateOperation::Drop {
                identifier,
            })]
        }

        // REPLACE or comment-only changes
        (Some(old_aggregate), Some(new_aggregate)) => {
            let mut steps = Vec::new();

            if aggregates_differ_structurally(old_aggregate, new_aggregate) {
                // Structural changes require replacement
                steps.push(MigrationStep::Aggregate(AggregateOperation::Replace {
                    old_aggregate: Box::new(old_aggregate.clone()),
                    new_aggregate: Box::new(new_aggregate.clone()),
                }));
            } else {
                // Only comments might have changed
                let comment_ops = comment_utils::handle_comment_diff(
                    Some(old_aggregate),
                    Some(new_aggregate),
                    || AggregateIdentifier::from_aggregate(new_aggregate),
                );
                for comment_op in comment_ops {
                    steps.push(MigrationStep::Aggregate(AggregateOperation::Comment(
                        comment_op,
                    )));
                }
            }

            steps
        }

        // No change
        (None, None) => vec![],
    }
}

/// Check if two aggregates differ in their structural properties
/// (everything except comments).
///
/// Every field an aggregate actually supports is itemized here rather than
/// comparing `definition` as a whole: the reconstructed definition string is
/// a rendering of these fields, and comparing two renderings is only as
/// reliable as the rendering code, which has no reason to be the source of
/// truth for what changed.
fn aggregates_differ_structurally(old: &Aggregate, new: &Aggregate) -> bool {
    old.arguments != new.arguments
        || old.state_type != new.state_type
        || old.state_type_schema != new.state_type_schema
        || old.state_func != new.state_func
        || old.state_func_schema != new.state_func_schema
        || old.final_func != new.final_func
        || old.final_func_schema != new.final_func_schema
        || old.combine_func != new.combine_func
        || old.combine_func_schema != new.combine_func_schema
        || old.serial_func != new.serial_func
        || old.serial_func_schema != new.serial_func_schema
        || old.deserial_func != new.deserial_func
        || old.deserial_func_schema != new.deserial_func_schema
        || old.initial_value != new.initial_value
        || old.return_type != new.return_type
        || old.return_type_schema != new.return_type_schema
        || old.parallel_safety != new.parallel_safety
        || old.is_strict != new.is_strict
        || old.is_hypothetical != new.is_hypothetical
        || old.sort_operator != new.sort_operator
        || old.sort_operator_schema != new.sort_operator_schema
}
