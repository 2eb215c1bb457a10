use crate::catalog::extension::Extension;
use crate::diff::comment_utils;
use crate::diff::operations::{ExtensionIdentifier, ExtensionOperation, MigrationStep};

/// Diff a single extension
pub fn diff(old: Option<&Extension>, new: Option<&Extension>) -> Vec<MigrationStep> {
    match (old, new) {
        // CREATE new extension
        (None, Some(new_extension)) => {
            vec![MigrationStep::Extension(ExtensionOperation::Create {
                extension: new_extension.clone(),
            })]
        }

        // DROP old extension
        (Some(old_extension), None) => {
            let identifier = ExtensionIdentifier::new(old_extension.name.clone());
            vec![MigrationStep::Extension(ExtensionOperation::Drop {
                identifier,
            })]
        }

        // An extension's version/schema can technically change via `ALTER
        // EXTENSION ... UPDATE`, but nothing in the catalog snapshot today
        // distinguishes "installed at an old version" from "needs updating" —
        // version is just a string pulled from pg_extension, with no target
        // version to compare against. Only comment changes are surfaced here;
        // a version bump requires an explicit `ALTER EXTENSION` outside this
        // differ's scope.
        (Some(old_extension), Some(new_extension)) => {
            let mut steps = Vec::new();

            let comment_ops = comment_utils::handle_comment_diff(
                Some(old_extension),
                Some(new_extension),
                || ExtensionIdentifier::from_extension(new_extension),
            );
            for comment_op in comment_ops {
                steps.push(MigrationStep::Extension(ExtensionOperation::Comment(
                    comment_op,
                )));
            }

            steps
        }

        // No change
        (None, None) => vec![],
    }
}
