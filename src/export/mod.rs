//! File grouper & exporter: turns an ordered list of migration steps into
//! a set of SQL files on disk, one object (or object cluster, in Simple
//! mode) per file, each annotated with a `-- require:` header listing the
//! other files it depends on.
//!
//! Built around `grouping::group_changes_by_file` plus an optional
//! `integration::Integration` hook.

pub mod grouping;
pub mod integration;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::catalog::Catalog;
use crate::catalog::id::StableId;
use crate::diff::operations::{MigrationStep, SqlRenderer};
use crate::diff::{diff_all, diff_order};

pub use grouping::{ExportMode, FileCategory, FileGroup};
pub use integration::{Integration, IntegrationRule, Pattern};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub mode: ExportMode,
    pub include_comments: bool,
    pub include_grants: bool,
    pub include_triggers: bool,
    pub include_extensions: bool,
    /// Prefix each generated file with its dependency-order index
    /// (`000001_...`) so alphabetical-apply tooling sees the right order.
    pub order_prefix: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            mode: ExportMode::Detailed,
            include_comments: true,
            include_grants: true,
            include_triggers: true,
            include_extensions: true,
            order_prefix: false,
        }
    }
}

pub struct Exporter {
    catalog: Catalog,
    output_dir: PathBuf,
    options: ExportOptions,
    integration: Option<Integration>,
}

impl Exporter {
    pub fn new(catalog: Catalog, output_dir: PathBuf, options: ExportOptions) -> Self {
        Self {
            catalog,
            output_dir,
            options,
            integration: None,
        }
    }

    pub fn with_integration(mut self, integration: Integration) -> Self {
        self.integration = Some(integration);
        self
    }

    fn has_multiple_schemas(&self) -> bool {
        self.catalog.schemas.iter().any(|s| s.name != "public")
    }

    /// Ordered, filtered migration steps a full snapshot of `self.catalog`
    /// (diffed from empty) would apply — the same steps that get grouped
    /// into files and that `plan::build_plan` also assembles fingerprints
    /// and risk classification from.
    pub fn ordered_steps(&self) -> Result<Vec<MigrationStep>> {
        let empty_catalog = Catalog::empty();
        let steps = diff_all(&empty_catalog, &self.catalog);
        let ordered = diff_order(steps, &empty_catalog, &self.catalog)?;
        let declarative = grouping::filter_declarative_drops(ordered);
        let config_filtered = self.filter_steps_by_config(declarative);
        Ok(match &self.integration {
            Some(integration) => integration.apply_filter(config_filtered),
            None => config_filtered,
        })
    }

    pub fn generate_files(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;

        let steps = self.ordered_steps()?;
        let groups = grouping::group_changes_by_file(
            &steps,
            &self.catalog,
            self.options.mode,
            !self.has_multiple_schemas(),
        );

        let group_paths: Vec<String> = groups
            .iter()
            .enumerate()
            .map(|(i, g)| self.final_path(i, &g.path))
            .collect();

        let object_to_file: BTreeMap<StableId, String> = groups
            .iter()
            .zip(&group_paths)
            .flat_map(|(g, path)| g.changes.iter().map(|c| (c.id(), path.clone())))
            .collect();

        for (group, path) in groups.iter().zip(&group_paths) {
            self.write_group(group, path, &object_to_file)?;
        }

        Ok(())
    }

    fn final_path(&self, index: usize, path: &str) -> String {
        if self.options.order_prefix {
            format!("{:06}_{}", index + 1, path)
        } else {
            path.to_string()
        }
    }

    fn filter_steps_by_config(&self, steps: Vec<MigrationStep>) -> Vec<MigrationStep> {
        steps
            .into_iter()
            .filter(|step| match step {
                MigrationStep::Grant(_) => self.options.include_grants,
                MigrationStep::DefaultPrivilege(_) => self.options.include_grants,
                MigrationStep::Trigger(_) => self.options.include_triggers,
                MigrationStep::Extension(_) => self.options.include_extensions,
                _ => {
                    if let StableId::Comment { .. } = step.id() {
                        self.options.include_comments
                    } else {
                        true
                    }
                }
            })
            .collect()
    }

    fn write_group(
        &self,
        group: &FileGroup,
        final_path: &str,
        object_to_file: &BTreeMap<StableId, String>,
    ) -> Result<()> {
        let mut dependencies: Vec<String> = group
            .changes
            .iter()
            .flat_map(|step| {
                self.catalog
                    .forward_deps
                    .get(&step.id())
                    .cloned()
                    .unwrap_or_default()
            })
            .filter_map(|dep| object_to_file.get(&dep).cloned())
            .filter(|path| path != final_path)
            .collect();
        dependencies.sort();
        dependencies.dedup();

        let mut content = String::new();
        for dep in &dependencies {
            content.push_str(&format!("-- require: {}\n", dep));
        }
        if !dependencies.is_empty() {
            content.push('\n');
        }

        if grouping::needs_check_function_bodies_guard(group) {
            content.push_str("SET check_function_bodies = false;\n\n");
        }

        for (i, step) in group.changes.iter().enumerate() {
            if i > 0 {
                content.push('\n');
            }
            let sql = match self.integration.as_ref().and_then(|i| i.serialize(step)) {
                Some(custom) => custom,
                None => step
                    .to_sql()
                    .into_iter()
                    .map(|rendered| rendered.sql)
                    .collect::<Vec<_>>()
                    .join("\n"),
            };
            content.push_str(&sql);
            if !sql.ends_with(';') {
                content.push(';');
            }
            content.push('\n');
        }

        if content.trim().is_empty() {
            return Ok(());
        }

        let file_path = self.output_dir.join(final_path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(file_path, content)?;
        Ok(())
    }
}
