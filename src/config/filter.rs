use crate::catalog;
use crate::catalog::grant::ObjectType;
use crate::config::types::{ObjectExclude, ObjectInclude, Objects, TrackingTable};
use glob::Pattern;

/// Object filter for determining which database objects pgdiff should manage.
/// Schema files are the source of truth - what's in your files is what gets managed.
/// Use include/exclude patterns to control which schemas and tables are processed.
pub struct ObjectFilter {
    include: ObjectInclude,
    exclude: ObjectExclude,
    tracking_table: TrackingTable,
}

impl ObjectFilter {
    /// Create a new object filter from configuration
    pub fn new(config: &Objects, tracking_table: &TrackingTable) -> Self {
        Self {
            include: config.include.clone(),
            exclude: config.exclude.clone(),
            tracking_table: tracking_table.clone(),
        }
    }

    /// Check if a schema should be included
    pub fn should_include_schema(&self, schema_name: &str) -> bool {
        // Check exclude patterns first
        if self.matches_patterns(&self.exclude.schemas, schema_name) {
            return false;
        }

        // If include patterns are specified, schema must match one of them
        if !self.include.schemas.is_empty() {
            return self.matches_patterns(&self.include.schemas, schema_name);
        }

        // Default: include if not excluded
        true
    }

    /// Check if a table should be included
    pub fn should_include_table(&self, schema_name: &str, table_name: &str) -> bool {
        // Exclude pgdiff internal tables (migrations tracking, sections, etc.)
        if self.is_pgdiff_internal_table(schema_name, table_name) {
            return false;
        }

        // First check if the schema is included
        if !self.should_include_schema(schema_name) {
            return false;
        }

        // Check exclude patterns for tables
        if self.matches_patterns(&self.exclude.tables, table_name) {
            return false;
        }

        // If include patterns are specified, table must match one of them
        if !self.include.tables.is_empty() {
            return self.matches_patterns(&self.include.tables, table_name);
        }

        // Default: include if not excluded
        true
    }

    /// Check if this is a pgdiff internal table (migration tracking, sections, etc.)
    /// These tables are infrastructure managed by pgdiff itself, not part of the user's schema.
    pub fn is_pgdiff_internal_table(&self, schema_name: &str, table_name: &str) -> bool {
        if schema_name != self.tracking_table.schema {
            return false;
        }

        // Check all pgdiff internal table patterns
        let internal_tables = [
            self.tracking_table.name.as_str(), // pgdiff_migrations
            &format!("{}_sections", self.tracking_table.name), // pgdiff_migrations_sections
        ];

        internal_tables.contains(&table_name)
    }

    /// Apply filter to a catalog, removing objects that shouldn't be managed
    /// based on include/exclude patterns. Schema files are the source of truth
    /// for what object types to manage (grants, triggers, extensions, etc.).
    pub fn filter_catalog(&self, mut catalog: catalog::Catalog) -> catalog::Catalog {
        // Filter schemas
        catalog
            .schemas
            .retain(|schema| self.should_include_schema(&schema.name));

        // Filter tables
        catalog
            .tables
            .retain(|table| self.should_include_table(&table.schema, &table.name));

        // Filter views (apply same table filtering logic)
        catalog
            .views
            .retain(|view| self.should_include_table(&view.schema, &view.name));

        // Filter materialized views (apply same table filtering logic)
        catalog
            .materialized_views
            .retain(|view| self.should_include_table(&view.schema, &view.name));

        // Filter functions by schema
        catalog
            .functions
            .retain(|function| self.should_include_schema(&function.schema));

        // Filter custom types by schema
        catalog
            .types
            .retain(|custom_type| self.should_include_schema(&custom_type.schema));

        // Filter sequences by schema
        catalog
            .sequences
            .retain(|sequence| self.should_include_schema(&sequence.schema));

        // Filter indexes by table inclusion
        catalog
            .indexes
            .retain(|index| self.should_include_table(&index.schema, &index.table_name));

        // Filter constraints by table inclusion
        catalog
            .constraints
            .retain(|constraint| self.should_include_table(&constraint.schema, &constraint.table));

        // Filter triggers by table inclusion
        catalog
            .triggers
            .retain(|trigger| self.should_include_table(&trigger.schema, &trigger.table_name));

        // Filter grants by the schema of the object they apply to
        catalog.grants.retain(|grant| {
            // For table/view grants, check both schema and table exclusion patterns
            // For other objects, just check schema inclusion
            match &grant.object {
                ObjectType::Table { schema, name } | ObjectType::View { schema, name } => {
                    self.should_include_table(schema, name)
                }
                _ => self.should_include_schema(grant.object.schema()),
            }
        });

        // Filter default privileges by scope: schema-scoped entries follow schema
        // inclusion, global-scoped entries (no schema to check) always pass through.
        catalog.default_privileges.retain(|privilege| {
            match &privilege.scope {
                crate::catalog::default_privilege::DefaultPrivilegeScope::Schema(schema) => {
                    self.should_include_schema(schema)
                }
                crate::catalog::default_privilege::DefaultPrivilegeScope::Global => true,
            }
        });

        // Note: extensions are not filtered by schema pattern - an extension installed in
        // one schema may be used across all schemas, so filtering would be incorrect.

        catalog
    }

    /// Check if a name matches any of the glob patterns
    fn matches_patterns(&self, patterns: &[String], name: &str) -> bool {
        if patterns.is_empty() {
            return false;
        }

        patterns.iter().any(|pattern| {
            Pattern::new(pattern)
                .map(|p| p.matches(name))
                .unwrap_or(false)
        })
    }
}
