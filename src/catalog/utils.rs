use crate::catalog::id::StableId;

/// Helper to check if a schema name is a system schema.
/// Used for dependency tracking to avoid tracking dependencies on system objects.
pub fn is_system_schema(schema: &str) -> bool {
    matches!(schema, "pg_catalog" | "information_schema" | "pg_toast")
        || schema.starts_with("pg_temp_")
}

/// Builder for constructing dependency lists for database objects.
/// Provides consistent dependency tracking across all catalog object types.
pub struct DependencyBuilder {
    deps: Vec<StableId>,
}

impl DependencyBuilder {
    /// Create a new dependency builder with the object's parent schema as the first dependency.
    /// All database objects depend on their containing schema.
    pub fn new(schema: String) -> Self {
        Self {
            deps: vec![StableId::Schema { name: schema }],
        }
    }

    /// Add a custom type dependency if the type is not a system type.
    /// Used when objects reference user-defined types (ENUMs, DOMAINs, COMPOSITE).
    /// Note: Prefer `add_type_or_extension()` when extension type detection is available.
    #[allow(dead_code)] // Used in tests; kept as a simpler API when extension detection isn't needed
    pub fn add_custom_type(&mut self, type_schema: Option<String>, type_name: Option<String>) {
        if let (Some(schema), Some(name)) = (type_schema, type_name)
            && !is_system_schema(&schema)
        {
            self.deps.push(StableId::Type { schema, name });
        }
    }

    /// Add a type or extension dependency based on whether the type is extension-provided.
    ///
    /// This is the single place where the "extension type vs custom type" decision is made.
    /// Catalog files should query `pg_depend` to get `is_extension` and `extension_name`,
    /// then call this method with the results.
    ///
    /// **Important**: For array types, the `type_name` parameter should be the element type name,
    /// NOT the array type name (e.g., pass "priority" not "_priority"). Callers should resolve
    /// this using `pg_type.typelem` in their SQL queries with a pattern like:
    /// ```sql
    /// CASE WHEN t.typelem != 0 THEN elem_t.typname ELSE t.typname END AS "type_name?"
    /// ```
    pub fn add_type_or_extension(
        &mut self,
        type_schema: Option<String>,
        type_name: Option<String>,
        is_extension: bool,
        extension_name: Option<String>,
    ) {
        if is_extension {
            if let Some(ext_name) = extension_name {
                self.deps.push(StableId::Extension { name: ext_name });
            }
        } else if let (Some(schema), Some(name)) = (type_schema, type_name)
            && !is_system_schema(&schema)
        {
            // Type name should already be resolved to element type for arrays via SQL
            self.deps.push(StableId::Type { schema, name });
        }
    }

    /// Add a type dependency with proper distinction between domains and other custom types.
    ///
    /// This method uses `typtype` from pg_type to correctly categorize:
    /// - 'd' = domain → `StableId::Domain`
    /// - 'e' = enum, 'c' = composite, 'r' = range → `StableId::Type`
    ///
    /// Use this method when you have access to `typtype` information (e.g., for function
    /// parameters and return types). Falls back to `StableId::Type` if typtype is unknown.
    pub fn add_type_dependency(
        &mut self,
        type_schema: Option<String>,
        type_name: Option<String>,
        typtype: Option<String>,
        is_extension: bool,
        extension_name: Option<String>,
    ) {
        if is_extension {
            if let Some(ext_name) = extension_name {
                self.deps.push(StableId::Extension { name: ext_name });
            }
        } else if let (Some(schema), Some(name)) = (type_schema, type_name)
            && !is_system_schema(&schema)
        {
            if typtype.as_deref() == Some("d") {
                self.deps.push(StableId::Domain { schema, name });
            } else {
                self.deps.push(StableId::Type { schema, name });
            }
        }
    }

    /// Build the final dependency list.
    pub fn build(self) -> Vec<StableId> {
        self.deps
    }
}
