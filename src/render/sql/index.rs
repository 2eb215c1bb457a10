//! Shared SQL rendering for CREATE INDEX statements
//!
//! This module provides consistent index rendering across both schema generation
//! and migration operations to ensure identical SQL output.

use crate::catalog::index::Index;
use crate::render::quote_ident;

/// Render a complete CREATE INDEX statement for the given index.
///
/// This function handles all PostgreSQL index features:
/// - Index types (USING btree/gist/gin/etc.)
/// - Operator classes (e.g., gist_trgm_ops)
/// - INCLUDE columns for covering indexes
/// - WHERE predicates for partial indexes
/// - WITH storage parameters
/// - TABLESPACE specifications
/// - Collations and ordering
/// `is_clustered` and `is_valid` aren't rendered here — neither has a CREATE
/// INDEX spelling. A clustered index needs a follow-up `CLUSTER` statement and
/// an invalid one needs `REINDEX`; `diff::indexes` emits those as separate steps.
pub fn render_create_index(index: &Index) -> String {
    let mut sql = String::new();

    // CREATE [UNIQUE] INDEX [CONCURRENTLY] name
    sql.push_str("CREATE ");
    if index.is_unique {
        sql.push_str("UNIQUE ");
    }
    sql.push_str("INDEX ");
    sql.push_str(&quote_ident(&index.name));

    // ON table_name
    sql.push_str(" ON ");
    sql.push_str(&format!(
        "{}.{}",
        quote_ident(&index.table_schema),
        quote_ident(&index.table_name)
    ));

    // USING index_type
    sql.push_str(" USING ");
    sql.push_str(&index.index_type.to_string());

    // Column list
    sql.push_str(" (");
    let column_specs: Vec<String> = index
        .columns
        .iter()
        .map(|col| {
            let mut spec = col.expression.clone();

            // Add collation if specified
            if let Some(ref collation) = col.collation {
                spec.push_str(&format!(" COLLATE {}", collation));
            }

            // Add operator class if specified
            if let Some(ref opclass) = col.opclass {
                spec.push_str(&format!(" {}", opclass));
            }

            // Add ordering for btree indexes
            if let Some(ref ordering) = col.ordering
                && ordering != "ASC"
            {
                // ASC is default, don't need to specify
                spec.push_str(&format!(" {}", ordering));
            }

            // Add nulls ordering for btree indexes
            if let Some(ref nulls_ordering) = col.nulls_ordering
                && nulls_ordering != "NULLS LAST"
            {
                // NULLS LAST is default for ASC
                spec.push_str(&format!(" {}", nulls_ordering));
            }

            spec
        })
        .collect();
    sql.push_str(&column_specs.join(", "));
    sql.push(')');

    // INCLUDE columns for covering indexes
    if !index.include_columns.is_empty() {
        sql.push_str(" INCLUDE (");
        let include_specs: Vec<String> = index
            .include_columns
            .iter()
            .map(|col| quote_ident(col))
            .collect();
        sql.push_str(&include_specs.join(", "));
        sql.push(')');
    }

    // WITH storage parameters
    if !index.storage_parameters.is_empty() {
        sql.push_str(" WITH (");
        let param_specs: Vec<String> = index
            .storage_parameters
            .iter()
            .map(|(key, value)| format!("{} = {}", key, value))
            .collect();
        sql.push_str(&param_specs.join(", "));
        sql.push(')');
    }

    // TABLESPACE
    if let Some(ref tablespace) = index.tablespace {
        sql.push_str(&format!(" TABLESPACE {}", quote_ident(tablespace)));
    }

    // WHERE predicate for partial indexes
    if let Some(ref predicate) = index.predicate {
        sql.push_str(&format!(" WHERE {}", predicate));
    }

    sql.push(';');

    sql
}
