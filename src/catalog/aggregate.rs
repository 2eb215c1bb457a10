use anyhow::Result;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{StableId, DependsOn};
use super::utils::is_system_schema;

/// Represents a PostgreSQL aggregate function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub schema: String,
    pub name: String,
    /// Formatted argument types (e.g., "integer, text")
    pub arguments: String,
    /// State transition type (STYPE)
    pub state_type: String,
    pub state_type_schema: String,
    /// State transition function (SFUNC)
    pub state_func: String,
    pub state_func_schema: String,
    /// Final function (FINALFUNC), optional
    pub final_func: Option<String>,
    pub final_func_schema: Option<String>,
    /// Combine function for parallel aggregation (COMBINEFUNC), optional
    pub combine_func: Option<String>,
    pub combine_func_schema: Option<String>,
    /// State value serializer, used when the state type is `internal` and the
    /// aggregate supports parallel aggregation (SERIALFUNC), optional
    pub serial_func: Option<String>,
    pub serial_func_schema: Option<String>,
    /// State value deserializer (DESERIALFUNC), optional
    pub deserial_func: Option<String>,
    pub deserial_func_schema: Option<String>,
    /// Initial state value (INITCOND), optional
    pub initial_value: Option<String>,
    /// The aggregate's declared return type
    pub return_type: String,
    pub return_type_schema: String,
    /// `proparallel` of the aggregate function itself: 's' safe, 'r'
    /// restricted, 'u' unsafe
    pub parallel_safety: String,
    /// `proisstrict` of the aggregate function
    pub is_strict: bool,
    /// True for `aggkind = 'h'` (hypothetical-set aggregates such as `rank`)
    pub is_hypothetical: bool,
    /// Sort operator for MIN/MAX-style aggregates (aggsortop), optional
    pub sort_operator: Option<String>,
    pub sort_operator_schema: Option<String>,
    /// Complete CREATE AGGREGATE statement (reconstructed)
    pub definition: String,
    pub comment: Option<String>,
    pub depends_on: Vec<StableId>,
}

impl Aggregate {
    pub fn id(&self) -> StableId {
        StableId::Aggregate {
            schema: self.schema.clone(),
            name: self.name.clone(),
            arguments: self.arguments.clone(),
        }
    }
}

impl DependsOn for Aggregate {
    fn id(&self) -> StableId {
        StableId::Aggregate {
            schema: self.schema.clone(),
            name: self.name.clone(),
            arguments: self.arguments.clone(),
        }
    }

    fn depends_on(&self) -> &[StableId] {
        &self.depends_on
    }
}

impl Commentable for Aggregate {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

/// Fetch all user-defined aggregate functions from the database
pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<Aggregate>> {
    info!("Fetching aggregates...");
    let rows = sqlx::query!(
        r#"
        SELECT
            n.nspname AS "schema!",
            p.proname AS "name!",
            pg_catalog.pg_get_function_identity_arguments(p.oid) AS "arguments!",

            -- State type (STYPE) - resolve array element type if applicable
            CASE
                WHEN st.typelem != 0 THEN elem_st.typname
                ELSE st.typname
            END AS "state_type!",
            CASE
                WHEN st.typelem != 0 THEN elem_stn.nspname
                ELSE stn.nspname
            END AS "state_type_schema!",

            -- State transition function (SFUNC)
            tfunc.proname AS "state_func!",
            tfns.nspname AS "state_func_schema!",
            pg_catalog.pg_get_function_identity_arguments(tfunc.oid) AS "state_func_args!",

            -- Final function (FINALFUNC) - optional
            ffunc.proname AS "final_func?",
            ffns.nspname AS "final_func_schema?",
            pg_catalog.pg_get_function_identity_arguments(ffunc.oid) AS "final_func_args?",

            -- Combine function for parallel aggregation (COMBINEFUNC) - optional
            cfunc.proname AS "combine_func?",
            cfns.nspname AS "combine_func_schema?",
            pg_catalog.pg_get_function_identity_arguments(cfunc.oid) AS "combine_func_args?",

            -- State serializer/deserializer for parallel aggregation - optional
            sfunc2.proname AS "serial_func?",
            sfns.nspname AS "serial_func_schema?",
            pg_catalog.pg_get_function_identity_arguments(sfunc2.oid) AS "serial_func_args?",
            dfunc.proname AS "deserial_func?",
            dfns.nspname AS "deserial_func_schema?",
            pg_catalog.pg_get_function_identity_arguments(dfunc.oid) AS "deserial_func_args?",

            -- Initial value (INITCOND) - optional
            agg.agginitval AS "initial_value?",

            -- Declared return type of the aggregate
            rt.typname AS "return_type!",
            rtn.nspname AS "return_type_schema!",

            -- Function-level properties that cannot be altered without a drop/create
            p.proparallel::text AS "parallel_safety!",
            p.proisstrict AS "is_strict!",
            (agg.aggkind = 'h') AS "is_hypothetical!",

            -- Sort operator for MIN/MAX-style aggregates - optional
            sortop.oprname AS "sort_operator?",
            sortopn.nspname AS "sort_operator_schema?",

            -- Comment
            d.description AS "comment?"

        FROM pg_aggregate agg
        JOIN pg_proc p ON agg.aggfnoid = p.oid
        JOIN pg_namespace n ON p.pronamespace = n.oid

        -- State type
        JOIN pg_type st ON agg.aggtranstype = st.oid
        JOIN pg_namespace stn ON st.typnamespace = stn.oid
        -- Element type for array state types
        LEFT JOIN pg_type elem_st ON st.typelem = elem_st.oid AND st.typelem != 0
        LEFT JOIN pg_namespace elem_stn ON elem_st.typnamespace = elem_stn.oid

        -- Return type
        JOIN pg_type rt ON p.prorettype = rt.oid
        JOIN pg_namespace rtn ON rt.typnamespace = rtn.oid

        -- State transition function
        JOIN pg_proc tfunc ON agg.aggtransfn = tfunc.oid
        JOIN pg_namespace tfns ON tfunc.pronamespace = tfns.oid

        -- Final function (optional)
        LEFT JOIN pg_proc ffunc ON agg.aggfinalfn = ffunc.oid AND agg.aggfinalfn != 0
        LEFT JOIN pg_namespace ffns ON ffunc.pronamespace = ffns.oid

        -- Combine function (optional)
        LEFT JOIN pg_proc cfunc ON agg.aggcombinefn = cfunc.oid AND agg.aggcombinefn != 0
        LEFT JOIN pg_namespace cfns ON cfunc.pronamespace = cfns.oid

        -- Serializer/deserializer functions (optional)
        LEFT JOIN pg_proc sfunc2 ON agg.aggserialfn = sfunc2.oid AND agg.aggserialfn != 0
        LEFT JOIN pg_namespace sfns ON sfunc2.pronamespace = sfns.oid
        LEFT JOIN pg_proc dfunc ON agg.aggdeserialfn = dfunc.oid AND agg.aggdeserialfn != 0
        LEFT JOIN pg_namespace dfns ON dfunc.pronamespace = dfns.oid

        -- Sort operator (optional)
        LEFT JOIN pg_operator sortop ON agg.aggsortop = sortop.oid AND agg.aggsortop != 0
        LEFT JOIN pg_namespace sortopn ON sortop.oprnamespace = sortopn.oid

        -- Comment
        LEFT JOIN pg_description d ON d.objoid = p.oid AND d.objsubid = 0

        WHERE n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
        -- Exclude aggregates that belong to extensions
        AND NOT EXISTS (
            SELECT 1 FROM pg_depend dep
            WHERE dep.objid = p.oid
            AND dep.deptype = 'e'
        )

        ORDER BY n.nspname, p.proname
        "#
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut aggregates = Vec::new();

    for row in rows {
        // Build dependencies directly (like triggers.rs)
        let mut depends_on = vec![
            // All objects depend on their schema
            StableId::Schema {
                name: row.schema.clone(),
            },
        ];

        // Depend on state transition function
        if !is_system_schema(&row.state_func_schema) {
            depends_on.push(StableId::Function {
                schema: row.state_func_schema.clone(),
                name: row.state_func.clone(),
                arguments: row.state_func_args.clone(),
            });
        }

        // Depend on final function if present
        if let (Some(ffunc), Some(ffunc_schema), Some(ffunc_args)) = (
            &row.final_func,
            &row.final_func_schema,
            &row.final_func_args,
        ) && !is_system_schema(ffunc_schema)
        {
            depends_on.push(StableId::Function {
                schema: ffunc_schema.to_string(),
                name: ffunc.to_string(),
                arguments: ffunc_args.to_string(),
            });
        }

        // Depend on serializer function if present
        if let (Some(sfunc), Some(sfunc_schema), Some(sfunc_args)) = (
            &row.serial_func,
            &row.serial_func_schema,
            &row.serial_func_args,
        ) && !is_system_schema(sfunc_schema)
        {
            depends_on.push(StableId::Function {
                schema: sfunc_schema.to_string(),
                name: sfunc.to_string(),
                arguments: sfunc_args.to_string(),
            });
        }

        // Depend on deserializer function if present
        if let (Some(dfunc), Some(dfunc_schema), Some(dfunc_args)) = (
            &row.deserial_func,
            &row.deserial_func_schema,
            &row.deserial_func_args,
        ) && !is_system_schema(dfunc_schema)
        {
            depends_on.push(StableId::Function {
                schema: dfunc_schema.to_string(),
                name: dfunc.to_string(),
                arguments: dfunc_args.to_string(),
            });
        }

        // Depend on combine function if present
        if let (Some(cfunc), Some(cfunc_schema), Some(cfunc_args)) = (
            &row.combine_func,
            &row.combine_func_schema,
            &row.combine_func_args,
        ) && !is_system_schema(cfunc_schema)
        {
            depends_on.push(StableId::Function {
                schema: cfunc_schema.to_string(),
                name: cfunc.to_string(),
                arguments: cfunc_args.to_string(),
            });
        }

        // Depend on state type if it's a custom type
        if !is_system_schema(&row.state_type_schema) {
            depends_on.push(StableId::Type {
                schema: row.state_type_schema.clone(),
                name: row.state_type.clone(),
            });
        }

        // Reconstruct the CREATE AGGREGATE definition
        let definition = build_aggregate_definition(
            &row.schema,
            &row.name,
            &row.arguments,
            &row.state_func_schema,
            &row.state_func,
            &row.state_type_schema,
            &row.state_type,
            row.final_func.as_deref(),
            row.final_func_schema.as_deref(),
            row.combine_func.as_deref(),
            row.combine_func_schema.as_deref(),
            row.serial_func.as_deref(),
            row.serial_func_schema.as_deref(),
            row.deserial_func.as_deref(),
            row.deserial_func_schema.as_deref(),
            row.initial_value.as_deref(),
            row.sort_operator.as_deref(),
            row.sort_operator_schema.as_deref(),
        );

        aggregates.push(Aggregate {
            schema: row.schema,
            name: row.name,
            arguments: row.arguments,
            state_type: row.state_type,
            state_type_schema: row.state_type_schema,
            state_func: row.state_func,
            state_func_schema: row.state_func_schema,
            final_func: row.final_func,
            final_func_schema: row.final_func_schema,
            combine_func: row.combine_func,
            combine_func_schema: row.combine_func_schema,
            serial_func: row.serial_func,
            serial_func_schema: row.serial_func_schema,
            deserial_func: row.deserial_func,
            deserial_func_schema: row.deserial_func_schema,
            initial_value: row.initial_value,
            return_type: row.return_type,
            return_type_schema: row.return_type_schema,
            parallel_safety: row.parallel_safety,
            is_strict: row.is_strict,
            is_hypothetical: row.is_hypothetical,
            sort_operator: row.sort_operator,
            sort_operator_schema: row.sort_operator_schema,
            definition,
            comment: row.comment,
            depends_on,
        });
    }

    Ok(aggregates)
}

/// Build a CREATE AGGREGATE statement from the component parts
#[allow(clippy::too_many_arguments)]
fn build_aggregate_definition(
    schema: &str,
    name: &str,
    arguments: &str,
    state_func_schema: &str,
    state_func: &str,
    state_type_schema: &str,
    state_type: &str,
    final_func: Option<&str>,
    final_func_schema: Option<&str>,
    combine_func: Option<&str>,
    combine_func_schema: Option<&str>,
    serial_func: Option<&str>,
    serial_func_schema: Option<&str>,
    deserial_func: Option<&str>,
    deserial_func_schema: Option<&str>,
    initial_value: Option<&str>,
    sort_operator: Option<&str>,
    sort_operator_schema: Option<&str>,
) -> String {
    let mut parts = Vec::new();

    // SFUNC - state transition function
    let sfunc_qualified = if is_system_schema(state_func_schema) {
        state_func.to_string()
    } else {
        format!("{}.{}", state_func_schema, state_func)
    };
    parts.push(format!("SFUNC = {}", sfunc_qualified));

    // STYPE - state type
    let stype_qualified = if is_system_schema(state_type_schema) {
        state_type.to_string()
    } else {
        format!("{}.{}", state_type_schema, state_type)
    };
    parts.push(format!("STYPE = {}", stype_qualified));

    // FINALFUNC - optional
    if let (Some(ffunc), Some(ffunc_schema)) = (final_func, final_func_schema) {
        let ffunc_qualified = if is_system_schema(ffunc_schema) {
            ffunc.to_string()
        } else {
            format!("{}.{}", ffunc_schema, ffunc)
        };
        parts.push(format!("FINALFUNC = {}", ffunc_qualified));
    }

    // COMBINEFUNC - optional (for parallel aggregation)
    if let (Some(cfunc), Some(cfunc_schema)) = (combine_func, combine_func_schema) {
        let cfunc_qualified = if is_system_schema(cfunc_schema) {
            cfunc.to_string()
        } else {
            format!("{}.{}", cfunc_schema, cfunc)
        };
        parts.push(format!("COMBINEFUNC = {}", cfunc_qualified));
    }

    // SERIALFUNC / DESERIALFUNC - optional (for parallel aggregation with internal state)
    if let (Some(sfunc), Some(sfunc_schema)) = (serial_func, serial_func_schema) {
        let sfunc_qualified = if is_system_schema(sfunc_schema) {
            sfunc.to_string()
        } else {
            format!("{}.{}", sfunc_schema, sfunc)
        };
        parts.push(format!("SERIALFUNC = {}", sfunc_qualified));
    }
    if let (Some(dfunc), Some(dfunc_schema)) = (deserial_func, deserial_func_schema) {
        let dfunc_qualified = if is_system_schema(dfunc_schema) {
            dfunc.to_string()
        } else {
            format!("{}.{}", dfunc_schema, dfunc)
        };
        parts.push(format!("DESERIALFUNC = {}", dfunc_qualified));
    }

    // INITCOND - optional
    if let Some(initval) = initial_value {
        // Quote the initial value as it's stored as text
        parts.push(format!("INITCOND = '{}'", initval.replace('\'', "''")));
    }

    // SORTOP - optional
    if let (Some(sortop), Some(sortop_schema)) = (sort_operator, sort_operator_schema) {
        let sortop_qualified = if is_system_schema(sortop_schema) {
            sortop.to_string()
        } else {
            format!("OPERATOR({}.{})", sortop_schema, sortop)
        };
        parts.push(format!("SORTOP = {}", sortop_qualified));
    }

    format!(
        "CREATE AGGREGATE {}.{}({}) (\n    {}\n)",
        schema,
        name,
        arguments,
        parts.join(",\n    ")
    )
}
