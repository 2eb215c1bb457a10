//! src/catalog/materialized_view.rs
//! Fetch materialized views and their dependencies via pg_depend + pg_rewrite.
//!
//! Column types come straight from pg_attribute/format_type rather than
//! information_schema, since matviews never show up in
//! information_schema.views or information_schema.columns the way regular
//! views do.
use super::comments::Commentable;
use super::id::{DependsOn, StableId};
use super::utils::is_system_schema;
use anyhow::Result;
use sqlx::PgConnection;
use sqlx::postgres::types::Oid;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaterializedViewColumn {
    pub name: String,
    pub type_: String,
}

#[derive(Debug, Clone)]
pub struct MaterializedView {
    pub schema: String,
    pub name: String,
    pub definition: String, // raw `SELECT …` the matview was built from
    pub columns: Vec<MaterializedViewColumn>,
    /// `pg_class.relispopulated` — false right after `CREATE ... WITH NO DATA`.
    /// Not diffed: a REFRESH changes this without changing the matview's
    /// definition, so it carries no migration-step semantics.
    pub is_populated: bool,
    pub comment: Option<String>,
    pub depends_on: Vec<StableId>, // populated from pg_depend
}

impl MaterializedView {
    pub fn id(&self) -> StableId {
        StableId::MaterializedView {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }
}

impl DependsOn for MaterializedView {
    fn id(&self) -> StableId {
        StableId::MaterializedView {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    fn depends_on(&self) -> &[StableId] {
        &self.depends_on
    }
}

impl Commentable for MaterializedView {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

#[derive(sqlx::FromRow)]
struct RawMaterializedView {
    view_oid: Oid,
    schema: String,
    name: String,
    definition: String,
    is_populated: bool,
    comment: Option<String>,
}

/// Fetch all non-system materialized views, then populate `depends_on` via pg_depend.
pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<MaterializedView>> {
    let raw: Vec<RawMaterializedView> = sqlx::query_as!(
        RawMaterializedView,
        r#"
        SELECT
          c.oid                    AS "view_oid!",
          n.nspname                AS "schema!",
          c.relname                AS "name!",
          pg_catalog.pg_get_viewdef(c.oid, true) AS "definition!",
          c.relispopulated          AS "is_populated!",
          d.description            AS "comment?"
        FROM pg_class c
        JOIN pg_namespace n
          ON c.relnamespace = n.oid
        LEFT JOIN pg_description d ON d.objoid = c.oid AND d.objsubid = 0
        WHERE c.relkind = 'm'                             -- only materialized views
          AND n.nspname NOT IN ('pg_catalog','information_schema', 'pg_toast')
          -- Exclude matviews that belong to extensions
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = c.oid
              AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, c.relname
        "#
    )
    .fetch_all(&mut *conn)
    .await?;

    let column_rows = sqlx::query!(
        r#"
        SELECT
            n.nspname AS "schema!",
            c.relname AS "table_name!",
            a.attname AS "name!",
            pg_catalog.format_type(a.atttypid, a.atttypmod) AS "type_!"
        FROM pg_attribute a
        JOIN pg_class c ON a.attrelid = c.oid
        JOIN pg_namespace n ON c.relnamespace = n.oid
        WHERE c.relkind = 'm'
          AND a.attnum > 0
          AND NOT a.attisdropped
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
        ORDER BY a.attnum
        "#
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut columns_by_view: HashMap<(String, String), Vec<MaterializedViewColumn>> =
        HashMap::new();
    for col in column_rows {
        let key = (col.schema.clone(), col.table_name.clone());
        columns_by_view
            .entry(key)
            .or_default()
            .push(MaterializedViewColumn {
                name: col.name,
                type_: col.type_,
            });
    }

    let mut views: Vec<MaterializedView> = raw
        .iter()
        .map(|r| {
            let key = (r.schema.clone(), r.name.clone());
            let columns = columns_by_view.remove(&key).unwrap_or_default();

            MaterializedView {
                schema: r.schema.clone(),
                name: r.name.clone(),
                definition: r.definition.clone(),
                columns,
                is_populated: r.is_populated,
                comment: r.comment.clone(),
                depends_on: Vec::new(),
            }
        })
        .collect();

    let mut oid_to_idx: HashMap<Oid, usize> = HashMap::with_capacity(raw.len());
    let view_oids: Vec<Oid> = raw
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            oid_to_idx.insert(r.view_oid, i);
            r.view_oid
        })
        .collect();

    let deps = sqlx::query!(
        r#"
        SELECT
          r.ev_class                     AS "view_oid!",
          d.refclassid                   AS "refclassid!",
          d.refobjid                     AS "refobjid!",

          -- Table or view reference
          cls.relkind::text             AS "cls_relkind",
          cls_n.nspname                 AS "cls_schema",
          cls.relname                   AS "cls_name",

          -- Type reference
          typ.typname                   AS "typ_name",
          typ_n.nspname                 AS "typ_schema",
          (
            SELECT e.extname
            FROM pg_depend typ_dep
            JOIN pg_extension e ON typ_dep.refobjid = e.oid
            WHERE typ_dep.objid = typ.oid
            AND typ_dep.deptype = 'e'
            LIMIT 1
          ) AS "typ_extension_name?",

          -- Function reference
          proc.proname                  AS "proc_name",
          proc_n.nspname                AS "proc_schema",
          (
            SELECT e.extname
            FROM pg_depend proc_dep
            JOIN pg_extension e ON proc_dep.refobjid = e.oid
            WHERE proc_dep.objid = proc.oid
            AND proc_dep.deptype = 'e'
            LIMIT 1
          ) AS "proc_extension_name?"

        FROM pg_rewrite r
        JOIN pg_depend d
          ON d.classid = 'pg_rewrite'::regclass::oid
         AND d.objid    = r.oid

        -- Table/view reference
        LEFT JOIN pg_class cls
          ON d.refclassid = 'pg_class'::regclass::oid
         AND d.refobjid   = cls.oid

        LEFT JOIN pg_namespace cls_n
          ON cls.relnamespace = cls_n.oid

        -- Type reference
        LEFT JOIN pg_type typ
          ON d.refclassid = 'pg_type'::regclass::oid
         AND d.refobjid   = typ.oid

        LEFT JOIN pg_namespace typ_n
          ON typ.typnamespace = typ_n.oid

        -- Function reference
        LEFT JOIN pg_proc proc
          ON d.refclassid = 'pg_proc'::regclass::oid
         AND d.refobjid   = proc.oid

        LEFT JOIN pg_namespace proc_n
          ON proc.pronamespace = proc_n.oid

        WHERE r.ev_class = ANY($1)
        "#,
        &view_oids,
    )
    .fetch_all(&mut *conn)
    .await?;

    for d in deps {
        if let Some(&idx) = oid_to_idx.get(&d.view_oid) {
            let view_id = views[idx].id();
            let v = &mut views[idx].depends_on;

            if let Some(relkind) = d.cls_relkind.as_deref() {
                let dep = match relkind {
                    "r" | "p" => StableId::Table {
                        schema: d.cls_schema.unwrap(),
                        name: d.cls_name.unwrap(),
                    },
                    "v" => StableId::View {
                        schema: d.cls_schema.unwrap(),
                        name: d.cls_name.unwrap(),
                    },
                    "m" => StableId::MaterializedView {
                        schema: d.cls_schema.unwrap(),
                        name: d.cls_name.unwrap(),
                    },
                    _ => continue,
                };
                if dep != view_id {
                    v.push(dep);
                }
                continue;
            }

            if let (Some(name), Some(ns)) = (d.typ_name, d.typ_schema) {
                if !is_system_schema(&ns) {
                    if let Some(ext_name) = d.typ_extension_name {
                        v.push(StableId::Extension { name: ext_name });
                    } else {
                        let base_type_name = if name.starts_with('_') {
                            name.trim_start_matches('_').to_string()
                        } else {
                            name
                        };
                        v.push(StableId::Type {
                            schema: ns,
                            name: base_type_name,
                        });
                    }
                }
                continue;
            }

            if let (Some(name), Some(ns)) = (d.proc_name, d.proc_schema)
                && !is_system_schema(&ns)
            {
                if let Some(ext_name) = d.proc_extension_name {
                    v.push(StableId::Extension { name: ext_name });
                } else {
                    v.push(StableId::Function {
                        schema: ns.to_string(),
                        name: name.to_string(),
                        arguments: String::new(),
                    });
                }
            }
        }
    }

    for view in &mut views {
        let unique_deps: HashSet<_> = view.depends_on.drain(..).collect();
        view.depends_on.extend(unique_deps);

        if view.schema != "public" {
            view.depends_on.push(StableId::Schema {
                name: view.schema.clone(),
            });
        }
    }

    Ok(views)
}
