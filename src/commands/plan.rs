//! pgdiff plan - produce the declarative plan envelope for the dev database
//! moving to the current schema files (version 1, `mode: "declarative"`).

use crate::catalog::Catalog;
use crate::config::{Config, ObjectFilter};
use crate::plan::{PlanOptions, build_plan};
use crate::schema_ops::apply_current_schema_to_shadow;
use anyhow::{Result, bail};
use sqlx::PgPool;
use std::path::Path;

#[derive(Debug, Default)]
pub struct PlanArgs {
    /// Allow the plan to be produced even when it contains destructive
    /// (data-loss) statements. Without this, a data-loss plan is still
    /// written but the command exits non-zero so CI can gate on it.
    pub allow_data_loss: bool,
}

pub async fn cmd_plan(config: &Config, root_dir: &Path, args: PlanArgs) -> Result<()> {
    eprintln!("Loading schema files...");
    let schema_catalog = apply_current_schema_to_shadow(config, root_dir).await?;

    eprintln!("Loading dev database...");
    let dev_pool = PgPool::connect(&config.databases.dev).await?;
    let dev_catalog = Catalog::load(&dev_pool).await?;

    let filter = ObjectFilter::new(&config.objects, &config.migration.tracking_table);
    let source = filter.filter_catalog(dev_catalog);
    let target = filter.filter_catalog(schema_catalog);

    let generated_at = chrono::Utc::now().to_rfc3339();
    let plan = build_plan(&source, &target, &PlanOptions::default(), generated_at)?;

    let json = serde_json::to_string_pretty(&plan)?;
    println!("{}", json);

    if let Some(risk) = &plan.risk
        && !args.allow_data_loss
    {
        eprintln!(
            "\nplan contains {} destructive statement(s); rerun with --allow-data-loss to accept",
            risk.statements.len()
        );
        bail!("plan requires explicit data-loss acknowledgement");
    }

    Ok(())
}
