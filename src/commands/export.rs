//! pgdiff export - write the dev database's schema out as grouped SQL files.

use crate::catalog::Catalog;
use crate::config::{Config, ExportModeInput, ObjectFilter};
use crate::export::{ExportMode, ExportOptions, Exporter};
use anyhow::Result;
use sqlx::PgPool;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct ExportArgs {
    pub output_dir: PathBuf,
    pub simple: bool,
}

// root_dir is unused here: export reads the dev database directly, not schema
// files, so there's nothing to resolve relative to the config file's directory.
// Kept in the signature so main.rs can dispatch every subcommand uniformly.
pub async fn cmd_export(config: &Config, _root_dir: &Path, args: ExportArgs) -> Result<()> {
    eprintln!("Loading dev database...");
    let dev_pool = PgPool::connect(&config.databases.dev).await?;
    let dev_catalog = Catalog::load(&dev_pool).await?;

    let filter = ObjectFilter::new(&config.objects, &config.migration.tracking_table);
    let catalog = filter.filter_catalog(dev_catalog);

    let mode = if args.simple {
        ExportMode::Simple
    } else {
        match config.export.mode {
            ExportModeInput::Simple => ExportMode::Simple,
            ExportModeInput::Detailed => ExportMode::Detailed,
        }
    };

    let options = ExportOptions {
        mode,
        order_prefix: config.export.order_prefix,
        ..ExportOptions::default()
    };

    let exporter = Exporter::new(catalog, args.output_dir.clone(), options);
    exporter.generate_files()?;

    println!("Exported schema files to {}", args.output_dir.display());
    Ok(())
}
