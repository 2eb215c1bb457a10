mod catalog;
mod commands;
mod config;
mod db;
mod diff;
mod docker;
mod export;
mod plan;
mod render;
mod schema_loader;
mod schema_ops;
mod validation;
mod validation_output;

use crate::commands::diff_output::DiffFormat;
use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(long, default_value = "pgdiff.yaml", global = true)]
    config_file: String,

    /// Enable verbose output (info level)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress all non-essential output (error level only)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug output (debug level)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments for pgdiff diff (schema vs dev)
#[derive(Parser, Debug)]
pub struct DiffArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "detailed")]
    pub format: DiffFormat,

    /// Save SQL output to file
    #[arg(long)]
    pub output_sql: Option<String>,

    #[command(flatten)]
    pub database_args: config::DatabaseArgs,

    #[command(flatten)]
    pub directory_args: config::DirectoryArgs,
}

/// Arguments for pgdiff plan
#[derive(Parser, Debug)]
pub struct PlanCliArgs {
    /// Allow the plan to be produced even when it contains destructive
    /// (data-loss) statements
    #[arg(long)]
    pub allow_data_loss: bool,

    #[command(flatten)]
    pub database_args: config::DatabaseArgs,

    #[command(flatten)]
    pub directory_args: config::DirectoryArgs,
}

/// Arguments for pgdiff export
#[derive(Parser, Debug)]
pub struct ExportCliArgs {
    /// Directory to write grouped SQL files into
    #[arg(long, default_value = "export")]
    pub output_dir: std::path::PathBuf,

    /// Co-locate tables/views/functions/procedures/aggregates in one file per object cluster
    #[arg(long)]
    pub simple: bool,

    #[command(flatten)]
    pub database_args: config::DatabaseArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare schema files with dev database (preview what apply would do)
    Diff(DiffArgs),

    /// Produce the declarative plan envelope for the dev database moving to the current schema files
    Plan(PlanCliArgs),

    /// Write the dev database's schema out as grouped SQL files
    Export(ExportCliArgs),

    /// Validate schema consistency
    Validate,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: Option<commands::config::ConfigCommands>,
    },

    /// Debug commands for troubleshooting
    Debug {
        #[command(subcommand)]
        command: DebugCommands,
    },
}

#[derive(Subcommand)]
enum DebugCommands {
    /// Show object dependencies (intrinsic from PostgreSQL + augmented from -- require:)
    Dependencies {
        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: DebugOutputFormat,

        /// Filter to specific object (e.g., "public.users" or "Table:public.users")
        #[arg(long)]
        object: Option<String>,

        #[command(flatten)]
        directory_args: config::DirectoryArgs,
    },
}

#[derive(clap::ValueEnum, Clone, Debug, PartialEq)]
pub enum DebugOutputFormat {
    /// JSON output for piping to jq
    Json,
    /// Human-readable text format
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    initialize_logging(&cli);
    let result = tokio::select! {
        result = run_main(cli) => result,
        _ = wait_for_shutdown_signal() => {
            info!("Received shutdown signal, cleaning up...");
            Ok(())
        }
    };

    if let Err(e) = docker::cleanup_all_containers().await {
        eprintln!("Warning: Failed to cleanup Docker containers: {}", e);
    }

    result
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn initialize_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn" // default level
    };

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level)
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

async fn run_main(cli: Cli) -> Result<()> {
    let (file_config, root_dir) = config::load_config(&cli.config_file)?;

    match &cli.command {
        Commands::Diff(args) => {
                    let cli_config = config::ConfigInput {
                        databases: Some(args.database_args.clone().into()),
                        directories: Some(args.directory_args.clone().into()),
                        objects: None,
                        migration: None,
                        export: None,
                        schema: None,
                        docker: None,
                    };

                    let config = config::ConfigBuilder::new()
                        .with_file(file_config.clone())
                        .with_cli_args(cli_config)
                        .resolve()?;

                    let diff_args = commands::diff::DiffArgs {
                        format: args.format.clone(),
                        output_sql: args.output_sql.clone(),
                    };

                    info!("Comparing schema files with dev database");
                    commands::cmd_diff(&config, &root_dir, diff_args).await
                }
                Commands::Plan(args) => {
                    let cli_config = config::ConfigInput {
                        databases: Some(args.database_args.clone().into()),
                        directories: Some(args.directory_args.clone().into()),
                        objects: None,
                        migration: None,
                        export: None,
                        schema: None,
                        docker: None,
                    };

                    let config = config::ConfigBuilder::new()
                        .with_file(file_config.clone())
                        .with_cli_args(cli_config)
                        .resolve()?;

                    info!("Building plan from dev database to schema files");
                    commands::cmd_plan(
                        &config,
                        &root_dir,
                        commands::PlanArgs {
                            allow_data_loss: args.allow_data_loss,
                        },
                    )
                    .await
                }
                Commands::Export(args) => {
                    let cli_config = config::ConfigInput {
                        databases: Some(args.database_args.clone().into()),
                        directories: None,
                        objects: None,
                        migration: None,
                        export: None,
                        schema: None,
                        docker: None,
                    };

                    let config = config::ConfigBuilder::new()
                        .with_file(file_config.clone())
                        .with_cli_args(cli_config)
                        .resolve()?;

                    info!("Exporting dev database schema to grouped SQL files");
                    commands::cmd_export(
                        &config,
                        &root_dir,
                        commands::ExportArgs {
                            output_dir: args.output_dir.clone(),
                            simple: args.simple,
                        },
                    )
                    .await
                }
                Commands::Validate => {
                    let config = config::ConfigBuilder::new()
                        .with_file(file_config.clone())
                        .resolve()?;

                    info!("Validating schema consistency");
                    commands::cmd_validate(&config, &root_dir).await
                }
                Commands::Config { command } => {
                    match &command {
                        Some(_) => {
                            // Don't load config file for config commands, use the raw file path
                            let (file_config, _) = config::load_config(&cli.config_file)?;
                            let config = config::ConfigBuilder::new()
                                .with_file(file_config.clone())
                                .resolve()?;

                            info!("Managing configuration");
                            commands::cmd_config(&config, command.clone()).await
                        }
                        None => {
                            // Just show help for config command
                            let config = config::ConfigBuilder::new()
                                .with_file(file_config.clone())
                                .resolve()?;
                            commands::cmd_config(&config, None).await
                        }
                    }
                }
                Commands::Debug { command } => match command {
                    DebugCommands::Dependencies {
                        format,
                        object,
                        directory_args,
                    } => {
                        let cli_config = config::ConfigInput {
                            databases: None,
                            directories: Some(directory_args.clone().into()),
                            objects: None,
                            migration: None,
                            export: None,
                            schema: None,
                            docker: None,
                        };

                        let config = config::ConfigBuilder::new()
                            .with_file(file_config.clone())
                            .with_cli_args(cli_config)
                            .resolve()?;

                        info!("Analyzing dependencies");
                        let output_format = match format {
                            DebugOutputFormat::Json => commands::debug::OutputFormat::Json,
                            DebugOutputFormat::Text => commands::debug::OutputFormat::Text,
                        };
                        commands::cmd_debug_dependencies(
                            &config,
                            &root_dir,
                            output_format,
                            object.as_deref(),
                        )
                        .await
                    }
                },
    }
}
