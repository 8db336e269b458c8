//! oxide-forward CLI
//!
//! Command-line tool for generating DDL from schema models and applying it.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use oxide_forward::dialect::BUILTIN_DIALECTS;
use oxide_forward::prelude::*;

/// Forward-engineer schema models into dialect-specific DDL.
#[derive(Parser)]
#[command(name = "oxide-forward")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL of the target (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL")]
    database: Option<String>,

    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Dialect and naming options shared by every command that generates DDL.
#[derive(clap::Args)]
struct GenerateArgs {
    /// Schema model (JSON).
    model: PathBuf,

    /// Built-in dialect name.
    #[arg(long)]
    dialect: Option<String>,

    /// Custom dialect definition (JSON).
    #[arg(long)]
    dialect_file: Option<PathBuf>,

    /// Schema to qualify object names with.
    #[arg(long)]
    schema_name: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the DDL script for a model.
    Generate {
        #[command(flatten)]
        args: GenerateArgs,

        /// Write the script to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate the DDL and apply it to the target database.
    Forward {
        #[command(flatten)]
        args: GenerateArgs,

        /// Drop conflicting objects without asking.
        #[arg(short, long, conflicts_with = "keep_conflicts")]
        yes: bool,

        /// Leave conflicting objects in place.
        #[arg(long)]
        keep_conflicts: bool,

        /// Show conflicts and SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// List the built-in dialects.
    Dialects,
}

/// Asks on the terminal what to do with conflicts.
struct PromptApproval;

#[async_trait]
impl ApprovalGate for PromptApproval {
    async fn approve(&self, conflicts: &[ConflictRecord], drops: &[PlannedDrop]) -> Approval {
        println!("\nConflicting objects ({}):", conflicts.len());
        println!("{:-<60}", "");
        for conflict in conflicts {
            print!("{}", conflict.tree());
        }
        println!("\nWould drop:");
        for drop in drops {
            println!(" {}", drop.statement);
        }
        println!();

        let answer = tokio::task::spawn_blocking(|| {
            print!("Drop these objects? [y]es / [n]o, keep them / [c]ancel: ");
            std::io::stdout().flush().ok();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => match line.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => Approval::Drop,
                "n" | "no" => Approval::Keep,
                _ => Approval::Cancel,
            },
            _ => Approval::Cancel,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &cli.config {
        Some(path) => ForwardConfig::from_file(path)?,
        None => ForwardConfig::default(),
    };
    if cli.database.is_some() {
        config.database_url = cli.database.clone();
    }

    match cli.command {
        Commands::Dialects => {
            println!("\nBuilt-in dialects:");
            println!("{:-<60}", "");
            for name in BUILTIN_DIALECTS {
                let dialect = Dialect::builtin(name)?;
                println!(
                    " {:<12} max identifier length: {}",
                    dialect.name,
                    dialect
                        .identifiers
                        .max_length
                        .map_or_else(|| "unlimited".to_string(), |n| n.to_string())
                );
            }
            println!();
        }

        Commands::Generate { args, output } => {
            let generator = generate(&args, &mut config)?;
            let script = generator.script();
            match output {
                Some(path) => {
                    std::fs::write(&path, format!("{script}\n"))?;
                    info!("Wrote script: {}", path.display());
                }
                None => println!("{script}"),
            }
            print_warnings(&generator);
        }

        Commands::Forward {
            args,
            yes,
            keep_conflicts,
            dry_run,
        } => {
            let generator = generate(&args, &mut config)?;
            print_warnings(&generator);

            if yes {
                config.drop_policy = DropPolicy::Always;
            } else if keep_conflicts {
                config.drop_policy = DropPolicy::Never;
            }

            let Some(url) = config.database_url.as_deref() else {
                anyhow::bail!("no target database: pass --database or set DATABASE_URL");
            };
            let target = Arc::new(SqliteTarget::connect(url).await?);

            if dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
                let mut resolver = ConflictResolver::new(
                    target,
                    generator.dialect().clone(),
                    generator.statements(),
                );
                resolver.find_conflicting().await?;
                if resolver.is_empty() {
                    println!("\nNo conflicting objects.");
                } else {
                    println!("\nConflicting objects:");
                    println!("{:-<60}", "");
                    print!("{}", resolver.conflict_tree());
                    println!("\nWould drop:");
                    for drop in resolver.drop_statements()? {
                        println!(" {}", drop.statement);
                    }
                }
                println!("\n{}", generator.script());
                return Ok(());
            }

            let pipeline = ForwardPipeline::new(target, &generator);
            let cancel = pipeline.cancel_flag();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling");
                    cancel.cancel();
                }
            });

            let report = match config.drop_policy {
                DropPolicy::Ask => pipeline.run(&PromptApproval).await,
                DropPolicy::Always => pipeline.run(&FixedApproval(Approval::Drop)).await,
                DropPolicy::Never => pipeline.run(&FixedApproval(Approval::Keep)).await,
            };

            match report.outcome {
                PipelineOutcome::Completed => info!(
                    dropped = report.resolve.progress,
                    executed = report.execute.progress,
                    "Forward engineering completed"
                ),
                PipelineOutcome::Cancelled { stage } => {
                    warn!(%stage, "Forward engineering cancelled");
                }
                PipelineOutcome::Failed { stage, error } => {
                    anyhow::bail!("{stage} stage failed: {error}");
                }
            }
        }
    }

    Ok(())
}

/// Loads the model and dialect and runs the generator.
fn generate(args: &GenerateArgs, config: &mut ForwardConfig) -> anyhow::Result<DdlGenerator> {
    if args.dialect_file.is_some() {
        config.dialect_file.clone_from(&args.dialect_file);
    } else if args.dialect.is_some() {
        config.dialect_file = None;
        config.dialect.clone_from(&args.dialect);
    }
    if args.schema_name.is_some() {
        config.target_schema.clone_from(&args.schema_name);
    }

    let schema = DatabaseSchema::from_file(&args.model)?;
    let mut generator = DdlGenerator::new(config.load_dialect()?);
    generator.set_target_schema(config.target_schema.clone());
    generator.generate_ddl(&schema)?;

    for failure in generator.errors() {
        warn!(object = %failure.object, error = %failure.error, "Object skipped");
    }
    Ok(generator)
}

fn print_warnings(generator: &DdlGenerator) {
    if generator.warnings().is_empty() {
        return;
    }
    eprintln!("\nWarnings:");
    eprintln!("{:-<60}", "");
    for warning in generator.warnings() {
        eprintln!(
            " {} {}: {} -> {}",
            warning.reason, warning.subject, warning.old_value, warning.new_value
        );
    }
    eprintln!();
}
