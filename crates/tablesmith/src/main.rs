//! tablesmith CLI
//!
//! Plans and applies table changes described by JSON definitions.

use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use tablesmith::prelude::*;

/// Reconcile database tables with JSON definitions.
#[derive(Parser)]
#[command(name = "tablesmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// SQL dialect to plan for (sqlite, mariadb, postgresql).
    #[arg(long, env = "TABLESMITH_DIALECT", default_value = "sqlite")]
    dialect: Dialect,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the statements that turn one definition into another.
    Plan {
        /// Definition of the table as it exists (create if not given).
        #[arg(long)]
        original: Option<PathBuf>,

        /// Definition of the table as it should be.
        #[arg(long)]
        current: PathBuf,
    },

    /// Create or alter a table to match a definition.
    Apply {
        /// Definition of the table as it should be.
        #[arg(long)]
        current: PathBuf,

        /// Show SQL without executing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a table as a JSON definition.
    Inspect {
        /// Table name.
        table: String,
    },

    /// Drop a table.
    Drop {
        /// Table name.
        table: String,
    },

    /// List the dialect's datatypes and index types.
    Catalog,
}

fn main() -> anyhow::Result<()> {
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

    let context = cli.dialect.context();

    match cli.command {
        Commands::Plan { original, current } => {
            let current = TableDefinition::load(&current)?;
            let plan = match original {
                Some(path) => {
                    let original = TableDefinition::load(&path)?.resolve(context.as_ref(), None)?;
                    let current = current.resolve(context.as_ref(), Some(&original))?;
                    context.plan_alter(&original, &current, &[])?
                }
                None => context.plan_create(&current.resolve(context.as_ref(), None)?)?,
            };
            print_plan(&plan);
        }

        Commands::Apply { current, dry_run } => {
            require_sqlite(cli.dialect)?;
            let definition = TableDefinition::load(&current)?;
            let mut session = SqliteSession::connect(&cli.database)?;
            let baseline = load_table(&mut session, definition.existing_name())?;
            let table = definition.resolve(context.as_ref(), baseline.as_ref())?;

            let mut editor = match baseline {
                Some(baseline) => TableEditor::open(context, baseline),
                None => TableEditor::create(context, &table.name),
            };
            editor.set_current(table);

            if dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
                let taken = session.table_names()?;
                print_plan(&editor.plan(&taken)?);
            } else {
                let log = MemoryLog::new();
                let result = editor.save(&mut session, &log);
                for entry in log.entries() {
                    println!("{entry}");
                }
                result?;
            }
            session.close()?;
        }

        Commands::Inspect { table } => {
            require_sqlite(cli.dialect)?;
            let mut session = SqliteSession::connect(&cli.database)?;
            let Some(found) = load_table(&mut session, &table)? else {
                return Err(tablesmith::Error::TableNotFound(table).into());
            };
            println!("{}", TableDefinition::from_table(&found).to_json()?);
            session.close()?;
        }

        Commands::Drop { table } => {
            require_sqlite(cli.dialect)?;
            let mut session = SqliteSession::connect(&cli.database)?;
            let Some(found) = load_table(&mut session, &table)? else {
                return Err(tablesmith::Error::TableNotFound(table).into());
            };
            let log = MemoryLog::new();
            TableEditor::open(context, found).drop(&mut session, &log)?;
            for entry in log.entries() {
                println!("{entry}");
            }
            session.close()?;
        }

        Commands::Catalog => {
            println!("\nDatatypes ({}):", cli.dialect);
            println!("{:-<60}", "");
            for datatype in context.datatypes().get_all() {
                let aliases = if datatype.aliases.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", datatype.aliases.join(", "))
                };
                println!(
                    " {:<20} {:<10}{aliases}",
                    datatype.name,
                    datatype.category.as_str()
                );
            }
            println!("\nIndex types:");
            println!("{:-<60}", "");
            for index_type in context.index_types().get_all() {
                println!(" {}", index_type.name);
            }
            println!();
        }
    }

    Ok(())
}

fn require_sqlite(dialect: Dialect) -> anyhow::Result<()> {
    if dialect != Dialect::Sqlite {
        bail!("only the sqlite dialect can connect to a database; use `plan` for {dialect}");
    }
    Ok(())
}

fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        info!("No changes.");
        return;
    }
    info!(strategy = %plan.strategy, "Planned");
    print!("{plan}");
}
