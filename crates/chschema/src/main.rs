//! chschema CLI
//!
//! Command-line tool for managing ClickHouse schemas declaratively.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use chschema::introspect::get_table;
use chschema::prelude::*;

/// Declarative schema management for ClickHouse.
#[derive(Parser)]
#[command(name = "chschema")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// URL of the ClickHouse HTTP interface.
    #[arg(long, env = "CLICKHOUSE_URL", default_value = "http://localhost:8123")]
    url: String,

    /// User name.
    #[arg(short, long, env = "CLICKHOUSE_USER", default_value = "default")]
    user: String,

    /// Password.
    #[arg(long, env = "CLICKHOUSE_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Database used for unqualified names.
    #[arg(short, long, env = "CLICKHOUSE_DATABASE", default_value = "default")]
    database: String,

    /// Request timeout in seconds, also the server-side execution limit.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: u64,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the statements needed to reach the desired state.
    Plan {
        /// State file.
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Bring the server to the desired state.
    Apply {
        /// State file.
        #[arg(short, long)]
        file: PathBuf,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the current schema of a table as JSON.
    ShowTable {
        /// Table as `database.table`, or `table` in the default database.
        table: String,
    },

    /// Drop a table.
    DropTable {
        /// Table as `database.table`, or `table` in the default database.
        table: String,

        /// Drop even if the table holds rows.
        #[arg(long)]
        force: bool,
    },

    /// Drop a view.
    DropView {
        /// View as `database.view`, or `view` in the default database.
        view: String,
    },

    /// Drop a database and everything in it.
    DropDatabase {
        /// Database name.
        name: String,
    },
}

/// Splits `database.name`, falling back to `default_database`.
fn split_qualified<'a>(target: &'a str, default_database: &'a str) -> (&'a str, &'a str) {
    target
        .split_once('.')
        .unwrap_or((default_database, target))
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

    let options = ConnectionOptions {
        url: cli.url.clone(),
        user: cli.user.clone(),
        password: cli.password.clone(),
        database: cli.database.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
        ..ConnectionOptions::default()
    };
    let conn = HttpConnection::connect(options)
        .await
        .with_context(|| format!("cannot reach ClickHouse at {}", cli.url))?;

    let executor = SchemaExecutor::new(conn, ClickHouseDialect::new());

    match cli.command {
        Commands::Plan { file } => {
            let state = DesiredState::load(&file)
                .with_context(|| format!("cannot load {}", file.display()))?;
            let operations = executor.plan(&state).await?;

            if operations.is_empty() {
                info!("Schema is up to date.");
            } else {
                for (operation, sql) in operations.iter().zip(executor.render(&operations)) {
                    println!("-- {}", operation.description());
                    println!("{sql};");
                }
            }
        }

        Commands::Apply { file, dry_run } => {
            let state = DesiredState::load(&file)
                .with_context(|| format!("cannot load {}", file.display()))?;
            let executor = executor.dry_run(dry_run);

            if dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
            }

            let operations = executor.plan(&state).await?;
            if operations.is_empty() {
                info!("Schema is up to date.");
            } else {
                executor.apply(&operations).await?;
                info!(operations = operations.len(), "Desired state applied");
            }
        }

        Commands::ShowTable { table } => {
            let (database, name) = split_qualified(&table, &cli.database);
            let schema = get_table(executor.connection(), database, name).await?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }

        Commands::DropTable { table, force } => {
            let (database, name) = split_qualified(&table, &cli.database);
            executor.drop_table(database, name, !force).await?;
            info!("Dropped table {database}.{name}");
        }

        Commands::DropView { view } => {
            let (database, name) = split_qualified(&view, &cli.database);
            executor.drop_view(database, name).await?;
            info!("Dropped view {database}.{name}");
        }

        Commands::DropDatabase { name } => {
            executor.drop_database(&name).await?;
            info!("Dropped database {name}");
        }
    }

    Ok(())
}
