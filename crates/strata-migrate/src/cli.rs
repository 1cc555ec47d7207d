//! Command-line front end for an application's migrations.
//!
//! Applications own their migration list, so they provide the binary:
//!
//! ```ignore
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     strata_migrate::cli::run(vec![
//!         Box::new(CreateUsersTable),
//!         Box::new(AddAdminFlag),
//!     ])
//!     .await
//! }
//! ```

use std::fmt::Write as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use strata_orm::{Database, DatabaseOptions};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::error::Result;
use crate::runner::{Direction, Migration, MigrationRunner};

/// Schema migrations for strata models.
#[derive(Debug, Parser)]
#[command(name = "strata-migrate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// MySQL connection URL.
    #[arg(short, long, env = "DATABASE_URL")]
    pub database: String,

    /// Connection pool size.
    #[arg(long, default_value_t = 1)]
    pub max_connections: u32,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Migration commands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Apply pending migrations as one batch.
    Migrate {
        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Revert the most recent batch.
    Rollback {
        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Revert every applied migration.
    Reset {
        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Show migration status.
    Status {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show SQL for one migration without executing.
    Sql {
        /// Migration name.
        name: String,

        /// Show rollback SQL instead of forward SQL.
        #[arg(short, long)]
        reverse: bool,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Parses the command line, connects and runs the command.
///
/// # Errors
///
/// Returns connection, migration and IO errors.
pub async fn run(migrations: Vec<Box<dyn Migration>>) -> anyhow::Result<()> {
    run_with(Cli::parse(), migrations).await
}

/// Runs a parsed command line.
///
/// # Errors
///
/// Returns connection, migration and IO errors.
pub async fn run_with(cli: Cli, migrations: Vec<Box<dyn Migration>>) -> anyhow::Result<()> {
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

    let options = DatabaseOptions::new(&cli.database).max_connections(cli.max_connections);
    let db = Database::connect(&options).await?;
    let runner = MigrationRunner::new(&db).migrations(migrations);

    execute(&cli.command, runner).await?;
    Ok(())
}

/// Runs `command` with `runner`. The runner's dry-run flag is taken from the
/// command.
///
/// # Errors
///
/// Returns migration errors, and IO errors when writing SQL to a file.
pub async fn execute(command: &Command, runner: MigrationRunner) -> Result<()> {
    match command {
        Command::Migrate { dry_run } => {
            let runner = announce(runner, *dry_run);
            let applied = runner.run_up().await?;
            info!(count = applied.len(), "Migrations applied");
        }

        Command::Rollback { dry_run } => {
            let runner = announce(runner, *dry_run);
            let reverted = runner.rollback().await?;
            info!(count = reverted.len(), "Migrations rolled back");
        }

        Command::Reset { dry_run } => {
            let runner = announce(runner, *dry_run);
            let reverted = runner.run_down().await?;
            info!(count = reverted.len(), "Migrations rolled back");
        }

        Command::Status { json } => {
            let status = runner.status().await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                for entry in &status {
                    let mark = if entry.is_applied() { "X" } else { " " };
                    println!("[{mark}] {}", entry.name);
                }
            }
        }

        Command::Sql {
            name,
            reverse,
            output,
        } => {
            let direction = if *reverse {
                Direction::Down
            } else {
                Direction::Up
            };
            let sql = render_sql(&runner, name, direction).await?;
            match output {
                Some(path) => {
                    std::fs::write(path, sql)?;
                    info!(path = %path.display(), "SQL written");
                }
                None => print!("{sql}"),
            }
        }
    }
    Ok(())
}

fn announce(runner: MigrationRunner, dry_run: bool) -> MigrationRunner {
    if dry_run {
        info!("Dry run mode - SQL will be printed but not executed.");
    }
    runner.dry_run(dry_run)
}

/// Renders one direction of a migration as `;`-terminated lines.
///
/// # Errors
///
/// Returns [`MigrationNotFound`](crate::MigrateError::MigrationNotFound) for
/// an unknown name.
pub async fn render_sql(runner: &MigrationRunner, name: &str, direction: Direction) -> Result<String> {
    let mut sql = String::new();
    for statement in runner.sql_for_name(name, direction).await? {
        let _ = writeln!(sql, "{statement};");
    }
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_migrate() {
        let cli = Cli::try_parse_from([
            "strata-migrate",
            "--database",
            "mysql://root@localhost/app",
            "migrate",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.database, "mysql://root@localhost/app");
        assert_eq!(cli.max_connections, 1);
        assert_eq!(cli.command, Command::Migrate { dry_run: true });
    }

    #[test]
    fn test_parse_sql() {
        let cli = Cli::try_parse_from([
            "strata-migrate",
            "-d",
            "mysql://localhost/app",
            "-v",
            "sql",
            "0001_create_users",
            "--reverse",
            "--output",
            "down.sql",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(
            cli.command,
            Command::Sql {
                name: "0001_create_users".into(),
                reverse: true,
                output: Some(PathBuf::from("down.sql")),
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["strata-migrate", "-d", "mysql://x/y", "squash"]).is_err());
    }
}
