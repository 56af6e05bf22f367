//! Lingua maintenance CLI entry point.
//!
//! Binary name: `lingua`
//!
//! Operational commands against the chat core's database: apply
//! migrations, finish interrupted room creations, inspect a user's point
//! balance. The chat traffic itself flows through the external
//! request-handling layer, not this tool.

mod state;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use lingua_types::config::AppConfig;
use lingua_types::user::UserId;
use state::AppState;

#[derive(Parser)]
#[command(name = "lingua", about = "Maintenance tool for the Lingua chat core")]
struct Cli {
    /// Path to a config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the database URL
    #[arg(long, global = true, env = "LINGUA_DATABASE_URL")]
    database_url: Option<String>,

    /// Bridge tracing spans to OpenTelemetry (stdout exporter)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations and exit
    Migrate,
    /// Commit rooms whose creation was interrupted before their
    /// participants' aggregate ratings were updated
    Reconcile,
    /// Print a user's point balance
    Points {
        /// The user's id
        user_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config: AppConfig = match &cli.config {
        Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
        None => AppConfig::default(),
    };
    if cli.database_url.is_some() {
        config.database_url = cli.database_url.clone();
    }

    lingua_observe::tracing_setup::init_tracing(cli.otel || config.enable_otel)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // Opening the pool runs migrations.
    let state = AppState::init(&config).await?;

    match cli.command {
        Commands::Migrate => {
            let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
                .fetch_one(&state.db_pool.reader)
                .await?;
            println!("{applied} migration(s) applied");
        }
        Commands::Reconcile => {
            let committed = state.registry.reconcile_pending().await?;
            println!("{committed} pending room(s) committed");
        }
        Commands::Points { user_id } => {
            let user_id: UserId = user_id.parse()?;
            let points = state.ledger.points(&user_id).await?;
            println!("{points}");
        }
    }

    lingua_observe::tracing_setup::shutdown_tracing();
    Ok(())
}
