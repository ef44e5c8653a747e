pub mod commands;

use clap::{Parser, Subcommand};

use crate::config::{AppConfig, StoreBackend};
use crate::database::{DatabaseManager, MemoryStore, PgStore, SharedStore};

#[derive(Parser)]
#[command(name = "recipe-api")]
#[command(about = "Recipe API - per-user recipes, tags and ingredients")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Apply database migrations and exit")]
    Migrate,

    #[command(about = "Create a user from the command line")]
    CreateUser {
        #[arg(long, help = "Login email")]
        email: String,
        #[arg(long, help = "Plaintext password, hashed before storage")]
        password: String,
        #[arg(long, help = "Display name")]
        name: Option<String>,
        #[arg(long, help = "Mark the user as staff")]
        staff: bool,
    },
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    config.validate().map_err(anyhow::Error::msg)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::handle(config).await,
        Commands::Migrate => commands::migrate::handle(config).await,
        Commands::CreateUser { email, password, name, staff } => {
            commands::user::handle(config, email, password, name, staff).await
        }
    }
}

/// Build the configured store, migrating the schema first when enabled
pub async fn open_store(config: &AppConfig) -> anyhow::Result<SharedStore> {
    match config.database.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on exit");
            Ok(std::sync::Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database).await?;
            if config.database.run_migrations {
                DatabaseManager::migrate(&pool).await?;
            }
            Ok(std::sync::Arc::new(PgStore::new(pool)))
        }
    }
}
