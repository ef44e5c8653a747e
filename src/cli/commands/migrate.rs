use crate::config::{AppConfig, StoreBackend};
use crate::database::DatabaseManager;

pub async fn handle(config: AppConfig) -> anyhow::Result<()> {
    if config.database.backend != StoreBackend::Postgres {
        println!("Nothing to migrate for the {:?} backend", config.database.backend);
        return Ok(());
    }

    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::migrate(&pool).await?;
    DatabaseManager::close(&pool).await;
    println!("Migrations applied");
    Ok(())
}
