use anyhow::{Context, Result};
use std::path::Path;
use tracing::{error, info};

use catalog_harvester::application::{HarvestPipeline, PipelineCollaborators, RunOutcome};
use catalog_harvester::cli::{parse_args, Command, USAGE};
use catalog_harvester::domain::RecordSink;
use catalog_harvester::infrastructure::config::defaults;
use catalog_harvester::infrastructure::logging::log_system_info;
use catalog_harvester::infrastructure::{
    init_logging_with_config, ConfigManager, DatabaseConnection, PipelineConfig, SqliteCatalogStore,
};

#[tokio::main]
async fn main() {
    let command = match parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    if let Err(e) = execute(command).await {
        error!("❌ {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn execute(command: Command) -> Result<()> {
    match command {
        Command::Help => {
            println!("{USAGE}");
            Ok(())
        }
        Command::Run { config } => {
            let config = load_config(config.as_deref()).await?;
            let collaborators = PipelineCollaborators::from_config(&config).await?;
            match HarvestPipeline::new(config, collaborators).run().await? {
                RunOutcome::Completed(summary) => {
                    info!("🎉 Run {} stored {} records", summary.run_id, summary.records_harvested);
                }
                RunOutcome::EmptyBatch(summary) => {
                    info!("Run {} found nothing new", summary.run_id);
                }
            }
            Ok(())
        }
        Command::Search { query, config } => {
            let config = load_config(config.as_deref()).await?;
            let db = DatabaseConnection::new(&config.database_url()).await?;
            let store = SqliteCatalogStore::new(db.pool().clone(), &config.table_name).await?;
            let hits = store
                .search(&query, defaults::SEARCH_LIMIT)
                .await
                .context("Search failed")?;
            if hits.is_empty() {
                println!("No matches for '{query}'");
            }
            for hit in hits {
                println!("{:>8.3}  {:<16}  {}", hit.relevance, hit.code, hit.link);
            }
            Ok(())
        }
    }
}

async fn load_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    let manager = ConfigManager::locate(explicit)?;
    let config = manager.load_config().await?;
    init_logging_with_config(config.logging.clone()).context("Failed to initialize logging")?;
    log_system_info();
    info!("⚙️ Configuration loaded from {}", manager.config_path().display());
    Ok(config)
}
