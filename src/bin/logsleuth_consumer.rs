//! Consumer binary: drains the raw-logs topic into the store and index.

use std::sync::Arc;

use tracing::info;

use logsleuth::bus::LogConsumer;
use logsleuth::config::Config;
use logsleuth::pipeline::LogPipeline;
use logsleuth::search::ElasticSearchIndex;
use logsleuth::storage::ClickHouseLogStore;
use logsleuth::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(None)?;

    let store = Arc::new(ClickHouseLogStore::connect(config.storage.clone()).await);
    let index = Arc::new(ElasticSearchIndex::new(config.search.clone())?);
    let pipeline = Arc::new(LogPipeline::new(store, index));

    let consumer = LogConsumer::new(config.kafka.clone(), pipeline)?;
    consumer.start()?;

    info!("consumer running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    Ok(())
}
