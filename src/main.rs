//! OpenSASE Shop - storefront API server

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opensase_shop::config::Config;
use opensase_shop::http::{router, AppState};
use opensase_shop::publisher::EventPublisher;
use opensase_shop::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let store = PgStore::connect(&config.database_url, config.db_max_connections).await?;
    store.migrate().await?;
    tracing::info!("database ready");

    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let addr = config.bind_address();
    let app = router(AppState::new(&config, store, events));

    tracing::info!(public_host = %config.public_host, "OpenSASE Shop listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
