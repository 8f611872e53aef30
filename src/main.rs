use anyhow::Context;
use ghostroom::{
    build_router, AppConfig, AppState, EventBus, InMemoryStore, RandomIdGenerator, RedisStore,
    Store,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ghostroom=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    info!(
        room_ttl_secs = config.room_ttl.as_secs(),
        store_timeout_ms = config.store_timeout.as_millis() as u64,
        "Starting ghostroom server"
    );

    // Redis when configured, in-memory otherwise
    let store: Arc<dyn Store> = match &config.redis_url {
        Some(url) => {
            let store = RedisStore::connect(url, config.store_timeout)
                .await
                .context("failed to connect to Redis")?;
            info!("Using Redis store");
            Arc::new(store)
        }
        None => {
            warn!("REDIS_URL not set, using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(
        config,
        store,
        Arc::new(EventBus::new()),
        Arc::new(RandomIdGenerator::new()),
    );

    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "Server running");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
