//! Applies database migrations and checks the cart backend.

use cart::RedisCartStore;
use storefront::{Config, StorefrontError, connect_postgres, telemetry};

#[tokio::main]
async fn main() -> Result<(), StorefrontError> {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    if let Err(e) = telemetry::init(&config) {
        eprintln!("tracing already initialized: {e}");
    }

    // 2. Apply PostgreSQL migrations
    let store = connect_postgres(&config).await?;
    store.run_migrations().await?;

    // 3. Check Redis when configured
    match config.redis_url.as_deref() {
        Some(url) => {
            RedisCartStore::connect(url).await?.ping().await?;
            tracing::info!("redis reachable");
        }
        None => tracing::warn!("REDIS_URL not set, skipping cart backend check"),
    }

    store.pool().close().await;
    Ok(())
}
