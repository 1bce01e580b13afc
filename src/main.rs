use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_recs::{
    config::Config,
    db::{create_pool, create_redis_client, run_migrations, Cache, PgCatalogStore, PgSignalStore},
    routes::{create_router, AppState},
    services::{media::HttpMediaResolver, RecommendationEngine},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_recs=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url, 10).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let (cache, cache_writer) = match create_redis_client(&config.redis_url) {
        Ok(client) => {
            let (cache, writer) = Cache::new(client);
            (Some(cache), Some(writer))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, media lookups will not be cached");
            (None, None)
        }
    };

    let media = HttpMediaResolver::new(
        cache,
        config.media_api_url.clone(),
        config.media_api_key.clone(),
        config.media_cache_ttl_secs,
        Duration::from_millis(config.media_cache_timeout_ms),
    );

    let engine = RecommendationEngine::new(
        config.cascade(),
        Arc::new(PgSignalStore::new(pool.clone())),
        Arc::new(PgCatalogStore::new(pool)),
        Arc::new(media),
    );

    let app = create_router(Arc::new(AppState::new(Arc::new(engine))));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
