use std::sync::Arc;

use daily_games_api::{
    api::{create_router, AppState},
    config::{Config, PuzzleSeeds, StorageBackend},
    db::{create_pool, create_redis_client, MemoryStore, PgStore, RedisTimerStore},
    services::{Clock, Stores, SystemClock},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("daily_games_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let mut timer_writer = None;
    let stores = match config.storage {
        StorageBackend::Postgres => {
            let store = Arc::new(PgStore::new(create_pool(&config.database_url).await?));
            if config.run_migrations {
                store.migrate().await?;
            }

            let redis_client = create_redis_client(&config.redis_url)?;
            let (timers, handle) =
                RedisTimerStore::new(redis_client, config.timer_ttl_secs).await?;
            timer_writer = Some(handle);

            Stores {
                puzzles: store.clone(),
                scores: store,
                timers: Arc::new(timers),
                clock: Arc::new(SystemClock),
            }
        }
        StorageBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            let seeds = config.puzzle_seeds()?;
            let today = SystemClock.today();
            store.seed(today, &seeds).await?;
            if seeds == PuzzleSeeds::default() {
                tracing::warn!("Using in-memory storage without seed puzzles");
            } else {
                tracing::info!(
                    date = %today,
                    sudoku = seeds.sudoku.is_some(),
                    wordle = seeds.wordle.is_some(),
                    "Seeded in-memory puzzles"
                );
            }
            Stores {
                puzzles: store.clone(),
                scores: store.clone(),
                timers: store,
                clock: Arc::new(SystemClock),
            }
        }
    };

    let state = AppState::new(stores, config.session_settings());
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, storage = ?config.storage, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = timer_writer {
        handle.shutdown().await;
        tracing::info!("Timer writes flushed");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
