use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::db::TimerStore;
use crate::error::AppResult;
use crate::services::timer::TimerKey;

/// Creates a Redis client for timer persistence
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Queued timer write, applied in submission order
#[derive(Debug)]
enum TimerWrite {
    Save { key: String, value: u64, ttl: u64 },
    Clear { key: String },
}

/// Persisted session timers in Redis
///
/// Saves happen every tick, so they go through a background writer instead of blocking
/// the ticker on a round trip. Clears use the same queue, which keeps a late save from
/// landing after the clear that ended the game. Loads and the writer share one
/// reconnecting multiplexed connection.
#[derive(Clone)]
pub struct RedisTimerStore {
    conn: ConnectionManager,
    write_tx: mpsc::UnboundedSender<TimerWrite>,
    ttl: u64,
}

/// Handle for gracefully shutting down the timer writer
pub struct TimerWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl TimerWriterHandle {
    /// Stops the timer writer and waits until every queued write has been applied
    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).await.is_err() {
            tracing::warn!("Timer writer already stopped");
        }
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Timer writer task failed");
        }
    }
}

impl RedisTimerStore {
    /// Connects to Redis and starts the background writer task
    ///
    /// `ttl` bounds how long a persisted value outlives its last save, so timers of
    /// abandoned sessions disappear on their own.
    pub async fn new(redis_client: Client, ttl: u64) -> AppResult<(Self, TimerWriterHandle)> {
        let conn = redis_client.get_connection_manager().await?;
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(Self::timer_writer_task(conn.clone(), write_rx, shutdown_rx));

        let store = Self {
            conn,
            write_tx,
            ttl,
        };

        Ok((store, TimerWriterHandle { shutdown_tx, task }))
    }

    /// Background task that applies queued writes
    ///
    /// On shutdown signal, flushes all remaining writes before exiting.
    async fn timer_writer_task(
        mut conn: ConnectionManager,
        mut write_rx: mpsc::UnboundedReceiver<TimerWrite>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Timer writer task started");

        loop {
            tokio::select! {
                Some(write) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&mut conn, write).await {
                        tracing::error!(error = %e, "Failed to write timer to Redis");
                    }
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    tracing::info!("Timer writer shutting down, flushing remaining writes");

                    while let Some(write) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_redis(&mut conn, write).await {
                            tracing::error!(error = %e, "Failed to flush timer write during shutdown");
                        }
                    }

                    tracing::info!("Timer writer task stopped");
                    break;
                }
            }
        }
    }

    async fn write_to_redis(conn: &mut ConnectionManager, write: TimerWrite) -> AppResult<()> {
        match write {
            TimerWrite::Save { key, value, ttl } => {
                let _: () = conn.set_ex(key, value, ttl).await?;
            }
            TimerWrite::Clear { key } => {
                let _: () = conn.del(key).await?;
            }
        }
        Ok(())
    }

    fn enqueue(&self, write: TimerWrite) {
        if let Err(e) = self.write_tx.send(write) {
            tracing::error!(error = %e, "Failed to queue timer write");
        }
    }
}

#[async_trait::async_trait]
impl TimerStore for RedisTimerStore {
    async fn load(&self, key: &TimerKey) -> AppResult<Option<u64>> {
        let mut conn = self.conn.clone();
        let value: Option<u64> = conn.get(key.to_string()).await?;
        Ok(value)
    }

    async fn save(&self, key: &TimerKey, elapsed_seconds: u64) -> AppResult<()> {
        self.enqueue(TimerWrite::Save {
            key: key.to_string(),
            value: elapsed_seconds,
            ttl: self.ttl,
        });
        Ok(())
    }

    async fn clear(&self, key: &TimerKey) -> AppResult<()> {
        self.enqueue(TimerWrite::Clear {
            key: key.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameKind;
    use crate::services::timer::TimerScope;
    use chrono::NaiveDate;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    fn key(scope: &str) -> TimerKey {
        TimerKey {
            game: GameKind::Sudoku,
            scope: TimerScope::Client(scope.to_string()),
            date: NaiveDate::from_ymd_opt(2024, 9, 14).unwrap(),
        }
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_timer_miss() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (store, _handle) = RedisTimerStore::new(client, 60).await.unwrap();

        assert_eq!(store.load(&key("nonexistent_scope_12345")).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_save_then_clear() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (store, _handle) = RedisTimerStore::new(client, 60).await.unwrap();
        let key = key("test_save_then_clear");

        store.save(&key, 73).await.unwrap();
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        assert_eq!(store.load(&key).await.unwrap(), Some(73));

        store.clear(&key).await.unwrap();
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        assert_eq!(store.load(&key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_clear_after_save_wins() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (store, handle) = RedisTimerStore::new(client, 60).await.unwrap();
        let key = key("test_clear_after_save_wins");

        store.save(&key, 5).await.unwrap();
        store.clear(&key).await.unwrap();
        handle.shutdown().await;

        assert_eq!(store.load(&key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_shutdown_waits_for_queued_saves() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (store, handle) = RedisTimerStore::new(client, 60).await.unwrap();
        let key = key("test_shutdown_waits_for_queued_saves");

        for elapsed in 1..=200 {
            store.save(&key, elapsed).await.unwrap();
        }
        handle.shutdown().await;

        // no settling delay: every queued save has landed once shutdown returns
        assert_eq!(store.load(&key).await.unwrap(), Some(200));
    }
}
