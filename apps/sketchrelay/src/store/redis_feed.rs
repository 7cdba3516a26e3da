//! Change hints shared across processes over Redis pub/sub.
//!
//! Every write is announced on `game:{id}`; one background task per process
//! pattern-subscribes to `game:*` and fans events out locally.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::random;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::store::feed::{ChangeEvent, ChangeFeed, ChangeStream, LocalFeed};

// Subscriber retry configuration (background task)
const INITIAL_RETRY_DELAY_SECS: u64 = 1;
const MAX_RETRY_DELAY_SECS: u64 = 30;
const RETRY_DELAY_MULTIPLIER: f64 = 2.0;
const JITTER_PERCENT: f64 = 0.2;

// Publisher retry configuration (write path)
const PUBLISHER_MAX_ATTEMPTS: u32 = 3;
const PUBLISHER_INITIAL_RETRY_DELAY_MS: u64 = 50;
const PUBLISHER_MAX_RETRY_DELAY_MS: u64 = 200;

const CHANNEL_PATTERN: &str = "game:*";

pub struct RedisFeed {
    local: LocalFeed,
    publisher: Mutex<ConnectionManager>,
}

impl RedisFeed {
    pub async fn connect(redis_url: &str) -> Result<Arc<Self>, AppError> {
        let client = Client::open(redis_url)
            .map_err(|err| AppError::config(format!("Invalid REDIS_URL: {err}")))?;

        let manager = ConnectionManager::new(client.clone())
            .await
            .map_err(|err| AppError::feed("Unable to initialize Redis connection manager", err))?;

        let local = LocalFeed::default();
        let feed = Arc::new(Self {
            local: local.clone(),
            publisher: Mutex::new(manager),
        });

        tokio::spawn(async move {
            run_subscription_loop_with_retry(client, local).await;
        });

        Ok(feed)
    }

    async fn publish_to_channel(&self, channel: String, encoded: String) -> Result<(), RedisError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let publish_res = {
                let mut publisher = self.publisher.lock().await;
                publisher
                    .publish::<_, _, ()>(channel.clone(), encoded.clone())
                    .await
            };

            match publish_res {
                Ok(()) => return Ok(()),
                Err(err) => {
                    if attempt >= PUBLISHER_MAX_ATTEMPTS || !is_transient_error(&err) {
                        return Err(err);
                    }

                    let delay_ms = PUBLISHER_INITIAL_RETRY_DELAY_MS
                        .saturating_mul(2_u64.pow(attempt - 1))
                        .min(PUBLISHER_MAX_RETRY_DELAY_MS);
                    warn!(
                        error = %err,
                        attempt,
                        retry_delay_ms = delay_ms,
                        "Redis publish failed, retrying"
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}

#[async_trait]
impl ChangeFeed for RedisFeed {
    async fn publish(&self, event: ChangeEvent) {
        let encoded = match serde_json::to_string(&event) {
            Ok(encoded) => encoded,
            Err(err) => {
                error!(error = %err, "Failed to serialize change event");
                return;
            }
        };

        if let Err(err) = self
            .publish_to_channel(game_channel(event.game_id), encoded)
            .await
        {
            // Readers fall back to polling
            warn!(error = %err, game_id = event.game_id, "Dropping change event");
        }
    }

    fn subscribe(&self, game_id: i64) -> ChangeStream {
        self.local.subscribe(game_id)
    }
}

fn game_channel(game_id: i64) -> String {
    format!("game:{game_id}")
}

fn parse_game_channel(channel: &str) -> Option<i64> {
    channel.strip_prefix("game:")?.parse().ok()
}

fn is_transient_error(err: &RedisError) -> bool {
    if err.is_connection_refusal() || err.is_timeout() || err.is_connection_dropped() {
        return true;
    }
    if err.is_io_error() {
        return true;
    }

    let error_msg = err.to_string().to_lowercase();
    if error_msg.contains("authentication failed")
        || error_msg.contains("noauth")
        || error_msg.contains("invalid")
    {
        return false;
    }

    error_msg.contains("connection") || error_msg.contains("broken pipe")
}

fn calculate_retry_delay(attempt: u32) -> Duration {
    let base_delay =
        INITIAL_RETRY_DELAY_SECS as f64 * RETRY_DELAY_MULTIPLIER.powi(attempt as i32 - 1);
    let capped_delay = base_delay.min(MAX_RETRY_DELAY_SECS as f64);

    let jitter_range = capped_delay * JITTER_PERCENT;
    let jitter = (random::<f64>() * 2.0 - 1.0) * jitter_range;
    let final_delay = (capped_delay + jitter).max(0.1);

    Duration::from_secs_f64(final_delay)
}

async fn run_subscription_loop_with_retry(client: Client, local: LocalFeed) {
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match run_subscription_loop(&client, &local).await {
            Ok(()) => {
                // The stream only ends when the connection drops
                warn!(attempt, "Redis subscription stream ended, reconnecting");
            }
            Err(err) if !is_transient_error(&err) => {
                error!(
                    error = %err,
                    attempt,
                    "Redis subscription failed with permanent error, exiting"
                );
                break;
            }
            Err(err) => {
                warn!(error = %err, attempt, "Redis subscription failed, retrying");
            }
        }

        sleep(calculate_retry_delay(attempt)).await;
        if attempt >= 20 {
            attempt = 10;
        }
    }
}

async fn run_subscription_loop(client: &Client, local: &LocalFeed) -> Result<(), RedisError> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.psubscribe(CHANNEL_PATTERN).await?;
    info!(pattern = CHANNEL_PATTERN, "Redis subscription established");

    let mut stream = pubsub.into_on_message();
    while let Some(msg) = stream.next().await {
        let Ok(channel) = msg.get_channel::<String>() else {
            continue;
        };
        let Ok(payload) = msg.get_payload::<String>() else {
            continue;
        };

        match serde_json::from_str::<ChangeEvent>(&payload) {
            Ok(event) if parse_game_channel(&channel) == Some(event.game_id) => {
                local.send(event);
            }
            Ok(event) => {
                warn!(channel = %channel, game_id = event.game_id, "Change event on mismatched channel");
            }
            Err(err) => {
                debug!(error = %err, channel = %channel, "Failed to decode change event");
            }
        }
    }
    Ok(())
}
