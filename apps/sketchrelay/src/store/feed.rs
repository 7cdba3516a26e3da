//! Best-effort change notifications keyed by game.

use async_trait::async_trait;
use futures::future::ready;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Game,
    Player,
    Round,
    Prompt,
    Frame,
    Submission,
    /// Events were dropped; re-read everything.
    Resync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub game_id: i64,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(game_id: i64, kind: ChangeKind) -> Self {
        Self { game_id, kind }
    }
}

pub type ChangeStream = BoxStream<'static, ChangeEvent>;

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Fire and forget; delivery is not guaranteed.
    async fn publish(&self, event: ChangeEvent);

    fn subscribe(&self, game_id: i64) -> ChangeStream;
}

/// In-process fan-out over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct LocalFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl LocalFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver without the async trait hop; used by the Redis subscriber loop.
    pub fn send(&self, event: ChangeEvent) {
        // No receivers is not an error: nobody is listening yet
        let _ = self.tx.send(event);
    }
}

impl Default for LocalFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl ChangeFeed for LocalFeed {
    async fn publish(&self, event: ChangeEvent) {
        self.send(event);
    }

    fn subscribe(&self, game_id: i64) -> ChangeStream {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(move |item| {
                ready(match item {
                    Ok(event) if event.game_id == game_id => Some(event),
                    Ok(_) => None,
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        debug!(game_id, skipped, "change feed lagged");
                        Some(ChangeEvent::new(game_id, ChangeKind::Resync))
                    }
                })
            })
            .boxed()
    }
}
