use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domains::chat::{Message, Role};
use crate::domains::ids::{now_ms, rand_id};
use crate::error::Result;
use crate::interfaces::store::SyncedStore;

/// 60 writes per second, the rate the stress buttons ran at.
pub const DEFAULT_TICK: Duration = Duration::from_millis(16);

const SAMPLE_WORDS: [&str; 24] = [
    "tide", "harbor", "signal", "driftwood", "current", "anchor", "swell", "breeze", "chart",
    "compass", "lantern", "mooring", "ripple", "saltwater", "horizon", "wake", "buoy", "keel",
    "galley", "ledger", "quay", "fathom", "ballast", "spray",
];

/// Background write-load generator. Each tick it upserts a short random
/// message into the target chat, or deletes one of the messages it added
/// earlier; it never touches rows it did not create.
pub struct ChurnGenerator {
    store: Arc<dyn SyncedStore>,
    chat_id: String,
    tick: Duration,
    inserted: Mutex<Vec<String>>,
}

impl ChurnGenerator {
    pub fn new(store: Arc<dyn SyncedStore>, chat_id: impl Into<String>) -> Self {
        Self {
            store,
            chat_id: chat_id.into(),
            tick: DEFAULT_TICK,
            inserted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub async fn add_random(&self) -> Result<String> {
        let (role, content) = {
            let mut rng = rand::thread_rng();
            let role = if rng.gen_bool(0.5) {
                Role::User
            } else {
                Role::Assistant
            };
            let count = rng.gen_range(3..=8);
            let words: Vec<&str> = (0..count)
                .filter_map(|_| SAMPLE_WORDS.choose(&mut rng).copied())
                .collect();
            (role, words.join(" "))
        };
        let message = Message {
            id: rand_id(),
            chat_id: self.chat_id.clone(),
            role,
            content,
            timestamp: now_ms(),
        };
        let id = message.id.clone();
        self.store.upsert_message(message).await?;
        self.inserted.lock().await.push(id.clone());
        Ok(id)
    }

    pub async fn remove_random(&self) -> Result<Option<String>> {
        let id = {
            let mut inserted = self.inserted.lock().await;
            if inserted.is_empty() {
                None
            } else {
                let index = rand::thread_rng().gen_range(0..inserted.len());
                Some(inserted.swap_remove(index))
            }
        };
        let Some(id) = id else {
            return Ok(None);
        };
        self.store.delete_message(&id).await?;
        Ok(Some(id))
    }

    async fn step(&self) -> Result<()> {
        let remove = rand::thread_rng().gen_bool(0.25);
        if remove && self.remove_random().await?.is_some() {
            return Ok(());
        }
        self.add_random().await?;
        Ok(())
    }

    /// Runs a bounded burst: exactly one store write per tick.
    pub async fn run_for(&self, ticks: usize) -> Result<()> {
        let mut interval = tokio::time::interval(self.tick);
        for _ in 0..ticks {
            interval.tick().await;
            self.step().await?;
        }
        Ok(())
    }

    /// Free-running churn until the returned handle is aborted.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.tick);
            loop {
                interval.tick().await;
                if let Err(err) = self.step().await {
                    debug!("churn write failed: {err}");
                }
            }
        })
    }
}
