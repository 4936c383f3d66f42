use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use crate::domains::chat::{Chat, Message, User};
use crate::error::Result;
use crate::interfaces::store::{RowEvent, SyncedStore};

const EVENT_CAPACITY: usize = 256;

struct Slot<T> {
    seq: u64,
    row: T,
}

/// Process-local [`SyncedStore`]. Rows live in maps keyed by id; each row
/// keeps the sequence number of its first insertion so an upsert never
/// moves a message within its timeline position.
pub struct InMemoryStore {
    users: RwLock<HashMap<String, User>>,
    chats: RwLock<HashMap<String, Slot<Chat>>>,
    messages: RwLock<HashMap<String, Slot<Message>>>,
    next_seq: AtomicU64,
    events: broadcast::Sender<RowEvent>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            users: RwLock::new(HashMap::new()),
            chats: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            events,
        }
    }

    fn bump_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    fn publish(&self, event: RowEvent) {
        let _ = self.events.send(event);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncedStore for InMemoryStore {
    async fn upsert_user(&self, user: User) -> Result<()> {
        self.users
            .write()
            .await
            .insert(user.id.clone(), user.clone());
        self.publish(RowEvent::UserUpserted(user));
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn upsert_chat(&self, chat: Chat) -> Result<()> {
        let mut chats = self.chats.write().await;
        match chats.get_mut(&chat.id) {
            Some(slot) => slot.row = chat.clone(),
            None => {
                let seq = self.bump_seq();
                chats.insert(chat.id.clone(), Slot { seq, row: chat.clone() });
            }
        }
        drop(chats);
        self.publish(RowEvent::ChatUpserted(chat));
        Ok(())
    }

    async fn update_chat_title(&self, chat_id: &str, title: &str) -> Result<()> {
        let mut chats = self.chats.write().await;
        let Some(slot) = chats.get_mut(chat_id) else {
            return Ok(());
        };
        slot.row.title = title.to_string();
        let updated = slot.row.clone();
        drop(chats);
        self.publish(RowEvent::ChatUpserted(updated));
        Ok(())
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        let removed = self.chats.write().await.remove(chat_id);
        if removed.is_some() {
            self.publish(RowEvent::ChatDeleted {
                chat_id: chat_id.to_string(),
            });
        }
        Ok(())
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Option<Chat>> {
        Ok(self.chats.read().await.get(chat_id).map(|slot| slot.row.clone()))
    }

    async fn list_chats(&self) -> Result<Vec<Chat>> {
        let chats = self.chats.read().await;
        let mut slots: Vec<(i64, u64, Chat)> = chats
            .values()
            .map(|slot| (slot.row.created_at, slot.seq, slot.row.clone()))
            .collect();
        slots.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
        Ok(slots.into_iter().map(|(_, _, chat)| chat).collect())
    }

    async fn upsert_message(&self, message: Message) -> Result<()> {
        let mut messages = self.messages.write().await;
        match messages.get_mut(&message.id) {
            Some(slot) => slot.row = message.clone(),
            None => {
                let seq = self.bump_seq();
                messages.insert(message.id.clone(), Slot { seq, row: message.clone() });
            }
        }
        drop(messages);
        self.publish(RowEvent::MessageUpserted(message));
        Ok(())
    }

    async fn delete_message(&self, message_id: &str) -> Result<()> {
        let removed = self.messages.write().await.remove(message_id);
        if removed.is_some() {
            self.publish(RowEvent::MessageDeleted {
                message_id: message_id.to_string(),
            });
        }
        Ok(())
    }

    async fn get_message(&self, message_id: &str) -> Result<Option<Message>> {
        Ok(self
            .messages
            .read()
            .await
            .get(message_id)
            .map(|slot| slot.row.clone()))
    }

    async fn chat_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let messages = self.messages.read().await;
        let mut slots: Vec<(i64, u64, Message)> = messages
            .values()
            .filter(|slot| slot.row.chat_id == chat_id)
            .map(|slot| (slot.row.timestamp, slot.seq, slot.row.clone()))
            .collect();
        slots.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        Ok(slots.into_iter().map(|(_, _, message)| message).collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<RowEvent> {
        self.events.subscribe()
    }
}
