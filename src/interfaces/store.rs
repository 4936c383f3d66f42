use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domains::chat::{Chat, Message, User};
use crate::error::Result;

/// Row-level change notification, published after the write is visible.
#[derive(Debug, Clone)]
pub enum RowEvent {
    UserUpserted(User),
    ChatUpserted(Chat),
    ChatDeleted { chat_id: String },
    MessageUpserted(Message),
    MessageDeleted { message_id: String },
}

/// Synchronized row store for the chat data model. Upsert is the merge
/// primitive: writing an existing id replaces the row wholesale. Writes
/// are read-your-writes on the same handle.
#[async_trait]
pub trait SyncedStore: Send + Sync {
    async fn upsert_user(&self, user: User) -> Result<()>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn upsert_chat(&self, chat: Chat) -> Result<()>;
    /// Title patch. A missing chat is a no-op, not an insert, so a title
    /// writer that lost a race with deletion cannot resurrect the row.
    async fn update_chat_title(&self, chat_id: &str, title: &str) -> Result<()>;
    async fn delete_chat(&self, chat_id: &str) -> Result<()>;
    async fn get_chat(&self, chat_id: &str) -> Result<Option<Chat>>;
    async fn list_chats(&self) -> Result<Vec<Chat>>;

    async fn upsert_message(&self, message: Message) -> Result<()>;
    async fn delete_message(&self, message_id: &str) -> Result<()>;
    async fn get_message(&self, message_id: &str) -> Result<Option<Message>>;
    /// Timestamp ascending, ties broken by first insertion.
    async fn chat_messages(&self, chat_id: &str) -> Result<Vec<Message>>;

    fn subscribe(&self) -> broadcast::Receiver<RowEvent>;
}
