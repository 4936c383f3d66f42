use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::domains::chat::{Chat, Message, Role, DEFAULT_TEMPERATURE};
use crate::domains::ids::{now_ms, rand_id, ANON_USER_ID};
use crate::error::{Result, TideChatError};
use crate::interfaces::providers::{
    CompletionProvider, CompletionRequest, TextStream, WireMessage,
};
use crate::interfaces::store::SyncedStore;

pub const PLACEHOLDER_TITLE: &str = "New Chat";
pub const FALLBACK_TITLE: &str = "Untitled";

// Newest stream generation per chat. A submission bumps the chat's
// generation before opening its stream; an older stream notices on its
// next chunk and stops writing.
#[derive(Default)]
struct StreamRegistry {
    current: Mutex<HashMap<String, u64>>,
    counter: Mutex<u64>,
}

impl StreamRegistry {
    async fn begin(&self, chat_id: &str) -> u64 {
        let mut counter = self.counter.lock().await;
        *counter += 1;
        let generation = *counter;
        drop(counter);
        self.current
            .lock()
            .await
            .insert(chat_id.to_string(), generation);
        generation
    }

    async fn is_current(&self, chat_id: &str, generation: u64) -> bool {
        self.current.lock().await.get(chat_id).copied() == Some(generation)
    }

    async fn forget(&self, chat_id: &str) {
        self.current.lock().await.remove(chat_id);
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatSettings {
    pub title: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
}

pub struct SessionService {
    store: Arc<dyn SyncedStore>,
    provider: Arc<dyn CompletionProvider>,
    streams: Arc<StreamRegistry>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SyncedStore>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            store,
            provider,
            streams: Arc::new(StreamRegistry::default()),
        }
    }

    /// Submits one user turn. `Ok(None)` when the input trims to nothing,
    /// otherwise a [`ReplyStream`] the caller drives to merge the reply
    /// into the store. On return the chat row (for a first message), the
    /// user message and an empty assistant row are already committed.
    pub async fn submit(
        &self,
        chat_id: Option<&str>,
        history: &[Message],
        input: &str,
        user_id: &str,
    ) -> Result<Option<ReplyStream>> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        let (chat_id, created_chat) = match chat_id {
            Some(id) => (id.to_string(), false),
            None => {
                let id = rand_id();
                self.store
                    .upsert_chat(Chat {
                        id: id.clone(),
                        user_id: user_id.to_string(),
                        title: PLACEHOLDER_TITLE.to_string(),
                        system_prompt: String::new(),
                        temperature: DEFAULT_TEMPERATURE,
                        created_at: now_ms(),
                    })
                    .await?;
                (id, true)
            }
        };

        let user_message = Message {
            id: rand_id(),
            chat_id: chat_id.clone(),
            role: Role::User,
            content: input.to_string(),
            timestamp: now_ms(),
        };
        let user_message_id = user_message.id.clone();
        self.store.upsert_message(user_message).await?;

        let title_task = history
            .is_empty()
            .then(|| self.spawn_title_update(&chat_id, input));

        let chat = self.store.get_chat(&chat_id).await?;
        let temperature = chat
            .as_ref()
            .map(|chat| chat.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE);
        let system = chat
            .filter(|chat| !chat.system_prompt.is_empty())
            .map(|chat| chat.system_prompt);

        let mut messages: Vec<WireMessage> = history.iter().map(WireMessage::from).collect();
        messages.push(WireMessage {
            role: Role::User.as_str().to_string(),
            content: input.to_string(),
        });

        let generation = self.streams.begin(&chat_id).await;
        let stream = self
            .provider
            .open_stream(CompletionRequest::reply(messages, system, temperature))
            .await?;

        let assistant_message = Message {
            id: rand_id(),
            chat_id,
            role: Role::Assistant,
            content: String::new(),
            timestamp: now_ms(),
        };
        self.store.upsert_message(assistant_message.clone()).await?;

        Ok(Some(ReplyStream {
            store: self.store.clone(),
            streams: self.streams.clone(),
            stream,
            row: assistant_message,
            deltas: Vec::new(),
            generation,
            user_message_id,
            created_chat,
            title_task,
            done: false,
        }))
    }

    fn spawn_title_update(&self, chat_id: &str, first_message: &str) -> JoinHandle<()> {
        let store = self.store.clone();
        let provider = self.provider.clone();
        let chat_id = chat_id.to_string();
        let request = CompletionRequest::title(vec![WireMessage {
            role: Role::User.as_str().to_string(),
            content: first_message.to_string(),
        }]);
        tokio::spawn(async move {
            let title = match provider.complete(request).await {
                Ok(title) => {
                    let title = title.trim().to_string();
                    if title.is_empty() {
                        FALLBACK_TITLE.to_string()
                    } else {
                        title
                    }
                }
                Err(err) => {
                    warn!("title generation failed for chat {chat_id}: {err}");
                    FALLBACK_TITLE.to_string()
                }
            };
            if let Err(err) = store.update_chat_title(&chat_id, &title).await {
                warn!("title write failed for chat {chat_id}: {err}");
            }
        })
    }

    /// Removes the chat row only. Its messages stay behind as orphans.
    pub async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        self.streams.forget(chat_id).await;
        self.store.delete_chat(chat_id).await
    }

    /// Rewrites a message's content in place. Editing inside another
    /// user's chat needs `force` after the person confirmed.
    pub async fn edit_message(
        &self,
        message_id: &str,
        new_content: &str,
        editor_user_id: &str,
        force: bool,
    ) -> Result<()> {
        let Some(message) = self.store.get_message(message_id).await? else {
            return Err(TideChatError::Store(format!("unknown message {message_id}")));
        };
        let owner = self
            .store
            .get_chat(&message.chat_id)
            .await?
            .map(|chat| chat.user_id);
        if !force && owner.as_deref() != Some(editor_user_id) {
            return Err(TideChatError::PermissionAdvisory(
                "message belongs to another user's chat".to_string(),
            ));
        }
        let mut updated = message;
        updated.content = new_content.to_string();
        self.store.upsert_message(updated).await
    }

    pub async fn remove_message(
        &self,
        message_id: &str,
        actor_user_id: &str,
        force: bool,
    ) -> Result<()> {
        if actor_user_id == ANON_USER_ID && !force {
            return Err(TideChatError::PermissionAdvisory(
                "anonymous deletion needs confirmation".to_string(),
            ));
        }
        self.store.delete_message(message_id).await
    }

    pub async fn update_settings(&self, chat_id: &str, settings: ChatSettings) -> Result<()> {
        let Some(mut chat) = self.store.get_chat(chat_id).await? else {
            return Err(TideChatError::Store(format!("unknown chat {chat_id}")));
        };
        if let Some(title) = settings.title {
            chat.title = title;
        }
        if let Some(system_prompt) = settings.system_prompt {
            chat.system_prompt = system_prompt;
        }
        if let Some(temperature) = settings.temperature {
            if temperature.is_finite() {
                chat.temperature = temperature.clamp(0.0, 1.0);
            }
        }
        self.store.upsert_chat(chat).await
    }
}

/// Handle over one in-flight assistant reply. Each chunk is appended and
/// the whole row upserted, so every committed content value is a prefix
/// of the next. Dropping the handle leaves whatever was committed.
pub struct ReplyStream {
    store: Arc<dyn SyncedStore>,
    streams: Arc<StreamRegistry>,
    stream: TextStream,
    row: Message,
    deltas: Vec<String>,
    generation: u64,
    user_message_id: String,
    created_chat: bool,
    title_task: Option<JoinHandle<()>>,
    done: bool,
}

impl ReplyStream {
    pub fn chat_id(&self) -> &str {
        &self.row.chat_id
    }

    pub fn created_chat(&self) -> bool {
        self.created_chat
    }

    pub fn user_message_id(&self) -> &str {
        &self.user_message_id
    }

    pub fn assistant_message_id(&self) -> &str {
        &self.row.id
    }

    pub fn content(&self) -> &str {
        &self.row.content
    }

    pub fn deltas(&self) -> &[String] {
        &self.deltas
    }

    /// Title generation task, present only on the chat's first exchange.
    pub fn title_task(&mut self) -> Option<JoinHandle<()>> {
        self.title_task.take()
    }

    /// Pulls one chunk, commits it, and returns it. `None` once the reply
    /// is complete; after an error the stream stays finished.
    pub async fn next_chunk(&mut self) -> Option<Result<String>> {
        if self.done {
            return None;
        }
        let Some(item) = self.stream.next().await else {
            self.done = true;
            return None;
        };
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };
        if !self
            .streams
            .is_current(&self.row.chat_id, self.generation)
            .await
        {
            self.done = true;
            return Some(Err(TideChatError::Superseded(self.row.chat_id.clone())));
        }
        if chunk.is_empty() {
            return Some(Ok(chunk));
        }
        self.deltas.push(chunk.clone());
        self.row.content.push_str(&chunk);
        if let Err(err) = self.store.upsert_message(self.row.clone()).await {
            self.done = true;
            return Some(Err(err));
        }
        Some(Ok(chunk))
    }

    pub async fn drive(mut self) -> Result<String> {
        while let Some(step) = self.next_chunk().await {
            step?;
        }
        Ok(self.row.content)
    }
}
