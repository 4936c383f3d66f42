use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::domains::chat::Message;
use crate::error::Result;

pub type TextStream = BoxStream<'static, Result<String>>;

pub const REPLY_MAX_TOKENS: u32 = 1024;
pub const TITLE_MAX_TOKENS: u32 = 100;
pub const TITLE_TEMPERATURE: f64 = 0.7;
pub const TITLE_PROMPT: &str = "Generate a very brief title (2-4 words) for this conversation. \
     Respond with only the title, no explanation or punctuation.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<WireMessage>,
    pub system: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn reply(messages: Vec<WireMessage>, system: Option<String>, temperature: f64) -> Self {
        Self {
            messages,
            system,
            temperature,
            max_tokens: REPLY_MAX_TOKENS,
        }
    }

    pub fn title(messages: Vec<WireMessage>) -> Self {
        Self {
            messages,
            system: Some(TITLE_PROMPT.to_string()),
            temperature: TITLE_TEMPERATURE,
            max_tokens: TITLE_MAX_TOKENS,
        }
    }
}

/// Upstream completion backend. `open_stream` resolves once the response is
/// open, so callers can distinguish a request that never started from a
/// stream that failed midway.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn open_stream(&self, request: CompletionRequest) -> Result<TextStream>;

    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}
