use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TideChatError};
use crate::interfaces::providers::{
    CompletionProvider, CompletionRequest, TextStream, WireMessage,
};

pub const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn send(&self, request: &CompletionRequest, stream: bool) -> Result<reqwest::Response> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            messages: &request.messages,
            temperature: request.temperature,
            system: request.system.as_deref(),
            stream,
        };
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| TideChatError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorResponse>(&body_text)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body_text);
            return Err(TideChatError::Http(format!(
                "completion request failed with status {status}: {detail}"
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    async fn open_stream(&self, request: CompletionRequest) -> Result<TextStream> {
        let response = self.send(&request, true).await?;
        let stream = Box::pin(try_stream! {
            let mut body = response.bytes_stream();
            let mut scanner = SseScanner::default();
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| TideChatError::Http(e.to_string()))?;
                scanner.push(&chunk);
                while let Some(data) = scanner.next_data() {
                    match parse_stream_event(&data)? {
                        StreamEvent::ContentBlockDelta {
                            delta: DeltaPayload::TextDelta { text },
                        } => {
                            yield text;
                        }
                        StreamEvent::Error { error } => {
                            Err(TideChatError::Stream(error.message))?;
                        }
                        StreamEvent::MessageStop => return,
                        _ => {}
                    }
                }
            }
        });
        Ok(stream)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let response = self.send(&request, false).await?;
        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| TideChatError::Serialization(e.to_string()))?;
        let text = parsed
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<String>();
        Ok(text)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [WireMessage],
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart,
    ContentBlockStart,
    ContentBlockDelta { delta: DeltaPayload },
    ContentBlockStop,
    MessageDelta,
    MessageStop,
    Ping,
    Error { error: ApiErrorBody },
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DeltaPayload {
    TextDelta { text: String },
    #[serde(other)]
    Unknown,
}

fn parse_stream_event(data: &str) -> Result<StreamEvent> {
    serde_json::from_str(data).map_err(|e| TideChatError::Serialization(e.to_string()))
}

/// Incremental server-sent-events reader. Frames are delimited by a blank
/// line; carriage returns are dropped on ingest, which is safe because the
/// data lines are JSON and JSON escapes any literal CR.
#[derive(Default)]
struct SseScanner {
    buffer: Vec<u8>,
}

impl SseScanner {
    fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes.iter().filter(|&&b| b != b'\r'));
    }

    fn next_data(&mut self) -> Option<String> {
        loop {
            let end = self
                .buffer
                .windows(2)
                .position(|pair| pair == b"\n\n")?
                + 2;
            let frame: Vec<u8> = self.buffer.drain(..end).collect();
            let frame = String::from_utf8_lossy(&frame);
            let data = frame
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|line| line.strip_prefix(' ').unwrap_or(line))
                .collect::<Vec<_>>()
                .join("\n");
            if !data.is_empty() {
                return Some(data);
            }
        }
    }
}
