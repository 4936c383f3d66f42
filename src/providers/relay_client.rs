use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TideChatError};
use crate::interfaces::providers::{
    CompletionProvider, CompletionRequest, TextStream, WireMessage,
};

/// [`CompletionProvider`] that talks to a running relay daemon instead of
/// the upstream API directly. The relay wire carries only messages and
/// temperature; the relay pins model, max_tokens and prompts.
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .build()
            .map_err(|e| TideChatError::Runtime(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let url = join_url(&self.base_url, path);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| TideChatError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<RelayErrorBody>(&body_text)
                .map(|parsed| parsed.error)
                .unwrap_or(body_text);
            return Err(TideChatError::Http(format!(
                "relay request failed with status {status}: {detail}"
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl CompletionProvider for RelayClient {
    async fn open_stream(&self, request: CompletionRequest) -> Result<TextStream> {
        let body = RelayReplyBody {
            messages: &request.messages,
            temperature: request.temperature,
        };
        let response = self.post_json("/api/claude", &body).await?;
        let stream = Box::pin(try_stream! {
            let mut body = response.bytes_stream();
            let mut decoder = Utf8Decoder::default();
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| TideChatError::Http(e.to_string()))?;
                let text = decoder.push(&chunk);
                if !text.is_empty() {
                    yield text;
                }
            }
        });
        Ok(stream)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = RelayTitleBody {
            messages: &request.messages,
        };
        let response = self.post_json("/api/claude/title", &body).await?;
        response
            .text()
            .await
            .map_err(|e| TideChatError::Http(e.to_string()))
    }
}

#[derive(Serialize)]
struct RelayReplyBody<'a> {
    messages: &'a [WireMessage],
    temperature: f64,
}

#[derive(Serialize)]
struct RelayTitleBody<'a> {
    messages: &'a [WireMessage],
}

#[derive(Deserialize)]
struct RelayErrorBody {
    error: String,
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Reassembles UTF-8 text from a byte stream whose chunk boundaries may
/// split a multi-byte character.
#[derive(Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                text
            }
            // error_len of None means the buffer ends mid-character, so the
            // tail stays pending until the next chunk completes it.
            Err(err) if err.error_len().is_none() => {
                let rest = self.pending.split_off(err.valid_up_to());
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending = rest;
                text
            }
            Err(_) => {
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                text
            }
        }
    }
}
