#![allow(dead_code)]

use std::collections::VecDeque;

use async_stream::try_stream;
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use tidechat::error::{Result, TideChatError};
use tidechat::interfaces::providers::{CompletionProvider, CompletionRequest, TextStream};

pub enum ScriptedChunk {
    Text(&'static str),
    Fail(&'static str),
}

/// Completion fake with a queue of scripted streams and title results.
/// Every request is recorded so tests can assert on the wire payloads.
pub struct QueueCompletionProvider {
    scripts: Mutex<VecDeque<Vec<ScriptedChunk>>>,
    titles: Mutex<VecDeque<Result<String>>>,
    pub stream_requests: Mutex<Vec<CompletionRequest>>,
    pub title_requests: Mutex<Vec<CompletionRequest>>,
    open_failure: Mutex<Option<String>>,
}

impl QueueCompletionProvider {
    pub fn new(scripts: Vec<Vec<ScriptedChunk>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            titles: Mutex::new(VecDeque::new()),
            stream_requests: Mutex::new(Vec::new()),
            title_requests: Mutex::new(Vec::new()),
            open_failure: Mutex::new(None),
        }
    }

    pub fn queue_script(&self, chunks: Vec<ScriptedChunk>) {
        futures::executor::block_on(self.scripts.lock()).push_back(chunks);
    }

    pub fn queue_title(&self, result: Result<String>) {
        futures::executor::block_on(self.titles.lock()).push_back(result);
    }

    pub fn fail_next_open(&self, message: &'static str) {
        *futures::executor::block_on(self.open_failure.lock()) = Some(message.to_string());
    }

    pub fn stream_request_count(&self) -> usize {
        futures::executor::block_on(self.stream_requests.lock()).len()
    }

    pub fn title_request_count(&self) -> usize {
        futures::executor::block_on(self.title_requests.lock()).len()
    }
}

#[async_trait]
impl CompletionProvider for QueueCompletionProvider {
    async fn open_stream(&self, request: CompletionRequest) -> Result<TextStream> {
        if let Some(message) = self.open_failure.lock().await.take() {
            return Err(TideChatError::Http(message));
        }
        self.stream_requests.lock().await.push(request);
        let chunks = self.scripts.lock().await.pop_front().unwrap_or_default();
        let stream = Box::pin(try_stream! {
            for chunk in chunks {
                match chunk {
                    ScriptedChunk::Text(text) => yield text.to_string(),
                    ScriptedChunk::Fail(message) => {
                        Err(TideChatError::Stream(message.to_string()))?;
                    }
                }
            }
        });
        Ok(stream)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.title_requests.lock().await.push(request);
        self.titles
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok("Generated Title".to_string()))
    }
}

/// Completion fake whose streams are fed chunk by chunk from the test
/// body, for interleaving two in-flight replies deterministically.
pub struct ChannelCompletionProvider {
    receivers: Mutex<VecDeque<mpsc::Receiver<Result<String>>>>,
}

impl ChannelCompletionProvider {
    pub fn new() -> Self {
        Self {
            receivers: Mutex::new(VecDeque::new()),
        }
    }

    /// Queues one stream and returns its feeding end. Dropping the sender
    /// ends the stream.
    pub fn add_stream(&self) -> mpsc::Sender<Result<String>> {
        let (tx, rx) = mpsc::channel(16);
        futures::executor::block_on(self.receivers.lock()).push_back(rx);
        tx
    }
}

#[async_trait]
impl CompletionProvider for ChannelCompletionProvider {
    async fn open_stream(&self, _request: CompletionRequest) -> Result<TextStream> {
        let Some(mut receiver) = self.receivers.lock().await.pop_front() else {
            return Err(TideChatError::Http("no scripted stream queued".to_string()));
        };
        Ok(Box::pin(async_stream::stream! {
            while let Some(item) = receiver.recv().await {
                yield item;
            }
        }))
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<String> {
        Ok("Channel Title".to_string())
    }
}
