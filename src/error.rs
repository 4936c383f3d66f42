use thiserror::Error;

#[derive(Error, Debug)]
pub enum TideChatError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("completion stream error: {0}")]
    Stream(String),

    #[error("stream superseded for chat {0}")]
    Superseded(String),

    #[error("permission advisory: {0}")]
    PermissionAdvisory(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, TideChatError>;
