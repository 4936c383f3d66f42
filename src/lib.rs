pub mod analysis;
pub mod auth;
pub mod churn;
pub mod config;
pub mod domains;
pub mod error;
pub mod interfaces;
pub mod providers;
pub mod relay;
pub mod seed;
pub mod services;

pub use crate::analysis::{analyze, analyze_latest, render_params, RenderParams, ResponseAnalysis};
pub use crate::auth::{SessionClaims, TokenSigner};
pub use crate::churn::ChurnGenerator;
pub use crate::config::Config;
pub use crate::domains::chat::{Chat, Message, Role, User};
pub use crate::error::{Result, TideChatError};
pub use crate::interfaces::providers::{CompletionProvider, CompletionRequest, WireMessage};
pub use crate::interfaces::store::{RowEvent, SyncedStore};
pub use crate::providers::anthropic::AnthropicProvider;
pub use crate::providers::memory::InMemoryStore;
pub use crate::providers::relay_client::RelayClient;
pub use crate::relay::RelayState;
pub use crate::services::session::{ChatSettings, ReplyStream, SessionService};
