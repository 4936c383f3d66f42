use std::sync::Arc;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use tidechat::auth::TokenSigner;
use tidechat::config::Config;
use tidechat::error::{Result, TideChatError};
use tidechat::interfaces::providers::CompletionProvider;
use tidechat::providers::anthropic::AnthropicProvider;
use tidechat::relay::{self, RelayState};

#[derive(Parser, Debug)]
#[command(name = "tidechatd")]
#[command(about = "Completion relay daemon: demo login plus streaming Claude endpoints")]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 3001)]
    port: u16,

    /// Optional JSON config file; flags and environment win over it.
    #[arg(long)]
    config: Option<String>,

    /// Anthropic API key. Without one the completion endpoints answer 500.
    #[arg(long, env = "ANTHROPIC_API_KEY", default_value = "")]
    anthropic_api_key: String,

    /// Secret for signing session cookies.
    #[arg(long, env = "TIDECHAT_AUTH_SECRET", default_value = "")]
    auth_secret: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tidechat=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let api_key = if cli.anthropic_api_key.is_empty() {
        config.api_key().map(|key| key.to_string())
    } else {
        Some(cli.anthropic_api_key.clone())
    };
    let secret = if cli.auth_secret.is_empty() {
        config.auth_secret().map(|secret| secret.to_string())
    } else {
        Some(cli.auth_secret.clone())
    };
    let Some(secret) = secret else {
        return Err(TideChatError::Config(
            "auth secret is required (set TIDECHAT_AUTH_SECRET)".to_string(),
        ));
    };

    let completion: Option<Arc<dyn CompletionProvider>> = api_key.map(|key| {
        let mut provider = AnthropicProvider::new(key);
        if let Some(model) = config.model() {
            provider = provider.with_model(model);
        }
        if let Some(base_url) = config.base_url() {
            provider = provider.with_base_url(base_url);
        }
        Arc::new(provider) as Arc<dyn CompletionProvider>
    });
    if completion.is_none() {
        warn!("ANTHROPIC_API_KEY is not set; /api/claude endpoints will answer 500");
    }

    let state = RelayState::new(completion, TokenSigner::new(secret.as_bytes()));
    relay::run(&cli.host, cli.port, state).await
}
