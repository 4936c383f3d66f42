use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tidechat::analysis;
use tidechat::error::{Result, TideChatError};
use tidechat::interfaces::providers::CompletionProvider;
use tidechat::interfaces::store::SyncedStore;
use tidechat::providers::anthropic::AnthropicProvider;
use tidechat::providers::memory::InMemoryStore;
use tidechat::providers::relay_client::RelayClient;
use tidechat::seed;
use tidechat::services::session::SessionService;

#[derive(Parser, Debug)]
#[command(name = "tidechat")]
#[command(about = "Submit one message through the session core and stream the reply")]
struct Cli {
    /// Message to send.
    message: String,

    /// Base URL of a running relay daemon. When set, completions go
    /// through it instead of straight to the API.
    #[arg(long)]
    relay: Option<String>,

    /// Anthropic API key for the direct path.
    #[arg(long, env = "ANTHROPIC_API_KEY", default_value = "")]
    anthropic_api_key: String,

    /// Model override for the direct path.
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let provider: Arc<dyn CompletionProvider> = match &cli.relay {
        Some(base_url) => Arc::new(RelayClient::new(base_url.clone())?),
        None => {
            if cli.anthropic_api_key.is_empty() {
                return Err(TideChatError::Config(
                    "set ANTHROPIC_API_KEY or pass --relay".to_string(),
                ));
            }
            let mut anthropic = AnthropicProvider::new(cli.anthropic_api_key.clone());
            if let Some(model) = cli.model.clone() {
                anthropic = anthropic.with_model(model);
            }
            Arc::new(anthropic)
        }
    };

    let store = Arc::new(InMemoryStore::new());
    seed::apply(store.as_ref()).await?;
    let service = SessionService::new(store.clone(), provider);

    let Some(mut reply) = service
        .submit(None, &[], &cli.message, seed::DEMO_USER_IDS[0])
        .await?
    else {
        return Err(TideChatError::Runtime("message is empty".to_string()));
    };
    let title_task = reply.title_task();

    while let Some(chunk) = reply.next_chunk().await {
        let chunk = chunk?;
        print!("{chunk}");
        let _ = std::io::stdout().flush();
    }
    println!();

    let analysis = analysis::analyze(reply.content());
    println!(
        "profile: load {:.2} valence {:.2} flow {:.2} ({} words)",
        analysis.cognitive_load,
        analysis.emotional_valence,
        analysis.creative_flow,
        analysis.word_count
    );

    if let Some(task) = title_task {
        let _ = task.await;
        if let Some(chat) = store.get_chat(reply.chat_id()).await? {
            println!("title: {}", chat.title);
        }
    }
    Ok(())
}
