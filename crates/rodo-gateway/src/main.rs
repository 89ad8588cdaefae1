use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use rodo_agent::{GeminiProvider, PromptTemplate, StoreMarketContext, TurnOrchestrator};
use rodo_core::config::RodoConfig;
use rodo_gateway::app::{self, AppState};
use rodo_store::ConversationStore;
use rodo_whatsapp::{KapsoClient, MessageSender};

#[derive(Parser)]
#[command(name = "rodo-gateway", about = "WhatsApp relay for the grain-broker assistant")]
struct Cli {
    /// Path to rodo.toml (defaults to ~/.rodo/rodo.toml)
    #[arg(long, env = "RODO_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rodo_gateway=info,rodo_agent=info,tower_http=debug".into()
            }),
        )
        .init();

    // load config: --config > RODO_CONFIG env > ~/.rodo/rodo.toml
    let cli = Cli::parse();
    let config = RodoConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        let mut config = RodoConfig::default();
        config.apply_fallbacks(|name| std::env::var(name).ok());
        config
    });

    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");
    let store = Arc::new(
        ConversationStore::open(&db_path)
            .with_context(|| format!("cannot open database at {db_path}"))?,
    );

    // external clients fail fast here rather than on the first message
    let provider = GeminiProvider::new(&config.providers.gemini)
        .context("Gemini provider is not configured")?;
    let sender: Arc<dyn MessageSender> = Arc::new(
        KapsoClient::new(&config.whatsapp).context("Kapso client is not configured")?,
    );
    if config.whatsapp.webhook_secret().is_none() {
        warn!("whatsapp.webhook_secret is not set: signatures are not checked and GET verification always fails");
    }

    let market = StoreMarketContext::new(Arc::clone(&store), config.market.freshness_hours);
    let template = PromptTemplate::load(config.agent.prompt_path.as_deref(), &config.agent.name);
    let orchestrator = Arc::new(TurnOrchestrator::new(
        Arc::clone(&store),
        Box::new(provider),
        Box::new(market),
        template,
        &config.agent,
    ));

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    info!(
        agent = %config.agent.name,
        model = %config.agent.model,
        provider = orchestrator.provider_name(),
        "agent ready"
    );

    let state = Arc::new(AppState::new(config, store, orchestrator, sender));
    let router = app::build_router(state);

    info!("Rodo gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

/// Create the database's parent directory if it does not exist yet.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "cannot create database directory");
            }
        }
    }
}
