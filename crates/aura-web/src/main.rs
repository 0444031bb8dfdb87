mod error;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use aura_core::auth::MockAuthProvider;
use aura_core::coach::CoachService;
use aura_core::config::AuraConfig;
use aura_core::conversation::Assistant;
use aura_core::gate::SessionGate;
use aura_core::insight::InsightService;
use aura_core::llm::GeminiClient;
use aura_core::store::{self, Store};
use clap::Parser;

pub type Gate = SessionGate<Store, MockAuthProvider>;

#[derive(Parser)]
#[command(name = "aura-web", about = "Aura: personal health dashboard", version)]
struct Cli {
    /// Address to bind (overrides `web.host`)
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (overrides `web.port`)
    #[arg(short, long)]
    port: Option<u16>,
    /// Project directory whose `.aura/config.toml` and `.aura/config.local.toml` are merged
    #[arg(long)]
    config_dir: Option<PathBuf>,
    /// Extra config file merged last
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

pub struct AppState {
    pub gate: Gate,
    pub assistant: Assistant<CoachService>,
    pub insight: InsightService,
    pub config: AuraConfig,
}

impl AppState {
    /// Wire the collaborators. The session gate has read the persisted flag
    /// by the time this returns.
    pub async fn build(config: AuraConfig, store: Store, llm: Option<GeminiClient>) -> Self {
        let auth = MockAuthProvider::from_config(&config.auth);
        Self::with_auth(config, store, auth, llm).await
    }

    pub async fn with_auth(
        config: AuraConfig,
        store: Store,
        auth: MockAuthProvider,
        llm: Option<GeminiClient>,
    ) -> Self {
        let gate = SessionGate::initialize(store, auth).await;
        let assistant = Assistant::new(CoachService::new(llm.clone()), &config.assistant);
        let insight = InsightService::new(llm);
        Self {
            gate,
            assistant,
            insight,
            config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("aura_web=info,aura_core=info")),
        )
        .init();

    let cli = Cli::parse();

    let project_dir = match cli.config_dir {
        Some(dir) => Some(dir),
        None => std::env::current_dir().ok(),
    };
    let mut config = AuraConfig::load(project_dir.as_deref(), cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let store = store::create_store(&config).context("failed to open storage")?;
    tracing::info!(backend = store.backend_name(), "storage ready");

    let llm = GeminiClient::from_config(&config.llm)?;
    if let Some(client) = &llm {
        tracing::info!(model = client.model(), "generative backend configured");
    }

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let state = Arc::new(AppState::build(config, store, llm).await);

    let app = routes::router()
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    tracing::info!("aura-web listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
