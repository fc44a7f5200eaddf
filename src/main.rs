use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biomarker_assistant::{
    config::Config,
    dataset::Dataset,
    llm::{LLMProviderConfig, LLM},
    routes::create_router,
    AppState,
};

/// Clinical biomarker API server with an AI assistant
#[derive(Parser, Debug)]
#[command(name = "biomarker-assistant", version, about)]
struct Cli {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Patient seed file (overrides PATIENTS_DATA_PATH)
    #[arg(long)]
    patients: Option<PathBuf>,

    /// Biomarker seed file (overrides BIOMARKERS_DATA_PATH)
    #[arg(long)]
    biomarkers: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "biomarker_assistant=debug,tower_http=debug,axum=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(path) = cli.patients {
        config.data.patients_path = path;
    }
    if let Some(path) = cli.biomarkers {
        config.data.biomarkers_path = path;
    }
    info!("Configuration loaded: {:?}", config.server);

    let dataset = Dataset::load(&config.data.patients_path, &config.data.biomarkers_path)?;

    if !config.llm.has_api_key() {
        warn!("No LLM API key configured; chat and insights requests will fail");
    }
    let llm = LLM::new(LLMProviderConfig::from(&config.llm))?;
    info!(provider = %llm.provider_name(), model = %config.llm.model, "LLM client ready");

    // Create shared state
    let state = AppState {
        config: config.clone(),
        dataset: Arc::new(dataset),
        llm: Arc::new(llm),
    };

    let app = create_router(state);

    // Start server
    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| {
            format!("Failed to bind {}:{}", config.server.host, config.server.port)
        })?;
    info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
