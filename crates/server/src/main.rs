mod config;
mod error;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use registry::Registry;
use runtime::{HttpToolServer, OpenAiBackend, Orchestrator, ToolClient};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::Result;
use routes::AppState;

const CONFIG_FILE: &str = "stevedore.toml";

#[derive(Parser)]
#[command(name = "stevedore")]
#[command(about = "An OpenAI-compatible chat gateway with server-side tool execution", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Override the listen address from the config
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        warn!(path = %cli.config.display(), "config file not found, using defaults");
        Config::default()
    };
    let listen = cli.listen.unwrap_or_else(|| config.server.listen.clone());

    let registry = match &config.tools {
        Some(path) => Arc::new(Registry::load(path)?),
        None => Arc::new(Registry::empty()),
    };
    info!(tools = registry.snapshot().len(), "tool registry loaded");

    let mut client = ToolClient::new();
    for backend in &config.backends {
        info!(name = %backend.name, url = %backend.url, "registering tool backend");
        client = client.with_transport(Arc::new(HttpToolServer::new(&backend.name, &backend.url)));
    }

    let mut builder = OpenAiBackend::builder(&config.upstream.base_url);
    if let Some(key) = config.upstream.resolve_api_key() {
        builder = builder.api_key(key);
    } else {
        warn!("no upstream api key configured");
    }
    let backend = Arc::new(builder.build());

    let orchestrator = Arc::new(Orchestrator::new(
        backend,
        Arc::clone(&registry),
        client,
        config.limits.to_limits(),
    ));

    let state = Arc::new(AppState {
        orchestrator,
        registry,
        tools_path: config.tools.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!(
        %listen,
        upstream = %config.upstream.base_url,
        "stevedore v{} listening",
        env!("CARGO_PKG_VERSION")
    );
    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
