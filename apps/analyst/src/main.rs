mod agent;
mod cli;
mod config;
mod document;
mod errors;
mod llm_client;
mod models;
mod pii;
mod routes;
mod sessions;
mod state;
#[cfg(test)]
mod test_support;
mod tools;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::agent::{Agent, AgentConfig};
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::document::FsDocumentReader;
use crate::llm_client::{LanguageModel, LlmClient};
use crate::routes::build_router;
use crate::sessions::SessionStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging; stdout is reserved for analysis output
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Resume Analyst v{}", env!("CARGO_PKG_VERSION"));

    let llm: Arc<dyn LanguageModel> = Arc::new(LlmClient::new(config.llm_settings())?);
    info!("LLM client initialized (model: {})", config.model);

    match cli.command {
        Command::Analyze(args) => {
            let agent = Agent::new(config.agent_config(), llm, Arc::new(FsDocumentReader));
            cli::run_analyze(&agent, args).await
        }
        Command::Serve { port } => {
            // Served runs may only read files under the resume directory
            let root = config.prepare_resume_dir()?;
            info!("Resume directory: {}", root.display());
            let agent_config = AgentConfig {
                document_root: Some(root),
                ..config.agent_config()
            };
            let agent = Arc::new(Agent::new(agent_config, llm, Arc::new(FsDocumentReader)));
            serve(&config, agent, port.unwrap_or(config.port)).await
        }
    }
}

async fn serve(config: &Config, agent: Arc<Agent>, port: u16) -> Result<()> {
    let sessions = Arc::new(SessionStore::new());
    sessions.spawn_sweeper(config.session_ttl);

    let state = AppState {
        agent,
        sessions,
        run_timeout: config.run_timeout,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
