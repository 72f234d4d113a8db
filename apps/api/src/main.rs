mod backend_client;
mod config;
mod cv;
mod errors;
mod interview;
mod jobpost;
mod llm_client;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend_client::BackendClient;
use crate::config::{Config, SessionBackend};
use crate::interview::context::InterviewContextResolver;
use crate::jobpost::agent::{AgentTimeouts, SlotFillingAgent};
use crate::jobpost::normalize::NormalizationPipeline;
use crate::jobpost::redis_store::RedisSessionStore;
use crate::jobpost::session::{InMemorySessionStore, SessionStore};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting job post API v{}", env!("CARGO_PKG_VERSION"));

    // Session store
    let store = build_session_store(&config)?;

    // Initialize LLM client
    let llm = Arc::new(LlmClient::new(
        config.anthropic_api_key.clone(),
        config.llm_timeout,
    )?);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Recruiting backend (job submission + application lookups)
    let backend = Arc::new(BackendClient::new(
        config.backend_graphql_url.clone(),
        config.backend_api_key.clone(),
        config.submission_timeout,
    )?);
    info!("Backend client initialized ({})", config.backend_graphql_url);

    let agent = SlotFillingAgent::new(
        store,
        llm.clone(),
        backend.clone(),
        NormalizationPipeline::new(config.default_currency.clone()),
        AgentTimeouts {
            llm: config.llm_timeout,
            submission: config.submission_timeout,
        },
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        agent: Arc::new(agent),
        interviews: Arc::new(InterviewContextResolver::new(backend)),
        cv_parser: llm,
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(config.request_timeout))
            .layer(CorsLayer::permissive()), // TODO: restrict origins once the web client's domain is fixed
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// In-memory for a single process, Redis when sessions must survive restarts or
/// be shared between replicas (turns are then serialized by a Redis lease).
fn build_session_store(config: &Config) -> Result<Arc<dyn SessionStore>> {
    match config.session_backend {
        SessionBackend::Memory => {
            info!("Session store: in-memory");
            Ok(Arc::new(InMemorySessionStore::new()))
        }
        SessionBackend::Redis => {
            let url = config
                .redis_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("REDIS_URL is required for the redis session store"))?;
            let client = redis::Client::open(url)?;
            info!("Session store: redis (ttl {}s)", config.session_ttl_secs);
            Ok(Arc::new(RedisSessionStore::new(
                client,
                config.session_ttl_secs,
                config.request_timeout,
            )))
        }
    }
}
