//! Main Entrypoint for the Interviewer API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the database connection pool and running migrations.
//! 3. Building shared services (prompt catalog, LLM client, room provisioner).
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use interviewer_api::{
    config::{Config, Provider},
    db::Db,
    rooms::LiveKitRooms,
    router::create_router,
    state::AppState,
};
use interviewer_core::{
    llm_client::{LLMClient, OpenAICompatibleClient},
    prompts::PromptCatalog,
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

fn load_catalog(config: &Config) -> anyhow::Result<PromptCatalog> {
    match &config.prompt_catalog_path {
        Some(path) => {
            info!(path = %path.display(), "Loading prompt catalog from file.");
            Ok(PromptCatalog::from_json_file(path)?)
        }
        None => {
            info!("Using built-in prompt catalog.");
            Ok(PromptCatalog::default())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Database ---
    let pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let db = Arc::new(Db::new(pool));
    db.run_migrations().await?;
    info!("Database connection established and migrations are up-to-date.");

    // --- 4. Initialize Shared Services ---
    let catalog = Arc::new(load_catalog(&config)?);

    let api_base = match config.provider {
        Provider::OpenAI => "https://api.openai.com/v1/",
        Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
    };
    let api_key = config
        .provider_api_key()
        .context("No API key configured for the selected provider")?;
    let llm_client: Arc<dyn LLMClient> = Arc::new(OpenAICompatibleClient::new(
        OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base),
        config.chat_model.clone(),
    ));

    let rooms = Arc::new(LiveKitRooms::new(config.livekit.clone()));

    let app_state = Arc::new(AppState {
        db,
        rooms,
        llm_client,
        catalog,
        config: Arc::new(config.clone()),
    });

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
