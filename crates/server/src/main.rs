use std::sync::Arc;

use anyhow::Context;
use db::DBService;
use server::{app, config::Config, state::AppState};
use services::services::{
    affirmations::AffirmationGenerator,
    auth_provider::{AuthProviderClient, TokenVerifier},
    database_validator::DatabaseValidator,
    gemini_api::GeminiApiClient,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal in deployed environments.
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("server=info,services=info,db=info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    let config = Config::from_env().context("invalid configuration")?;

    let db = DBService::new(&config.database_url)
        .await
        .context("failed to open database")?;
    let validation = DatabaseValidator::new(db.pool.clone())
        .ensure_ready()
        .await
        .context("database is not ready")?;
    info!(summary = %validation.summary(), "Database validated");

    let mut gemini = GeminiApiClient::new(
        config.gemini_api_key.clone(),
        Some(config.gemini_model.clone()),
    )?;
    if let Some(base_url) = &config.gemini_base_url {
        gemini = gemini.with_base_url(base_url.as_str());
    }
    info!(model = %gemini.model(), "Gemini client ready");

    let auth = AuthProviderClient::new(&config.auth_url, config.auth_service_key.clone())?;
    let verifier = TokenVerifier::new(&config.auth_jwt_secret);

    let state = AppState::new(
        db,
        AffirmationGenerator::new(Arc::new(gemini)),
        auth,
        verifier,
    );
    let router = app(state, config.cors_origin.as_deref());

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
