mod api;
mod middleware;
mod store;

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing_subscriber::EnvFilter;
use waiverdesk_core::{AppConfig, Environment};
use waiverdesk_tin::TaxAuthorityClient;

use crate::{
    api::{build_app, rate_limit_state, AppState},
    middleware::AuthState,
    store::InMemoryApplicationStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = waiverdesk_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let is_development = matches!(config.env, Environment::Development);
    if is_development {
        if !config.upstream_configured() {
            tracing::warn!(
                "TAX_API_BASE_URL or TAX_API_KEY not set; TIN lookups will fail until configured"
            );
        }
    } else {
        config.require_upstream()?;
    }

    let tax_authority = TaxAuthorityClient::new(
        &config.tax_api_base_url,
        &config.tax_api_key,
        &config.tax_api_key_header,
        config.upstream_timeout_secs,
    )
    .context("failed to build tax authority client")?;

    let store = build_store(&config)?;
    let auth = AuthState::from_env(is_development)?;
    let app = build_app(
        AppState {
            store: Arc::new(store),
            tax_authority: Arc::new(tax_authority),
        },
        auth,
        rate_limit_state(config.rate_limit_per_minute),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = ?config.env, "waiverdesk server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_store(config: &AppConfig) -> anyhow::Result<InMemoryApplicationStore> {
    let Some(path) = config.seed_path.as_deref() else {
        return Ok(InMemoryApplicationStore::new());
    };

    let seed = waiverdesk_core::load_seed(path)?;
    let (waivers, aeo) = seed.into_applications(Utc::now())?;
    tracing::info!(
        path = %path.display(),
        duty_waivers = waivers.len(),
        aeo_applications = aeo.len(),
        "seeded application store"
    );
    Ok(InMemoryApplicationStore::with_records(waivers, aeo))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
