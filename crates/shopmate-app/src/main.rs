//! Shopmate application binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Build the generation, search and fetch clients
//! 3. Start the idle-session sweeper
//! 4. Serve the axum API until Ctrl-C

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use shopmate_api::state::AppState;
use shopmate_assistant::{Collaborators, ShoppingAssistant};
use shopmate_core::config::ShopmateConfig;
use shopmate_providers::{HttpContentFetcher, OpenAiCompatibleClient, SerperClient};

use cli::CliArgs;

/// Build every external client from configuration and the environment.
fn build_collaborators(config: &ShopmateConfig) -> Result<Collaborators, Box<dyn std::error::Error>> {
    let primary = OpenAiCompatibleClient::from_env(&config.primary)?;
    let secondary = OpenAiCompatibleClient::from_env(&config.secondary)?;
    let search = Arc::new(SerperClient::from_env(&config.search)?);
    let fetcher = HttpContentFetcher::new(&config.fetch)?;

    tracing::info!(
        primary = %config.primary.label,
        primary_model = %config.primary.model,
        secondary = %config.secondary.label,
        secondary_model = %config.secondary.model,
        "Generation backends configured"
    );

    Ok(Collaborators {
        primary: Arc::new(primary),
        secondary: Arc::new(secondary),
        shopping: search.clone(),
        web: search,
        fetcher: Arc::new(fetcher),
    })
}

/// Periodically evict idle sessions.
async fn session_sweeper(assistant: Arc<ShoppingAssistant>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        interval.tick().await;
        match assistant.sweep() {
            Ok(0) => {}
            Ok(evicted) => tracing::info!(evicted, "Idle sessions evicted"),
            Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing so its log level can seed the filter.
    let config_file = args.resolve_config_path();
    let loaded = ShopmateConfig::load(&config_file);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => ShopmateConfig::default(),
    };

    // Tracing.
    let filter = args.resolve_log_filter(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&filter)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Shopmate v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Ok(_) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Err(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Using default configuration"
        ),
    }

    config.general.host = args.resolve_host(&config.general.host);
    config.general.port = args.resolve_port(config.general.port);

    let collaborators = match build_collaborators(&config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to configure external services");
            return Err(e);
        }
    };

    let assistant = Arc::new(ShoppingAssistant::new(collaborators, &config));
    tracing::info!(
        ttl_minutes = config.session.ttl_minutes,
        max_clarification_rounds = config.session.max_clarification_rounds,
        "Assistant ready"
    );

    // === Background tasks ===

    let sweeper = tokio::spawn(session_sweeper(
        Arc::clone(&assistant),
        config.session.sweep_interval_secs,
    ));

    // === API server ===

    let state = AppState::from_shared(assistant);
    let result = shopmate_api::start_server(&config, state, shutdown_signal()).await;
    sweeper.abort();

    if let Err(e) = result {
        tracing::error!(error = %e, "API server stopped with an error");
        return Err(e.into());
    }
    tracing::info!("Shopmate stopped");
    Ok(())
}
