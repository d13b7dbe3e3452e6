//! PacePing HTTP service entry point.
//!
//! # Purpose
//! Loads configuration, prepares storage and the autocompletion index,
//! registers the slash commands, then serves the interactions endpoint and the
//! metrics listener.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup logic.
use anyhow::Context;
use paceping::app::{AppState, build_router};
use paceping::auth::access::AccessGuard;
use paceping::config::{self, DiscordConfig, PacePingConfig};
use paceping::discord::client::DiscordClient;
use paceping::discord::commands::command_definitions;
use paceping::discord::verify::InteractionVerifier;
use paceping::observability;
use paceping::platform::ChatPlatform;
use paceping::service::PaceService;
use paceping::store::{PaceStore, memory::InMemoryStore, postgres::PostgresStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenv::dotenv();
    let config = PacePingConfig::from_env_or_yaml().context("paceping config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: PacePingConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("paceping")?;
    let client = DiscordClient::new(
        config.discord.api_base.clone(),
        config.discord.token.clone(),
        Duration::from_secs(config.discord.role_cache_ttl_secs),
    );
    if config.discord.register_commands {
        sync_commands(&client, &config.discord).await;
    }
    let state = build_state(&config, Arc::new(client)).await?;
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, "paceping listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

/// Overwrite the registered slash commands; failures only warn.
async fn sync_commands(client: &DiscordClient, discord: &DiscordConfig) {
    let Some(application_id) = discord.application_id.as_deref() else {
        tracing::info!("DISCORD_APPLICATION_ID not set; skipping command registration");
        return;
    };
    let guild_id = discord.guild_id.as_deref();
    match client
        .register_commands(application_id, guild_id, &command_definitions())
        .await
    {
        Ok(count) => tracing::info!(count, ?guild_id, "slash commands registered"),
        Err(err) => tracing::warn!(error = %err, ?guild_id, "slash command registration failed"),
    }
}

async fn build_state(
    config: &PacePingConfig,
    platform: Arc<dyn ChatPlatform>,
) -> anyhow::Result<AppState> {
    let verifier = InteractionVerifier::from_hex(&config.discord.public_key)
        .context("parse DISCORD_PUBLIC_KEY")?;
    let store: Arc<dyn PaceStore> = match config.storage {
        config::StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        config::StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(PostgresStore::connect(pg).await?)
        }
    };
    tracing::info!(
        backend = store.backend_name(),
        durable = store.is_durable(),
        "storage ready"
    );

    let guard = AccessGuard::new(&config.elevated_role);
    tracing::info!(roles = ?guard.allowed_roles(), "access guard ready");
    let service = PaceService::new(
        store,
        platform.clone(),
        guard,
        config.ping_channel_id.clone(),
    );
    let labels = service.refresh_index().await?;
    tracing::info!(labels, "autocompletion index loaded");

    Ok(AppState {
        service: Arc::new(service),
        platform,
        verifier: Arc::new(verifier),
    })
}
