//! Runs the Excuse server, puts two excuses through the client and queries
//! them back.
//!
//! Configuration comes from `excuses.toml` (optional), `.env` and
//! `REST_CONTRACTS__*` variables.

use std::sync::Arc;

use anyhow::Context;
use excuses::contract::{ExcuseApi, ExcuseFilter, ExcuseId, ExcuseQuality, NewExcuse};
use excuses::server::{router, ExcuseStore};
use rest_contracts::config::{ConfigLoader, DEFAULT_ENV_PREFIX};
use rest_contracts::prelude::*;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .with_development()
        .with_dotenv()?
        .with_optional_file("excuses.toml")?
        .with_env_prefix(DEFAULT_ENV_PREFIX)
        .load()
        .context("loading configuration")?;
    init_logging(&config.logging.to_log_config())?;

    let api = ExcuseApi::new()?;
    let server_config = config.server.to_server_config();
    let listener = TcpListener::bind(server_config.http_addr())
        .await
        .with_context(|| format!("binding {}", server_config.http_addr()))?;
    let addr = listener.local_addr()?;

    let shutdown = ShutdownSignal::new();
    let server = Server::new(server_config, router(&api, Arc::new(ExcuseStore::default())));
    let running = tokio::spawn(server.serve(listener, shutdown.clone()));

    let base_url = config
        .client
        .base_url
        .clone()
        .unwrap_or_else(|| format!("http://127.0.0.1:{}", addr.port()));
    let client = ClientFactory::new(&base_url)?.with_defaults(config.client.to_request_options()?);

    let put = client.request_fn(&api.put);
    put.call(&NewExcuse {
        id: Some(ExcuseId::new("df458df")),
        quality: ExcuseQuality::Poor,
        description: "I don't use a type checker; I enjoy debugging in production.".into(),
    })
    .await?;
    tracing::info!("Put the first excuse");

    put.call(&NewExcuse {
        id: Some(ExcuseId::new("asdflewi")),
        quality: ExcuseQuality::Poor,
        description: "My nervous system has a built-in type checker.".into(),
    })
    .await?;
    tracing::info!("Put the second excuse");

    let lame = client
        .request_fn(&api.query)
        .call(&ExcuseFilter {
            quality: Some(ExcuseQuality::Poor),
        })
        .await?;
    for excuse in &lame {
        tracing::info!(id = %excuse.id, description = %excuse.description, "Retrieved excuse");
    }

    shutdown.trigger();
    running.await??;
    Ok(())
}
