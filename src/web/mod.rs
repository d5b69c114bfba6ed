//! HTTP and WebSocket surface over the engagement service.

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;
pub mod utils;

use std::error::Error;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::registry::ConnectionRegistry;
use crate::seed::seed_demo_data;
use crate::service::StartupLink;
use crate::store::EntityStore;

use config::{Cli, Config};
use state::AppState;

/// Router over an already wired service.
pub fn app(service: StartupLink) -> Router {
    router::build_router(AppState::shared(service))
}

/// Entry point: parse CLI, seed the store, serve until ctrl-c.
pub async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = Config::from_cli_and_env(cli);

    crate::logging::init(&config.log_filter);
    info!("startuplink starting");

    let store = Arc::new(EntityStore::new());
    if config.seed_demo_data {
        let summary = match config.seed {
            Some(seed) => seed_demo_data(&store, &mut StdRng::seed_from_u64(seed)),
            None => seed_demo_data(&store, &mut rand::thread_rng()),
        };
        info!(
            users = summary.users,
            startups = summary.startups,
            groups = summary.groups,
            "seeded demo data"
        );
    }

    let registry = ConnectionRegistry::new(config.registry.clone());
    let (service, _worker) = StartupLink::new(store, registry, config.dispatch.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(service.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.flush_notifications().await;
    info!("startuplink stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
