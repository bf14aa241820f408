// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use ephemeral_share::{
    api::router,
    config::ServerConfig,
    logging::{init_tracing, LogFormat},
    reaper::LinkReaper,
    state::AppState,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    init_tracing(LogFormat::from_env());

    let config = ServerConfig::from_env().expect("Invalid configuration");

    let state = AppState::from_config(&config).expect("Failed to initialize storage");
    tracing::info!(
        storage = %config.storage_dir.display(),
        audit_log = %config.audit_log_path.display(),
        max_downloads = config.max_downloads,
        link_expiry_secs = config.link_expiry.as_secs(),
        "Ephemeral share backend initialized"
    );

    let shutdown = CancellationToken::new();
    let reaper = LinkReaper::new(
        state.registry.clone(),
        config.reaper_interval,
        config.reaper_grace,
    );
    let reaper_task = tokio::spawn(reaper.run(shutdown.clone()));

    let app = router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!("Ephemeral share listening on http://{addr} (docs at /docs)");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                }
                _ = server_shutdown.cancelled() => {}
            }
        })
        .await
        .expect("HTTP server failed");

    shutdown.cancel();
    let _ = reaper_task.await;
}
