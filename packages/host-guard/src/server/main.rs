// Main entry point for the host guard server

use anyhow::{Context, Result};
use host_guard_core::common::{hash_identifier, SystemClock};
use host_guard_core::kernel::{start_scheduler, OutboxDelivery, ServerDeps};
use host_guard_core::server::middleware::{HostUiToken, TrustedProxies};
use host_guard_core::server::{build_app, build_host_ui_app};
use host_guard_core::Config;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Codes waiting for the mailer before delivery starts failing
const OUTBOX_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,host_guard_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting host guard");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // OTP outbox. A host mailer takes over the receiving end; standalone,
    // codes are drained and dropped.
    let (outbox, mut outbox_rx) = OutboxDelivery::channel(OUTBOX_CAPACITY);
    tokio::spawn(async move {
        while let Some(message) = outbox_rx.recv().await {
            tracing::warn!(
                identifier_hash = %hash_identifier(&message.to),
                "No mailer attached, OTP dropped"
            );
        }
    });

    let deps = ServerDeps::from_config(&config, Arc::new(outbox), Arc::new(SystemClock))
        .context("Failed to build server dependencies")?;

    // Keep the scheduler alive for the life of the server
    let _scheduler = start_scheduler(deps.otp.clone())
        .await
        .context("Failed to start scheduled tasks")?;

    let app = build_app(
        deps.clone(),
        TrustedProxies::new(config.trusted_proxies.clone()),
    );
    let host_ui_app = build_host_ui_app(deps, HostUiToken::new(config.host_ui_token.clone()));

    // Start servers
    let addr = format!("{}:{}", config.bind_address, config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    // The consent queue is never exposed beyond this machine
    let host_ui_addr = SocketAddr::from((Ipv4Addr::LOCALHOST, config.host_ui_port));
    tracing::info!("Host UI listening on {}", host_ui_addr);

    let host_ui_listener = tokio::net::TcpListener::bind(host_ui_addr)
        .await
        .context("Failed to bind host UI address")?;

    tokio::try_join!(
        async {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .context("Server error")
        },
        async {
            axum::serve(
                host_ui_listener,
                host_ui_app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .context("Host UI server error")
        },
    )?;

    Ok(())
}
