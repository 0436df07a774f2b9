use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;

use mention_dispatcher::config::{ChannelMap, Settings};
use mention_dispatcher::notification::{
    ChannelIdentity, HttpFetcher, Processor, RedisStreamAcknowledger, RedisStreamDispatcher,
};
use mention_dispatcher::redis::{BackoffConfig, RedisPool};
use mention_dispatcher::server::{create_app, AppState};
use mention_dispatcher::telemetry::init_telemetry;
use mention_dispatcher::triggers::IncomingConsumer;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing; the guard flushes spans on exit
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    // Refuse to start without all three channels
    let channels = match ChannelMap::from_settings(&settings.channels) {
        Ok(channels) => channels,
        Err(e) => {
            tracing::error!(error = %e, "Invalid channel configuration");
            return Err(e.into());
        }
    };
    tracing::info!(
        incoming = %channels.resolve(ChannelIdentity::Incoming),
        notifier = %channels.resolve(ChannelIdentity::Notifier),
        webmention = %channels.resolve(ChannelIdentity::Webmention),
        "Channels resolved"
    );

    let pool = Arc::new(RedisPool::new(settings.redis.clone())?);

    // Wire the pipeline
    let fetcher = Arc::new(HttpFetcher::new(&settings.fetch)?);
    let dispatcher = Arc::new(RedisStreamDispatcher::new(
        pool.clone(),
        channels.clone(),
        settings.redis.stream_maxlen,
    ));
    let acknowledger = Arc::new(RedisStreamAcknowledger::new(
        pool.clone(),
        &channels,
        settings.consumer.group.clone(),
    ));
    let processor = Arc::new(
        Processor::new(fetcher, dispatcher, acknowledger)
            .with_fetch_timeout(settings.fetch.timeout()),
    );

    // Start consuming in background
    let consumer = Arc::new(IncomingConsumer::new(
        pool.clone(),
        processor,
        &channels,
        settings.consumer.clone(),
        BackoffConfig::from(&settings.redis),
    ));
    let shutdown_signal = consumer.shutdown_signal();

    let consumer_task = consumer.clone();
    let consumer_handle = tokio::spawn(async move {
        if let Err(e) = consumer_task.start().await {
            tracing::error!(error = %e, "Incoming consumer failed");
        }
    });

    let addr = settings.server_addr();
    let app = create_app(AppState::new(settings, channels, pool));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_signal))
        .await?;

    // Let an in-flight notification finish
    tracing::info!("Waiting for incoming consumer to finish...");
    let _ = consumer_handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    let _ = shutdown_tx.send(());
}
