use std::sync::Arc;

use anyhow::Context;
use teloxide::Bot;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use uasocial_bot::config::{Config, StorageKind};
use uasocial_bot::database::{self, MemoryStorage, PgStorage, Storage};
use uasocial_bot::model::{AppState, Settings};
use uasocial_bot::notify::{self, dispatcher, sweep};
use uasocial_bot::pipeline::Pipeline;
use uasocial_bot::transport::Transport;
use uasocial_bot::transport::telegram::{self, TelegramTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    let storage: Arc<dyn Storage> = match config.storage {
        StorageKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for postgres storage")?;
            let pool = database::init::connect(url, config.database_max_connections).await?;
            database::init::migrate(&pool).await?;
            Arc::new(PgStorage::new(pool))
        }
        StorageKind::Memory => {
            tracing::warn!("using in-memory storage; nothing survives a restart");
            Arc::new(MemoryStorage::demo())
        }
    };

    let bot = Bot::new(config.telegram_token.clone());
    let transport: Arc<dyn Transport> = Arc::new(TelegramTransport::new(bot.clone()));
    let (notifier, notifications) =
        notify::queue(config.notify_queue_capacity, config.notify_enqueue_timeout);

    let app = Arc::new(
        AppState::bootstrap(
            Settings::from_config(&config),
            storage,
            transport.clone(),
            notifier,
        )
        .await?,
    );

    let dispatch_stop = CancellationToken::new();
    let dispatch = tokio::spawn(dispatcher::run_dispatch(
        transport,
        notifications,
        dispatch_stop.clone(),
    ));
    let sweeper_stop = CancellationToken::new();
    let sweeper = tokio::spawn(sweep::run_sweeper(app.clone(), sweeper_stop.clone()));

    let polling_stop = CancellationToken::new();
    tokio::spawn({
        let polling_stop = polling_stop.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("shutdown requested"),
                Err(e) => tracing::error!(error = ?e, "failed to listen for ctrl-c; shutting down"),
            }
            polling_stop.cancel();
        }
    });

    let pipeline = Arc::new(Pipeline::standard(app.clone()));
    telegram::run_polling(bot, pipeline, polling_stop).await;

    // Let in-flight fan-outs queue their notifications, then flush the queue.
    app.tasks.close();
    if tokio::time::timeout(config.shutdown_drain, app.tasks.wait())
        .await
        .is_err()
    {
        tracing::warn!(pending = app.tasks.len(), "background tasks still running after drain timeout");
    }
    sweeper_stop.cancel();
    dispatch_stop.cancel();
    if let Err(e) = sweeper.await {
        tracing::error!(error = ?e, "sweeper task failed");
    }
    match dispatch.await {
        Ok(stats) => tracing::info!(?stats, "notification dispatch finished"),
        Err(e) => tracing::error!(error = ?e, "notification dispatch task failed"),
    }
    Ok(())
}
