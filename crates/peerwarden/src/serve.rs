// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `peerwarden serve` command implementation.
//!
//! Opens storage, builds the runtime settings snapshot, starts the
//! background loops and runs the dispatch loop until a signal arrives or
//! the gateway closes. Shutdown then unwinds in a fixed order so that no
//! handler or watchdog cycle is cut short and every queued event log entry
//! reaches the database.

use std::sync::Arc;
use std::time::Duration;

use peerwarden_bot::{
    ConfigReloader, Dispatcher, Handler, LogQueue, RateLimiter, Services, Watchdog, shutdown,
};
use peerwarden_config::{PeerwardenConfig, RuntimeSettings};
use peerwarden_core::{
    ClientInventory, EventLogRepository, MessagingGateway, PeerwardenError, ProvisioningAction,
    StatsProvider, StorageAdapter,
};
use peerwarden_storage::SqliteStore;
use peerwarden_telegram::TelegramGateway;
use peerwarden_wireguard::{FsClientInventory, ScriptRunner, WgStatsProvider};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Upper bound for the short background loops to stop.
const STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// A watchdog cycle may be removing several clients when shutdown begins.
const WATCHDOG_STOP_TIMEOUT: Duration = Duration::from_secs(600);

/// The collaborators that talk to the outside world.
pub struct Backends {
    pub gateway: Box<dyn MessagingGateway>,
    pub actions: Arc<dyn ProvisioningAction>,
    pub stats: Arc<dyn StatsProvider>,
    pub inventory: Arc<dyn ClientInventory>,
}

impl Backends {
    /// Telegram plus the WireGuard scripts and `wg show`.
    pub fn production(config: &PeerwardenConfig) -> Result<Self, PeerwardenError> {
        let token = config.bot.token.as_deref().ok_or_else(|| {
            PeerwardenError::Config(
                "bot.token is required (set it in peerwarden.toml or PEERWARDEN_BOT_TOKEN)".into(),
            )
        })?;
        Ok(Self {
            gateway: Box::new(TelegramGateway::new(token)?),
            actions: Arc::new(ScriptRunner::new(&config.provisioning)),
            stats: Arc::new(WgStatsProvider::new(&config.provisioning)),
            inventory: Arc::new(FsClientInventory::new(&config.provisioning.clients_dir)),
        })
    }
}

/// Runs the `peerwarden serve` command.
pub async fn run_serve(config: PeerwardenConfig) -> Result<(), PeerwardenError> {
    init_tracing(&config.bot.log_level);
    info!("starting peerwarden serve");

    let backends = Backends::production(&config).inspect_err(|e| {
        error!(error = %e, "failed to initialize backends");
    })?;
    let cancel = shutdown::install_signal_handler();
    serve_until(config, backends, cancel).await
}

/// Runs the bot until `cancel` fires or the gateway closes, then shuts
/// everything down in order.
pub async fn serve_until(
    config: PeerwardenConfig,
    backends: Backends,
    cancel: CancellationToken,
) -> Result<(), PeerwardenError> {
    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;
    info!(path = %config.storage.database_path, "storage ready");

    let base = RuntimeSettings::from_config(&config);
    let settings = base.with_overrides(store.as_ref()).await?.into_handle();

    // Event log writer.
    let (log_queue, log_writer) = LogQueue::new(config.bot.log_queue_capacity);
    let events: Arc<dyn EventLogRepository> = store.clone();
    let writer_task = tokio::spawn(log_writer.run(events));
    let log = Arc::new(log_queue.clone());

    // Rate-limit sweeper.
    let limiter = Arc::new(RateLimiter::new(settings.clone()));
    let sweeper_cancel = CancellationToken::new();
    let sweeper_task = tokio::spawn(Arc::clone(&limiter).run_sweeper(sweeper_cancel.clone()));

    // Watchdog. The loop skips cycles while `watchdog_enabled` is off so a
    // runtime override can switch it on.
    if !settings.load().watchdog_enabled {
        info!("watchdog disabled, cycles skipped until enabled");
    }
    let watchdog = Arc::new(Watchdog::new(
        store.clone(),
        Arc::clone(&backends.stats),
        Arc::clone(&backends.actions),
        Arc::clone(&backends.inventory),
        settings.clone(),
        log.clone(),
    ));
    let watchdog_cancel = CancellationToken::new();
    let watchdog_task = tokio::spawn(watchdog.run(watchdog_cancel.clone()));

    // Config reloader.
    let reloader_cancel = CancellationToken::new();
    let reloader_task = if config.reload.enabled {
        let reloader = Arc::new(ConfigReloader::new(base, store.clone(), settings.clone()));
        Some(tokio::spawn(reloader.run(reloader_cancel.clone())))
    } else {
        info!("config reload disabled");
        None
    };

    // Gateway and dispatch.
    let mut gateway = backends.gateway;
    let connected = gateway.connect().await;
    let gateway: Arc<dyn MessagingGateway> = Arc::from(gateway);

    let mut dispatched = 0;
    if let Err(e) = &connected {
        error!(error = %e, "failed to connect messaging gateway");
        drop(log);
    } else {
        info!(gateway = gateway.name(), "gateway connected");
        let services = Services {
            gateway: Arc::clone(&gateway),
            accounts: store.clone(),
            feedback: store.clone(),
            blocklist: store.clone(),
            events: store.clone(),
            config: store.clone(),
            actions: backends.actions,
            stats: backends.stats,
            inventory: backends.inventory,
            log,
        };
        let handler = Arc::new(Handler::new(services, settings, Arc::clone(&limiter)));
        let dispatcher = Dispatcher::new(
            Arc::clone(&gateway),
            handler,
            config.bot.worker_pool_size,
        );

        dispatched = dispatcher.run(cancel).await;

        // 1. Stop intake.
        if let Err(e) = gateway.shutdown().await {
            warn!(error = %e, "gateway shutdown failed");
        }
        // 2. Wait for in-flight handlers.
        dispatcher.drain().await;
    }

    // 3. Watchdog finishes its current cycle.
    watchdog_cancel.cancel();
    shutdown::join_with_timeout("watchdog", watchdog_task, WATCHDOG_STOP_TIMEOUT).await;

    // 4. Reloader and sweeper.
    reloader_cancel.cancel();
    if let Some(task) = reloader_task {
        shutdown::join_with_timeout("config reloader", task, STOP_TIMEOUT).await;
    }
    sweeper_cancel.cancel();
    shutdown::join_with_timeout("rate limit sweeper", sweeper_task, STOP_TIMEOUT).await;

    // 5. The writer stops once the last sender is gone.
    let dropped = log_queue.dropped();
    drop(log_queue);
    drop(gateway);
    shutdown::join_with_timeout("event log writer", writer_task, STOP_TIMEOUT).await;

    // 6. Storage.
    if let Err(e) = store.close().await {
        warn!(error = %e, "closing storage failed");
    }

    info!(dispatched, dropped_log_events = dropped, "peerwarden serve shutdown complete");
    connected
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("peerwarden={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
