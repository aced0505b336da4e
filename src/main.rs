//! Click pipeline service
//!
//! Runs the consumer side of the link shortener's click path:
//! - Click processor (queue → enrichment → Postgres, ClickHouse, notifications)
//! - Realtime hub serving live click feeds over WebSocket
//! - Health and stats endpoints

mod checks;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use api::{router, AppState};
use clickhouse_client::{ClickHouseClient, ClickHouseConfig, ClickHouseStore};
use postgres_store::{PgPrimaryStore, PostgresConfig};
use queue::{
    EventQueue, MemoryEventQueue, MemoryPubSub, NotificationPublisher, NotificationSubscriber,
    QueueBackend, QueueConfig, RedisEventQueue, RedisPubSub,
};
use realtime::{ConnectionConfig, Hub, HubConfig};
use telemetry::{health, init_tracing_from_env};
use worker::{ClickProcessor, ProcessorConfig, SecondaryForwarder, WorkerConfig, WorkerScheduler};

use crate::checks::{ClickHouseCheck, PostgresCheck, QueueCheck};

/// How long background tasks get to finish after shutdown is signalled.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Consume the click queue in this process
    #[serde(default = "default_true")]
    run_processor: bool,

    /// Serve live viewers in this process
    #[serde(default = "default_true")]
    run_realtime: bool,

    #[serde(default)]
    queue: QueueConfig,

    #[serde(default)]
    postgres: PostgresConfig,

    /// Secondary analytics store; forwarding is off when absent
    #[serde(default)]
    clickhouse: Option<ClickHouseConfig>,

    #[serde(default)]
    processor: ProcessorConfig,

    #[serde(default)]
    realtime: ConnectionConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            run_processor: true,
            run_realtime: true,
            queue: QueueConfig::default(),
            postgres: PostgresConfig::default(),
            clickhouse: None,
            processor: ProcessorConfig::default(),
            realtime: ConnectionConfig::default(),
        }
    }
}

/// Queue and pub/sub handles for the configured backend.
struct Transport {
    /// Used for depth probes and by producers in this process
    queue: Arc<dyn EventQueue>,
    /// Dedicated to the processor's blocking pops
    consumer: Arc<dyn EventQueue>,
    publisher: Arc<dyn NotificationPublisher>,
    subscriber: Arc<dyn NotificationSubscriber>,
}

async fn connect_transport(config: &QueueConfig) -> Result<Transport> {
    match config.backend {
        QueueBackend::Memory => {
            warn!("Using in-memory queue; producers and consumers must share this process");
            let queue = Arc::new(MemoryEventQueue::new());
            let bus = Arc::new(MemoryPubSub::new(config.subscriber_buffer));
            Ok(Transport {
                queue: queue.clone(),
                consumer: queue,
                publisher: bus.clone(),
                subscriber: bus,
            })
        }
        QueueBackend::Redis => {
            let queue = RedisEventQueue::connect(config)
                .await
                .context("Failed to connect Redis event queue")?;
            let consumer = RedisEventQueue::connect(config)
                .await
                .context("Failed to connect Redis consumer")?;
            let bus = Arc::new(
                RedisPubSub::connect(config)
                    .await
                    .context("Failed to connect Redis pub/sub")?,
            );
            Ok(Transport {
                queue: Arc::new(queue),
                consumer: Arc::new(consumer),
                publisher: bus.clone(),
                subscriber: bus,
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env().context("Failed to initialize tracing")?;

    info!("Starting click pipeline v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    config
        .realtime
        .validate()
        .context("Invalid realtime configuration")?;

    info!(
        backend = ?config.queue.backend,
        queue_key = %config.queue.queue_key,
        channel = %config.queue.notification_channel,
        run_processor = config.run_processor,
        run_realtime = config.run_realtime,
        clickhouse = config.clickhouse.is_some(),
        "Loaded config"
    );

    let transport = connect_transport(&config.queue).await?;
    queue::health::check_connection(transport.queue.as_ref()).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut scheduler = WorkerScheduler::new(WorkerConfig::default())
        .with_check(Arc::new(QueueCheck(transport.queue.clone())));

    if config.run_processor {
        let store = PgPrimaryStore::connect(&config.postgres)
            .await
            .context("Failed to connect primary store")?;
        postgres_store::health::check_connection(store.pool()).await;
        scheduler = scheduler.with_check(Arc::new(PostgresCheck(store.clone())));

        let mut processor = ClickProcessor::new(
            transport.consumer.clone(),
            Arc::new(store),
            transport.publisher.clone(),
            config.processor.clone(),
        );

        match config.clickhouse.clone() {
            Some(clickhouse_config) => {
                let clickhouse = ClickHouseClient::new(clickhouse_config);
                if clickhouse.config().init_schema {
                    if let Err(e) = clickhouse_client::schema::init_schema(&clickhouse).await {
                        // forwarding is best-effort; keep going without it
                        error!("Failed to initialize ClickHouse schema: {}", e);
                    }
                }
                clickhouse_client::health::check_connection(&clickhouse).await;
                scheduler = scheduler.with_check(Arc::new(ClickHouseCheck(clickhouse.clone())));

                let forwarder = SecondaryForwarder::new(Arc::new(ClickHouseStore::new(clickhouse)));
                processor = processor.with_forwarder(forwarder);
            }
            None => {
                health().clickhouse.set_disabled();
                info!("ClickHouse not configured; secondary forwarding disabled");
            }
        }

        scheduler = scheduler.with_processor(Arc::new(processor));
    } else {
        health().postgres.set_disabled();
        health().clickhouse.set_disabled();
    }

    let worker_handles = Arc::new(scheduler).start(shutdown_rx.clone());

    // The hub always runs so the WebSocket route has something to register
    // with; it only receives clicks when the dispatcher is subscribed.
    let (hub, hub_loop) = Hub::new(HubConfig::default());
    let hub_handle = tokio::spawn(hub_loop.run(shutdown_rx.clone()));

    let dispatcher_handle = if config.run_realtime {
        let notifications = transport.subscriber.subscribe(shutdown_rx.clone());
        Some(tokio::spawn(realtime::run_dispatcher(hub.clone(), notifications)))
    } else {
        None
    };

    let state = AppState::new(hub, config.realtime.clone()).with_queue(transport.queue.clone());
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    let server_shutdown = {
        let shutdown_tx = shutdown_tx.clone();
        async move {
            shutdown_signal().await;
            // stop workers and close viewer connections alongside the server
            let _ = shutdown_tx.send(true);
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(server_shutdown)
        .await
        .context("Server error")?;

    info!("Shutting down...");
    let _ = shutdown_tx.send(true);

    let mut handles = worker_handles;
    handles.push(hub_handle);
    handles.extend(dispatcher_handle);

    for handle in handles {
        match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Background task failed: {}", e),
            Err(_) => warn!("Background task did not stop within the grace period"),
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("CLICKS")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // The config crate's nested parsing doesn't work reliably with
    // underscored field names, so the common ones get explicit variables.
    if let Ok(backend) = std::env::var("CLICKS_QUEUE_BACKEND") {
        config.queue.backend = match backend.to_ascii_lowercase().as_str() {
            "memory" => QueueBackend::Memory,
            "redis" => QueueBackend::Redis,
            other => anyhow::bail!("Unknown queue backend: {}", other),
        };
    }
    if let Ok(url) = std::env::var("CLICKS_REDIS_URL") {
        config.queue.redis_url = url;
    }
    if let Ok(key) = std::env::var("CLICKS_QUEUE_KEY") {
        config.queue.queue_key = key;
    }
    if let Ok(channel) = std::env::var("CLICKS_NOTIFICATION_CHANNEL") {
        config.queue.notification_channel = channel;
    }

    if let Ok(url) = std::env::var("CLICKS_DATABASE_URL") {
        config.postgres.url = url;
    }

    // Setting a ClickHouse URL turns the secondary store on
    if let Ok(url) = std::env::var("CLICKS_CLICKHOUSE_URL") {
        config.clickhouse.get_or_insert_with(ClickHouseConfig::default).url = url;
    }
    if let Some(clickhouse) = config.clickhouse.as_mut() {
        if let Ok(database) = std::env::var("CLICKS_CLICKHOUSE_DATABASE") {
            clickhouse.database = database;
        }
        if let Ok(username) = std::env::var("CLICKS_CLICKHOUSE_USERNAME") {
            clickhouse.username = Some(username);
        }
        if let Ok(password) = std::env::var("CLICKS_CLICKHOUSE_PASSWORD") {
            clickhouse.password = Some(password);
        }
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
