//! `folio-server` -- notebook execution orchestrator.
//!
//! Boot order matters: the database comes up and crash compensation
//! runs before anything is scheduled, and the callback server must be
//! serving before the first interpreter process can be launched.
//!
//! # Environment variables
//!
//! | Variable           | Required | Default      | Description                            |
//! |--------------------|----------|--------------|----------------------------------------|
//! | `DATABASE_URL`     | yes      | --           | Postgres connection string             |
//! | `CALLBACK_HOST`    | no       | `127.0.0.1`  | Callback bind + dial-back host         |
//! | `CALLBACK_PORT`    | no       | `9030`       | Callback bind + dial-back port         |
//! | `INTERPRETERS`     | no       | (empty)      | `shebang=Class@/dir` entries, comma-separated |
//! | `PENDING_POLL_MS`  | no       | `1000`       | Dispatch tick interval                 |
//! | `CANCEL_POLL_MS`   | no       | `1000`       | Cancel sweep interval                  |
//! | `LIVENESS_POLL_MS` | no       | `5000`       | Liveness sweep interval                |
//! | `RPC_TIMEOUT_MS`   | no       | `10000`      | Per-call RPC deadline                  |
//! | `JAVA_BIN`         | no       | `java`       | JVM binary for interpreter hosts       |
//! | `JVM_OPTIONS`      | no       | (empty)      | Extra JVM options                      |
//! | `HOST_CLASSPATH`   | no       | `./remote/*` | Classpath of the interpreter host      |

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_engine::launcher::{InterpreterCatalog, Launcher};
use folio_engine::{
    EngineConfig, JobStore, PgStore, ProcessRegistry, ResultHandler, Scheduler,
};
use folio_remote::CallbackServer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_server=debug,folio_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env();
    tracing::info!(callback_host = %config.callback_host, callback_port = config.callback_port,
        "Loaded engine configuration");

    let catalog = InterpreterCatalog::parse(&config.interpreters).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid INTERPRETERS value");
        std::process::exit(1);
    });

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = folio_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    folio_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    folio_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store: Arc<dyn JobStore> = Arc::new(PgStore::new(pool));

    // --- Crash compensation, before anything runs ---
    let restored = store.restore_state().await.expect("Boot recovery failed");
    tracing::info!(restored, "Interrupted jobs requeued");

    // --- Shared state ---
    let registry = Arc::new(ProcessRegistry::new());
    let cancel = tokio_util::sync::CancellationToken::new();

    // --- Callback server, before the first launch ---
    let callback_addr: SocketAddr = format!("{}:{}", config.callback_host, config.callback_port)
        .parse()
        .expect("Invalid callback address");
    let callback_server = CallbackServer::bind(callback_addr)
        .await
        .expect("Failed to start callback server");

    let handler = Arc::new(ResultHandler::new(
        Arc::clone(&store),
        Arc::clone(&registry),
    ));
    let callback_handle = tokio::spawn(callback_server.serve(handler, cancel.clone()));

    // --- Launcher + reaper ---
    let (launcher, exit_rx) = Launcher::new(
        config.java_bin.clone(),
        config.jvm_options.clone(),
        config.host_classpath.clone(),
        config.callback_host.clone(),
        config.callback_port,
    );
    let reaper_handle = tokio::spawn(folio_engine::reaper::run_reaper(
        exit_rx,
        Arc::clone(&registry),
        cancel.clone(),
    ));

    // --- Scheduler ---
    let scheduler = Scheduler::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        launcher,
        Arc::new(catalog),
        &config,
    );
    let scheduler_cancel = cancel.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_cancel).await;
    });

    tracing::info!("folio-server started");

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    tracing::info!("Shutdown signal received");
    cancel.cancel();

    let _ = scheduler_handle.await;
    let _ = reaper_handle.await;
    let _ = callback_handle.await;
    tracing::info!("folio-server stopped");
}
