//! Resona Audio Job Server - Main Entry Point
//!
//! Composition root: loads configuration, wires the adapters into the core,
//! then runs the HTTP surface, the dispatch pool and the reaper until a
//! shutdown signal arrives.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use resona_api_http::state::ApiState;
use resona_core::application::{
    shutdown_channel, submission_channel, DispatchConfig, Dispatcher, Reaper, TaskRegistry,
};
use resona_core::port::time_provider::SystemTimeProvider;
use resona_core::port::{LogSink, NoopPersister, Persister};
use resona_infra_remote::{HttpPersister, RemoteLogClient};
use resona_infra_synth::{SubprocessSynthesizer, SynthRunnerConfig};

use config::ServerConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const LOG_SERVICE_NAME: &str = "ResonaAudioServer";

/// Resona audio generation server
#[derive(Debug, Parser)]
#[command(name = "resona-server", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "resona.toml")]
    config: PathBuf,

    /// Override the port from the configuration file
    #[arg(long)]
    port: Option<u16>,

    /// Debug mode: skip forwarding artifacts to the persistence service
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging (JSON in production, pretty in development)
    let log_format = std::env::var("RESONA_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("resona=info"))
        .context("failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Resona Audio Job Server v{} starting...", VERSION);

    // 2. Load configuration; CLI flags win over the file
    let cli = Cli::parse();
    let mut config = ServerConfig::load(&cli.config)?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.debug {
        config.debug = true;
    }
    info!(
        port = config.port,
        pool_size = config.pool_size,
        debug = config.debug,
        "Configuration loaded"
    );

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create output directory {}",
                config.output_dir.display()
            )
        })?;

    // 3. Setup dependencies (DI wiring). The synthesizer constructor
    // verifies the model files, so a misconfigured server dies here
    // instead of failing its first job.
    let time_provider = Arc::new(SystemTimeProvider);
    let registry = Arc::new(TaskRegistry::new(time_provider.clone()));

    let synthesizer = Arc::new(
        SubprocessSynthesizer::new(SynthRunnerConfig {
            runner: config.runner.clone(),
            checkpoint_path: config.checkpoint_path.clone(),
            model_config_path: config.model_config_path.clone(),
        })
        .map_err(|e| anyhow::anyhow!("synthesizer init failed: {}", e))?,
    );

    let persister: Arc<dyn Persister> = if config.debug {
        info!("Debug mode: artifacts will not be forwarded to the persister");
        Arc::new(NoopPersister)
    } else {
        Arc::new(HttpPersister::new(config.persister_endpoint.clone()))
    };

    let log_sink: Arc<dyn LogSink> = Arc::new(RemoteLogClient::new(
        LOG_SERVICE_NAME,
        config.logger_endpoint.clone(),
        config.remote_logging,
    ));

    // 4. Start the dispatch pool
    let (submission_tx, submission_rx) = submission_channel();
    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let dispatcher = Dispatcher::new(
        registry.clone(),
        synthesizer,
        persister,
        log_sink.clone(),
        DispatchConfig {
            pool_size: config.pool_size,
            dispatch_delay: config.dispatch_delay(),
            synthesis_timeout: config.synthesis_timeout(),
            output_dir: config.output_dir.clone(),
        },
    );
    let worker_handles = dispatcher.spawn(submission_rx, shutdown_rx.clone());

    // 5. Start the expiry reaper
    let reaper = Reaper::new(
        registry.clone(),
        time_provider,
        config.ttl(),
        config.sweep_interval(),
    );
    let reaper_handle = tokio::spawn(reaper.run(shutdown_rx));

    // 6. Start the HTTP surface
    let state = ApiState::new(registry, submission_tx, log_sink);
    let app = resona_api_http::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(addr = %addr, "System ready. Accepting generation requests");
    info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown: stop the pool and the reaper, give in-flight
    // work a bounded window to finish
    shutdown_tx.shutdown();
    for handle in worker_handles {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
    }
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), reaper_handle).await;

    info!("Shutdown complete.");

    Ok(())
}
