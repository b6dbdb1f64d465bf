//! EEW-to-WebSocket bridge entry point.
//!
//! The bridge subscribes to an earthquake early-warning feed on NATS, keeps
//! the currently active events in a shared registry, and answers WebSocket
//! clients that poll for that set with a fixed-size binary packet.
//!
//! # Architecture
//!
//! ```text
//! NATS (EEW) --> Projection --> Event Registry <-- Maintenance (1 Hz eviction)
//!                                      |
//!                                      v
//!                     WebSocket handlers (one task per client)
//! ```
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `eew2sock.yaml` (or the path given as the
//!    first argument / `EEW2SOCK_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Initialize both map projections (fatal on failure)
//! 4. Create the event registry and start the maintenance loop
//! 5. Connect to NATS and start ingestion (logged and skipped on failure)
//! 6. Start the WebSocket listener (logged and skipped on failure)
//! 7. Run until Ctrl-C

mod error;
mod nats;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use eew2sock_core::config::{BridgeConfig, LogFormat, LoggingConfig};
use eew2sock_core::ingest::Ingestor;
use eew2sock_core::maintenance::Maintenance;
use eew2sock_core::projection::EquirectangularProjector;
use eew2sock_core::registry::EventRegistry;
use eew2sock_server::{spawn_listener, AppState};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::BridgeError;

/// Config file used when no path is given.
const DEFAULT_CONFIG_PATH: &str = "eew2sock.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, logging, or projection
/// initialization fails. Bus and listener failures are logged and the
/// process keeps running in a degraded state.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = config_path();
    let (config, from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;

    info!(process = config.logging.process_name, "eew2sock starting");
    if from_file {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        port = config.server.port,
        alignment_offset_secs = config.retention.alignment_offset_secs,
        retention_window_secs = config.retention.retention_window_secs,
        log_directory = config.logging.directory.as_deref().unwrap_or("-"),
        "Configuration summary"
    );

    // 3. Initialize map projections. Nothing is served if this fails.
    let projector = EquirectangularProjector::new(&config.projection).map_err(BridgeError::from)?;
    info!("Map projections initialized");

    // 4. Registry and maintenance loop.
    let registry = Arc::new(EventRegistry::new(config.retention.retention_window_secs));
    let _maintenance = Maintenance::new(
        Arc::clone(&registry),
        config.retention.alignment_offset_secs,
        config.retention.maintenance_interval_ms,
    )
    .spawn();
    info!(
        interval_ms = config.retention.maintenance_interval_ms,
        "Maintenance loop started"
    );

    // 5. Upstream ingestion.
    if config.bus.ingestion_enabled() {
        let ingestor = Ingestor::new(Arc::clone(&registry), Arc::new(projector));
        match nats::start_ingestion(&config.bus, ingestor).await {
            Ok(_handle) => info!(subject = config.bus.subject, "EEW ingestion started"),
            Err(e) => error!(error = %e, "EEW ingestion unavailable, serving without updates"),
        }
    } else {
        warn!("bus.subject is empty, EEW ingestion disabled");
    }

    // 6. WebSocket listener.
    let state = Arc::new(AppState::new(Arc::clone(&registry)));
    match spawn_listener(&config.server, state).await {
        Ok(listener) => info!(addr = %listener.addr, "eew2sock started"),
        Err(e) => error!(
            error = %e,
            port = config.server.port,
            "WebSocket listener failed to start"
        ),
    }

    // 7. Run until interrupted.
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, eew2sock stopping");

    Ok(())
}

/// Resolve the config file path from the command line or environment.
fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("EEW2SOCK_CONFIG").ok())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load configuration, falling back to defaults when the file is absent.
///
/// Returns the config and whether it came from the file.
fn load_config(path: &Path) -> Result<(BridgeConfig, bool), BridgeError> {
    if path.exists() {
        Ok((BridgeConfig::from_file(path)?, true))
    } else {
        let mut config = BridgeConfig::default();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok((config, false))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_logging(config: &LoggingConfig) -> Result<(), BridgeError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| BridgeError::Logging {
            message: format!("invalid log level {}: {e}", config.level),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|e| BridgeError::Logging {
        message: format!("failed to install subscriber: {e}"),
    })
}
