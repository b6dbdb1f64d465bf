//! Error types for the bridge binary.
//!
//! [`BridgeError`] is the top-level error type that wraps all possible
//! failure modes during startup and ingestion.

/// Top-level error for the bridge binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: eew2sock_core::config::ConfigError,
    },

    /// Map projection initialization failed.
    #[error("projection error: {source}")]
    Projection {
        /// The underlying projection error.
        #[from]
        source: eew2sock_core::projection::ProjectionError,
    },

    /// NATS connection or subscription failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },

    /// A bus payload could not be decoded into an event.
    #[error("payload error: {message}")]
    Payload {
        /// Description of the decode failure.
        message: String,
    },

    /// The log subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the logging failure.
        message: String,
    },
}
