//! NATS subscription feeding the ingestion path.
//!
//! The upstream EEW producer publishes one JSON-encoded [`EewEvent`] per
//! event revision on the configured subject. The bridge subscribes once at
//! startup and applies every decoded event to the registry in delivery
//! order. Reconnection and server failover are handled by the NATS client.

use eew2sock_core::config::BusConfig;
use eew2sock_core::ingest::Ingestor;
use eew2sock_core::registry::UpsertOutcome;
use eew2sock_types::EewEvent;
use futures::{Stream, StreamExt as _};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::BridgeError;

/// NATS client wrapper for the bridge.
pub struct BusClient {
    client: async_nats::Client,
}

impl BusClient {
    /// Connect to the configured NATS server(s).
    ///
    /// `bus.url` may list several servers separated by commas; the client
    /// fails over between them. The initial connection is retried in the
    /// background, so this returns as soon as the client is created.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Nats`] if no server URL is configured, a
    /// server URL is invalid, or the client cannot be created.
    pub async fn connect(config: &BusConfig) -> Result<Self, BridgeError> {
        let servers = config
            .url
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<async_nats::ServerAddr>().map_err(|e| BridgeError::Nats {
                    message: format!("invalid server URL {s}: {e}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if servers.is_empty() {
            return Err(BridgeError::Nats {
                message: String::from("no server URL configured"),
            });
        }

        let mut options = async_nats::ConnectOptions::new()
            .name(config.client_name.as_str())
            .retry_on_initial_connect()
            .event_callback(|event| async move {
                match event {
                    async_nats::Event::Connected => info!("NATS connection established"),
                    async_nats::Event::Disconnected => {
                        warn!("NATS connection lost, reconnecting");
                    }
                    other => debug!(event = %other, "NATS client event"),
                }
            });
        if let Some((user, password)) = credentials(config) {
            options = options.user_and_password(user, password);
        }

        info!(url = config.url, "connecting to NATS server");
        let client = options.connect(servers).await.map_err(|e| BridgeError::Nats {
            message: format!("failed to connect to {}: {e}", config.url),
        })?;
        Ok(Self { client })
    }

    /// Subscribe to the EEW subject.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Nats`] if the subscription fails.
    pub async fn subscribe(&self, subject: &str) -> Result<async_nats::Subscriber, BridgeError> {
        let subscriber = self
            .client
            .subscribe(subject.to_owned())
            .await
            .map_err(|e| BridgeError::Nats {
                message: format!("failed to subscribe to {subject}: {e}"),
            })?;
        info!(subject, "subscribed to EEW subject");
        Ok(subscriber)
    }

    /// Deserialize a NATS message payload into an [`EewEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Payload`] if deserialization fails.
    pub fn deserialize_event(data: &[u8]) -> Result<EewEvent, BridgeError> {
        serde_json::from_slice(data).map_err(|e| BridgeError::Payload {
            message: format!("failed to deserialize EEW event: {e}"),
        })
    }
}

/// User and password to authenticate with, if both are configured.
///
/// A lone user or password is ignored with a warning.
fn credentials(config: &BusConfig) -> Option<(String, String)> {
    match (&config.user, &config.password) {
        (Some(user), Some(password)) => Some((user.clone(), password.clone())),
        (None, None) => None,
        (Some(_), None) => {
            warn!("bus.user is set without bus.password, connecting without credentials");
            None
        }
        (None, Some(_)) => {
            warn!("bus.password is set without bus.user, connecting without credentials");
            None
        }
    }
}

impl std::fmt::Debug for BusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusClient")
            .field("state", &self.client.connection_state())
            .finish()
    }
}

/// Counters reported when an ingestion stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Events that created a new record.
    pub inserted: u64,
    /// Events that replaced an existing record.
    pub updated: u64,
    /// Events rejected by validation.
    pub rejected: u64,
    /// Payloads that were not valid event JSON.
    pub malformed: u64,
}

/// Apply every payload from `payloads` until the stream ends.
///
/// Malformed payloads and invalid events are logged and skipped; they never
/// stop ingestion.
pub async fn run_ingestion<S, P>(mut payloads: S, ingestor: &Ingestor) -> IngestStats
where
    S: Stream<Item = P> + Unpin,
    P: AsRef<[u8]>,
{
    let mut stats = IngestStats::default();
    while let Some(payload) = payloads.next().await {
        let event = match BusClient::deserialize_event(payload.as_ref()) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "skipping malformed EEW payload");
                stats.malformed = stats.malformed.saturating_add(1);
                continue;
            }
        };
        match ingestor.apply(&event).await {
            Ok(UpsertOutcome::Inserted) => stats.inserted = stats.inserted.saturating_add(1),
            Ok(UpsertOutcome::Updated) => stats.updated = stats.updated.saturating_add(1),
            Err(e) => {
                warn!(error = %e, "skipping invalid EEW event");
                stats.rejected = stats.rejected.saturating_add(1);
            }
        }
    }
    stats
}

/// Connect, subscribe, and spawn the ingestion task.
///
/// The task owns the NATS client for as long as the subscription lives.
///
/// # Errors
///
/// Returns [`BridgeError::Nats`] if the client or subscription cannot be
/// created.
pub async fn start_ingestion(
    config: &BusConfig,
    ingestor: Ingestor,
) -> Result<JoinHandle<IngestStats>, BridgeError> {
    let bus = BusClient::connect(config).await?;
    let subscriber = bus.subscribe(&config.subject).await?;

    Ok(tokio::spawn(async move {
        let payloads = subscriber.map(|msg| msg.payload);
        let stats = run_ingestion(payloads, &ingestor).await;
        warn!(
            inserted = stats.inserted,
            updated = stats.updated,
            rejected = stats.rejected,
            malformed = stats.malformed,
            "EEW subscription ended"
        );
        drop(bus);
        stats
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::Arc;

    use eew2sock_core::config::ProjectionConfig;
    use eew2sock_core::projection::EquirectangularProjector;
    use eew2sock_core::registry::EventRegistry;

    use super::*;

    fn payload(event_id: i64, magnitude: f64) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "event_id": event_id,
            "origin_time": 1000,
            "latitude": 36.0,
            "longitude": 128.0,
            "magnitude": magnitude,
        }))
        .unwrap()
    }

    fn ingestor(registry: &Arc<EventRegistry>) -> Ingestor {
        let projector = EquirectangularProjector::new(&ProjectionConfig::default()).unwrap();
        Ingestor::new(Arc::clone(registry), Arc::new(projector))
    }

    #[test]
    fn deserialize_valid_event() {
        let event = BusClient::deserialize_event(&payload(101, 5.2)).unwrap();
        assert_eq!(event.event_id, 101);
    }

    #[test]
    fn deserialize_invalid_event() {
        let result = BusClient::deserialize_event(b"not valid json");
        assert!(matches!(result, Err(BridgeError::Payload { .. })));
    }

    #[tokio::test]
    async fn ingestion_skips_bad_payloads_and_continues() {
        let registry = Arc::new(EventRegistry::new(600));
        let ingestor = ingestor(&registry);

        let out_of_range = String::from_utf8(payload(3, 4.0))
            .unwrap()
            .replace("36.0", "136.0")
            .into_bytes();

        let payloads = futures::stream::iter(vec![
            payload(1, 4.1),
            b"{ broken".to_vec(),
            payload(2, 5.0),
            out_of_range,
            payload(1, 4.6),
        ]);
        let stats = run_ingestion(payloads, &ingestor).await;

        assert_eq!(
            stats,
            IngestStats {
                inserted: 2,
                updated: 1,
                rejected: 1,
                malformed: 1,
            }
        );
        let snapshot = registry.snapshot().await;
        let ids: Vec<i64> = snapshot.iter().map(|r| r.event_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(
            snapshot.first().map(|r| r.magnitude.to_bits()),
            Some(4.6_f64.to_bits())
        );
    }

    #[tokio::test]
    async fn connect_without_server_url_fails() {
        for url in ["", " , ", ","] {
            let config = BusConfig {
                url: url.to_owned(),
                ..BusConfig::default()
            };
            let Err(BridgeError::Nats { message }) = BusClient::connect(&config).await else {
                panic!("expected a NATS error for url {url:?}");
            };
            assert_eq!(message, "no server URL configured");
        }
    }

    #[test]
    fn credentials_require_user_and_password() {
        let with = |user: Option<&str>, password: Option<&str>| BusConfig {
            user: user.map(str::to_owned),
            password: password.map(str::to_owned),
            ..BusConfig::default()
        };

        assert_eq!(
            credentials(&with(Some("eew"), Some("secret"))),
            Some((String::from("eew"), String::from("secret")))
        );
        assert_eq!(credentials(&with(Some("eew"), None)), None);
        assert_eq!(credentials(&with(None, Some("secret"))), None);
        assert_eq!(credentials(&with(None, None)), None);
    }

    // Integration tests that require a live NATS server are marked #[ignore].
    #[tokio::test]
    #[ignore]
    async fn connect_and_subscribe() {
        let config = BusConfig::default();
        let client = BusClient::connect(&config).await;
        assert!(client.is_ok());
        if let Ok(client) = client {
            assert!(client.subscribe(&config.subject).await.is_ok());
        }
    }
}
