//! One simulated publisher.
//!
//! A [`Client`] only exists once its broker connection is up: construction
//! goes through [`Client::connect`], which fires the shared setup latch from
//! the broker's connect callback. [`Client::run`] then publishes the
//! configured number of messages and disconnects.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::broker::{Broker, ConnectOptions, ConnectionObserver, QoS, Session};
use crate::config::LoadSettings;
use crate::error::ClientError;
use crate::pool::CountdownLatch;
use crate::progress::{ProgressSender, ProgressUnit};

pub const CLIENT_ID_PREFIX: &str = "mqtt-load-generator-";
pub const KEEP_ALIVE: Duration = Duration::from_secs(60);
/// Quiesce period handed to the broker on disconnect.
pub const DISCONNECT_GRACE: Duration = Duration::from_millis(1);
const SUBSCRIBE_QOS: QoS = QoS::AtLeastOnce;
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

#[must_use]
pub fn client_id(ordinal: usize) -> String {
    format!("{CLIENT_ID_PREFIX}{ordinal}")
}

/// Target topic, with `/<ordinal>` appended when ids are used as sub-topics.
#[must_use]
pub fn resolve_topic(settings: &LoadSettings, ordinal: usize) -> String {
    if settings.id_as_sub_topic {
        format!("{}/{}", settings.target_topic, ordinal)
    } else {
        settings.target_topic.clone()
    }
}

/// The configured message, or `message_size` random bytes when it is empty.
pub fn resolve_payload<R: Rng + ?Sized>(settings: &LoadSettings, rng: &mut R) -> Vec<u8> {
    if settings.message.is_empty() {
        let mut payload = vec![0_u8; settings.message_size];
        rng.fill(payload.as_mut_slice());
        payload
    } else {
        settings.message.as_bytes().to_vec()
    }
}

fn client_rng(seed: Option<u64>, ordinal: usize) -> StdRng {
    match seed {
        Some(seed) => {
            let ordinal = u64::try_from(ordinal).unwrap_or(u64::MAX);
            StdRng::seed_from_u64(seed ^ ordinal.wrapping_add(1).wrapping_mul(SEED_MIX))
        }
        None => StdRng::from_entropy(),
    }
}

struct ClientObserver {
    connected: CountdownLatch,
    signalled: AtomicBool,
    received: Option<ProgressSender>,
}

impl ConnectionObserver for ClientObserver {
    fn on_connected(&self, client_id: &str) {
        if !self.signalled.swap(true, Ordering::AcqRel) {
            debug!("'{}' connected", client_id);
            self.connected.count_down();
        }
    }

    fn on_connection_lost(&self, client_id: &str, error: &ClientError) {
        warn!("Connection lost for client '{}' message: {}", client_id, error);
    }

    fn on_message(&self, _topic: &str, _payload: &[u8]) {
        if let Some(progress) = &self.received {
            drop(progress.send(ProgressUnit::Received));
        }
    }
}

/// How one client's publish loop ended.
#[derive(Debug)]
pub struct ClientRun {
    /// Messages acknowledged before the loop ended.
    pub published: u64,
    /// The publish failure that cut the loop short, if any.
    pub error: Option<ClientError>,
}

impl ClientRun {
    /// The published count, or the failure when there was one.
    ///
    /// # Errors
    ///
    /// Returns the publish error that stopped the loop.
    pub fn into_result(self) -> Result<u64, ClientError> {
        self.error.map_or(Ok(self.published), Err)
    }
}

pub struct Client {
    ordinal: usize,
    client_id: String,
    settings: Arc<LoadSettings>,
    session: Box<dyn Session>,
    progress: ProgressSender,
    rng: StdRng,
}

impl Client {
    /// Connects client `ordinal` and, when configured, subscribes it.
    ///
    /// `connected` is counted down exactly once, from the broker's
    /// connect callback.
    ///
    /// # Errors
    ///
    /// Returns an error when the broker connection or the subscription fails.
    pub async fn connect(
        ordinal: usize,
        settings: Arc<LoadSettings>,
        broker: &dyn Broker,
        progress: ProgressSender,
        connected: CountdownLatch,
    ) -> Result<Self, ClientError> {
        let client_id = client_id(ordinal);
        let observer = Arc::new(ClientObserver {
            connected,
            signalled: AtomicBool::new(false),
            received: settings.subscribe_topic.as_ref().map(|_| progress.clone()),
        });
        let options = ConnectOptions {
            host: settings.host.clone(),
            port: settings.port,
            client_id: client_id.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            clean_session: true,
            keep_alive: KEEP_ALIVE,
            connect_timeout: settings.connect_timeout,
        };
        let mut session = broker.connect(options, observer).await?;

        if let Some(topic) = settings.subscribe_topic.as_deref() {
            session.subscribe(topic, SUBSCRIBE_QOS).await?;
            info!("'{}' subscribed to topic '{}'", client_id, topic);
        }

        let rng = client_rng(settings.seed, ordinal);
        Ok(Self {
            ordinal,
            client_id,
            settings,
            session,
            progress,
            rng,
        })
    }

    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Publishes `message_count` messages.
    ///
    /// The first failed publish ends the loop; the session is still closed
    /// and the messages sent before the failure are still counted.
    pub async fn run(mut self) -> ClientRun {
        let settings = Arc::clone(&self.settings);
        let topic = resolve_topic(&settings, self.ordinal);
        let payload = resolve_payload(&settings, &mut self.rng);
        let mut published = 0_u64;

        for _ in 0..settings.message_count {
            let mutant_topic = settings.mutation.mutate(&topic, &mut self.rng);
            let mutant_payload = settings.mutation.mutate_bytes(&payload, &mut self.rng);
            if settings.debug {
                info!(
                    "{} Pub: {} {}",
                    self.client_id,
                    mutant_topic,
                    String::from_utf8_lossy(&mutant_payload)
                );
            }

            if let Err(err) = self
                .session
                .publish(&mutant_topic, settings.qos, false, &mutant_payload)
                .await
            {
                debug!("'{}' stopping after {} messages: {}", self.client_id, published, err);
                self.close().await;
                return ClientRun {
                    published,
                    error: Some(err),
                };
            }

            if let Some(wait) = settings.schedule.next_wait(&mut self.rng) {
                tokio::time::sleep(wait).await;
            }
            published = published.saturating_add(1);
            drop(self.progress.send(ProgressUnit::Published));
        }

        self.close().await;
        ClientRun {
            published,
            error: None,
        }
    }

    async fn close(&mut self) {
        if let Err(err) = self.session.disconnect(DISCONNECT_GRACE).await {
            debug!("'{}' disconnect failed: {}", self.client_id, err);
        }
    }
}
