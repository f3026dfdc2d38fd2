//! Messaging collaborator seam.
//!
//! Clients only see the [`Broker`] and [`Session`] traits: connect with a
//! [`ConnectionObserver`], publish, subscribe, disconnect. [`MqttBroker`]
//! speaks MQTT 3.1.1 over TCP; [`MemoryBroker`] keeps everything in-process.
pub(crate) mod codec;
mod memory;
mod mqtt;


use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ValidationError};

pub use memory::{MemoryBroker, PublishedMessage};
pub use mqtt::MqttBroker;

/// Delivery guarantee requested for a publish or subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "i64", into = "u8")]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl QoS {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }

    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(QoS::AtMostOnce),
            1 => Some(QoS::AtLeastOnce),
            2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }
}

impl TryFrom<i64> for QoS {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(QoS::from_u8)
            .ok_or(ValidationError::InvalidQos { value })
    }
}

impl From<QoS> for u8 {
    fn from(value: QoS) -> Self {
        value.as_u8()
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Everything a broker needs to open one client connection.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub clean_session: bool,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
}

impl ConnectOptions {
    #[must_use]
    pub fn broker_url(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }
}

/// Callbacks fired by a broker on behalf of one connection.
///
/// Implementations must be cheap and non-blocking; they run on the broker's
/// I/O tasks.
pub trait ConnectionObserver: Send + Sync {
    /// Fired once the broker accepted the connection.
    fn on_connected(&self, client_id: &str);

    /// Fired at most once when an established connection drops without a
    /// local disconnect. No reconnect is attempted.
    fn on_connection_lost(&self, client_id: &str, error: &ClientError);

    /// Fired for each message delivered on a subscription.
    fn on_message(&self, topic: &str, payload: &[u8]) {
        let _ = (topic, payload);
    }
}

#[async_trait]
pub trait Broker: Send + Sync {
    /// Opens a connection and returns once the broker acknowledged it.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport cannot be established, the broker
    /// refuses the connection, or the handshake exceeds the connect timeout.
    async fn connect(
        &self,
        options: ConnectOptions,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Result<Box<dyn Session>, ClientError>;
}

/// One live broker connection, owned by exactly one client.
#[async_trait]
pub trait Session: Send {
    fn client_id(&self) -> &str;

    /// Publishes `payload` and waits for the acknowledgement `qos` requires.
    ///
    /// # Errors
    ///
    /// Returns an error when the connection is gone or the broker never
    /// completes the acknowledgement flow.
    async fn publish(
        &mut self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: &[u8],
    ) -> Result<(), ClientError>;

    /// Subscribes to `topic`; deliveries go to the connection's observer.
    ///
    /// # Errors
    ///
    /// Returns an error when the subscription is not acknowledged.
    async fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), ClientError>;

    /// Closes the connection, allowing `grace` for in-flight work.
    ///
    /// # Errors
    ///
    /// Returns an error when the disconnect notice cannot be sent.
    async fn disconnect(&mut self, grace: Duration) -> Result<(), ClientError>;
}

/// Matches an MQTT topic filter (`+` one level, trailing `#` any levels).
#[must_use]
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            (None, None) => return true,
            (Some(_) | None, Some(_) | None) => return false,
        }
    }
}
