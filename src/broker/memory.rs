use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{Broker, ConnectOptions, ConnectionObserver, QoS, Session, topic_matches};
use crate::error::ClientError;

/// MQTT CONNACK code for "not authorized".
const NOT_AUTHORIZED: u8 = 5;

/// A message accepted by [`MemoryBroker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub client_id: String,
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
    pub payload: Vec<u8>,
}

/// In-process broker that records every publish.
///
/// Cloning shares the same state, so a test can keep a handle for
/// inspection while clients own another.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    connect_attempts: AtomicUsize,
    refuse_connections: AtomicBool,
    publish_budget: Mutex<Option<usize>>,
    published: Mutex<Vec<PublishedMessage>>,
    live: Mutex<HashMap<String, Arc<dyn ConnectionObserver>>>,
    lost: Mutex<HashSet<String>>,
    subscribers: Mutex<Vec<Subscriber>>,
}

struct Subscriber {
    client_id: String,
    filter: String,
    observer: Arc<dyn ConnectionObserver>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connect attempt is refused with "not authorized".
    #[must_use]
    pub fn refusing_connections(self) -> Self {
        self.state.refuse_connections.store(true, Ordering::Release);
        self
    }

    /// Accepts `count` publishes across all clients, then fails the rest.
    #[must_use]
    pub fn failing_publishes_after(self, count: usize) -> Self {
        *lock(&self.state.publish_budget) = Some(count);
        self
    }

    #[must_use]
    pub fn connect_attempts(&self) -> usize {
        self.state.connect_attempts.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn live_sessions(&self) -> usize {
        lock(&self.state.live).len()
    }

    #[must_use]
    pub fn published(&self) -> Vec<PublishedMessage> {
        lock(&self.state.published).clone()
    }

    /// Simulates the broker dropping every live connection.
    pub fn drop_connections(&self) {
        let live: Vec<(String, Arc<dyn ConnectionObserver>)> = lock(&self.state.live)
            .drain()
            .collect();
        let mut lost = lock(&self.state.lost);
        for (client_id, observer) in live {
            let error = ClientError::ConnectionLost {
                client_id: client_id.clone(),
                reason: "broker closed the connection".to_owned(),
            };
            observer.on_connection_lost(&client_id, &error);
            lost.insert(client_id);
        }
    }
}

impl fmt::Debug for MemoryBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBroker")
            .field("connect_attempts", &self.connect_attempts())
            .field("live_sessions", &self.live_sessions())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn connect(
        &self,
        options: ConnectOptions,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Result<Box<dyn Session>, ClientError> {
        self.state.connect_attempts.fetch_add(1, Ordering::AcqRel);
        tokio::task::yield_now().await;
        if self.state.refuse_connections.load(Ordering::Acquire) {
            return Err(ClientError::ConnectRefused {
                client_id: options.client_id,
                code: NOT_AUTHORIZED,
            });
        }

        lock(&self.state.lost).remove(&options.client_id);
        lock(&self.state.live).insert(options.client_id.clone(), Arc::clone(&observer));
        observer.on_connected(&options.client_id);

        Ok(Box::new(MemorySession {
            client_id: options.client_id,
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }
}

struct MemorySession {
    client_id: String,
    state: Arc<MemoryState>,
    closed: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::NotConnected {
                client_id: self.client_id.clone(),
            });
        }
        if lock(&self.state.lost).contains(&self.client_id) {
            return Err(ClientError::ConnectionLost {
                client_id: self.client_id.clone(),
                reason: "broker closed the connection".to_owned(),
            });
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        lock(&self.state.live).remove(&self.client_id);
        lock(&self.state.subscribers).retain(|subscriber| subscriber.client_id != self.client_id);
    }
}

#[async_trait]
impl Session for MemorySession {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    async fn publish(
        &mut self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: &[u8],
    ) -> Result<(), ClientError> {
        self.ensure_open()?;
        tokio::task::yield_now().await;
        {
            let mut budget = lock(&self.state.publish_budget);
            if let Some(remaining) = budget.as_mut() {
                if *remaining == 0 {
                    return Err(ClientError::Publish {
                        client_id: self.client_id.clone(),
                        topic: topic.to_owned(),
                        reason: "broker rejected the message".to_owned(),
                    });
                }
                *remaining = remaining.saturating_sub(1);
            }
        }

        lock(&self.state.published).push(PublishedMessage {
            client_id: self.client_id.clone(),
            topic: topic.to_owned(),
            qos,
            retain,
            payload: payload.to_vec(),
        });

        let receivers: Vec<Arc<dyn ConnectionObserver>> = lock(&self.state.subscribers)
            .iter()
            .filter(|subscriber| topic_matches(&subscriber.filter, topic))
            .map(|subscriber| Arc::clone(&subscriber.observer))
            .collect();
        for observer in receivers {
            observer.on_message(topic, payload);
        }
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str, _qos: QoS) -> Result<(), ClientError> {
        self.ensure_open()?;
        let observer = lock(&self.state.live)
            .get(&self.client_id)
            .cloned()
            .ok_or_else(|| ClientError::NotConnected {
                client_id: self.client_id.clone(),
            })?;
        lock(&self.state.subscribers).push(Subscriber {
            client_id: self.client_id.clone(),
            filter: topic.to_owned(),
            observer,
        });
        Ok(())
    }

    async fn disconnect(&mut self, _grace: Duration) -> Result<(), ClientError> {
        self.release();
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.release();
    }
}
