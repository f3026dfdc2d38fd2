//! Client fleet orchestration.
//!
//! [`Pool::setup`] connects every client concurrently and gates on a
//! [`CountdownLatch`]; only the resulting [`ConnectedPool`] can be run, so the
//! publish phase can never start before the whole fleet is connected.
mod latch;


use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::broker::Broker;
use crate::client::Client;
use crate::config::LoadSettings;
use crate::error::{AppResult, ClientError};
use crate::progress::ProgressSender;

pub use latch::CountdownLatch;

pub struct Pool {
    settings: Arc<LoadSettings>,
    broker: Arc<dyn Broker>,
    progress: ProgressSender,
}

impl Pool {
    #[must_use]
    pub fn build(
        settings: Arc<LoadSettings>,
        broker: Arc<dyn Broker>,
        progress: ProgressSender,
    ) -> Self {
        Self {
            settings,
            broker,
            progress,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.settings.client_count
    }

    /// Connects all clients and waits until every one has signalled.
    ///
    /// # Errors
    ///
    /// Returns the first connect failure; connects still in flight are
    /// aborted and no client is kept.
    pub async fn setup(self) -> AppResult<ConnectedPool> {
        let size = self.size();
        info!("Setting up {} MQTT clients", size);
        let latch = CountdownLatch::new(size);
        let mut connecting = JoinSet::new();
        for ordinal in 0..size {
            let settings = Arc::clone(&self.settings);
            let broker = Arc::clone(&self.broker);
            let progress = self.progress.clone();
            let latch = latch.clone();
            connecting.spawn(async move {
                Client::connect(ordinal, settings, broker.as_ref(), progress, latch).await
            });
        }
        drop(self.progress);

        let mut clients = Vec::with_capacity(size);
        while let Some(joined) = connecting.join_next().await {
            match joined? {
                Ok(client) => clients.push(client),
                Err(err) => {
                    connecting.abort_all();
                    return Err(err.into());
                }
            }
        }
        latch.wait().await;
        clients.sort_by_key(Client::ordinal);
        info!("All clients connected, starting publishing messages");
        Ok(ConnectedPool { clients })
    }
}

/// A fleet whose every client is connected.
pub struct ConnectedPool {
    clients: Vec<Client>,
}

impl ConnectedPool {
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Runs every client concurrently and returns once all have finished.
    ///
    /// A failed client does not stop its siblings; it is listed in
    /// [`RunReport::failures`].
    ///
    /// # Errors
    ///
    /// Returns an error when a client task panics or is cancelled.
    pub async fn run(self) -> AppResult<RunReport> {
        let mut report = RunReport {
            clients: self.clients.len(),
            ..RunReport::default()
        };
        let mut running = JoinSet::new();
        for client in self.clients {
            running.spawn(async move {
                let ordinal = client.ordinal();
                let client_id = client.client_id().to_owned();
                (ordinal, client_id, client.run().await)
            });
        }

        while let Some(joined) = running.join_next().await {
            let (ordinal, client_id, run) = joined?;
            report.published = report.published.saturating_add(run.published);
            match run.error {
                None => debug!("'{}' finished after {} messages", client_id, run.published),
                Some(error) => report.failures.push(ClientFailure {
                    ordinal,
                    client_id,
                    published: run.published,
                    error,
                }),
            }
        }
        report.failures.sort_by_key(|failure| failure.ordinal);
        Ok(report)
    }
}

#[derive(Debug)]
pub struct ClientFailure {
    pub ordinal: usize,
    pub client_id: String,
    /// Messages this client published before it failed.
    pub published: u64,
    pub error: ClientError,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub clients: usize,
    pub published: u64,
    pub failures: Vec<ClientFailure>,
}

impl RunReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
