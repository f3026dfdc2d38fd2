use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use tracing::{debug, trace};

use super::codec::{
    DISCONNECT, PINGREQ, PUBACK, PUBCOMP, PUBREC, PUBREL, Packet, build_ack_packet,
    build_connect_packet, build_empty_packet, build_publish_packet, build_subscribe_packet,
    read_packet,
};
use super::{Broker, ConnectOptions, ConnectionObserver, QoS, Session};
use crate::error::ClientError;

/// MQTT 3.1.1 over plain TCP.
#[derive(Debug, Default, Clone, Copy)]
pub struct MqttBroker;

impl MqttBroker {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Broker for MqttBroker {
    async fn connect(
        &self,
        options: ConnectOptions,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Result<Box<dyn Session>, ClientError> {
        let handshake = handshake(&options);
        let (reader, writer) = timeout(options.connect_timeout, handshake)
            .await
            .map_err(|_elapsed| ClientError::ConnectTimeout {
                client_id: options.client_id.clone(),
                timeout: options.connect_timeout,
            })??;

        let shared = Arc::new(SessionShared {
            client_id: options.client_id.clone(),
            writer: Mutex::new(writer),
            pending: Mutex::new(HashMap::new()),
            disconnecting: AtomicBool::new(false),
            lost: AtomicBool::new(false),
            observer: Arc::clone(&observer),
        });
        let reader_task = tokio::spawn(read_loop(reader, Arc::clone(&shared)));
        let keep_alive_task = spawn_keep_alive(Arc::clone(&shared), options.keep_alive);

        observer.on_connected(&options.client_id);

        Ok(Box::new(MqttSession {
            shared,
            reader_task,
            keep_alive_task,
            next_packet_id: 0,
        }))
    }
}

async fn handshake(
    options: &ConnectOptions,
) -> Result<(OwnedReadHalf, OwnedWriteHalf), ClientError> {
    let stream = TcpStream::connect((options.host.as_str(), options.port))
        .await
        .map_err(|source| ClientError::Connect {
            broker: options.broker_url(),
            client_id: options.client_id.clone(),
            source,
        })?;
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();

    let keep_alive_secs = u16::try_from(options.keep_alive.as_secs()).unwrap_or(u16::MAX);
    let connect_packet = build_connect_packet(
        &options.client_id,
        &options.username,
        &options.password,
        options.clean_session,
        keep_alive_secs,
    );
    writer.write_all(&connect_packet).await?;

    match read_packet(&mut reader).await? {
        Some(Packet::ConnAck {
            code: 0,
            session_present,
        }) => {
            debug!(
                "Broker accepted '{}' (session present: {})",
                options.client_id, session_present
            );
            Ok((reader, writer))
        }
        Some(Packet::ConnAck { code, .. }) => Err(ClientError::ConnectRefused {
            client_id: options.client_id.clone(),
            code,
        }),
        Some(other) => Err(ClientError::protocol(format!(
            "expected CONNACK, got {other:?}"
        ))),
        None => Err(ClientError::protocol("connection closed before CONNACK")),
    }
}

/// SUBACK return code for a refused topic filter.
const SUBACK_FAILURE: u8 = 0x80;

type AckOutcome = Result<(), String>;

struct SessionShared {
    client_id: String,
    writer: Mutex<OwnedWriteHalf>,
    /// Completion senders keyed by packet id, resolved by the reader task.
    pending: Mutex<HashMap<u16, oneshot::Sender<AckOutcome>>>,
    disconnecting: AtomicBool,
    lost: AtomicBool,
    observer: Arc<dyn ConnectionObserver>,
}

impl SessionShared {
    async fn write(&self, packet: &[u8]) -> Result<(), ClientError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(packet).await?;
        Ok(())
    }

    async fn complete(&self, packet_id: u16, outcome: AckOutcome) {
        if let Some(waiter) = self.pending.lock().await.remove(&packet_id) {
            drop(waiter.send(outcome));
        } else {
            trace!(
                "'{}' received ack for unknown packet id {}",
                self.client_id, packet_id
            );
        }
    }

    fn report_lost(&self, error: &ClientError) {
        if self.disconnecting.load(Ordering::Acquire) {
            return;
        }
        if !self.lost.swap(true, Ordering::AcqRel) {
            self.observer.on_connection_lost(&self.client_id, error);
        }
    }
}

async fn read_loop(mut reader: OwnedReadHalf, shared: Arc<SessionShared>) {
    let error = loop {
        let packet = match read_packet(&mut reader).await {
            Ok(Some(packet)) => packet,
            Ok(None) => break ClientError::protocol("connection closed by broker"),
            Err(err) => break err,
        };
        if let Err(err) = handle_packet(&shared, packet).await {
            break err;
        }
    };
    shared.report_lost(&error);
    // Dropping the senders fails every publish still waiting for an ack.
    shared.pending.lock().await.clear();
}

async fn handle_packet(shared: &SessionShared, packet: Packet) -> Result<(), ClientError> {
    match packet {
        Packet::PubAck(id) | Packet::PubComp(id) => shared.complete(id, Ok(())).await,
        Packet::SubAck {
            packet_id,
            return_codes,
        } => {
            let outcome = if return_codes.is_empty() {
                Err("SUBACK carried no return codes".to_owned())
            } else if return_codes.contains(&SUBACK_FAILURE) {
                Err("broker refused the subscription".to_owned())
            } else {
                Ok(())
            };
            shared.complete(packet_id, outcome).await;
        }
        Packet::PubRec(id) => shared.write(&build_ack_packet(PUBREL, id)).await?,
        Packet::PubRel(id) => shared.write(&build_ack_packet(PUBCOMP, id)).await?,
        Packet::Publish {
            topic,
            qos,
            packet_id,
            payload,
            ..
        } => {
            shared.observer.on_message(&topic, &payload);
            match (qos, packet_id) {
                (QoS::AtLeastOnce, Some(id)) => shared.write(&build_ack_packet(PUBACK, id)).await?,
                (QoS::ExactlyOnce, Some(id)) => shared.write(&build_ack_packet(PUBREC, id)).await?,
                (QoS::AtMostOnce | QoS::AtLeastOnce | QoS::ExactlyOnce, _) => {}
            }
        }
        Packet::PingResp => trace!("'{}' keep-alive acknowledged", shared.client_id),
        Packet::Connect { .. }
        | Packet::ConnAck { .. }
        | Packet::Subscribe { .. }
        | Packet::PingReq
        | Packet::Disconnect => {
            return Err(ClientError::protocol(format!(
                "unexpected packet from broker: {packet:?}"
            )));
        }
    }
    Ok(())
}

fn spawn_keep_alive(shared: Arc<SessionShared>, keep_alive: Duration) -> Option<JoinHandle<()>> {
    if keep_alive.is_zero() {
        return None;
    }
    let period = keep_alive.checked_div(2).unwrap_or(keep_alive);
    Some(tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if shared.write(&build_empty_packet(PINGREQ)).await.is_err() {
                break;
            }
        }
    }))
}

struct MqttSession {
    shared: Arc<SessionShared>,
    reader_task: JoinHandle<()>,
    keep_alive_task: Option<JoinHandle<()>>,
    next_packet_id: u16,
}

impl MqttSession {
    fn next_packet_id(&mut self) -> u16 {
        self.next_packet_id = self.next_packet_id.checked_add(1).unwrap_or(1);
        self.next_packet_id
    }

    fn ensure_alive(&self) -> Result<(), ClientError> {
        if self.shared.lost.load(Ordering::Acquire) {
            return Err(ClientError::ConnectionLost {
                client_id: self.shared.client_id.clone(),
                reason: "connection dropped earlier in the run".to_owned(),
            });
        }
        Ok(())
    }

    async fn send_and_wait(&self, packet_id: u16, packet: &[u8]) -> Result<(), String> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.shared.pending.lock().await.insert(packet_id, ack_tx);
        if self.shared.lost.load(Ordering::Acquire) {
            self.shared.pending.lock().await.remove(&packet_id);
            return Err("connection lost".to_owned());
        }
        if let Err(err) = self.shared.write(packet).await {
            self.shared.pending.lock().await.remove(&packet_id);
            return Err(err.to_string());
        }
        ack_rx
            .await
            .map_err(|_closed| "connection closed before acknowledgement".to_owned())?
    }

    fn stop_tasks(&mut self) {
        self.reader_task.abort();
        if let Some(task) = self.keep_alive_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl Session for MqttSession {
    fn client_id(&self) -> &str {
        &self.shared.client_id
    }

    async fn publish(
        &mut self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: &[u8],
    ) -> Result<(), ClientError> {
        self.ensure_alive()?;
        let outcome = match qos {
            QoS::AtMostOnce => {
                let packet = build_publish_packet(topic, qos, retain, None, payload);
                self.shared
                    .write(&packet)
                    .await
                    .map_err(|err| err.to_string())
            }
            QoS::AtLeastOnce | QoS::ExactlyOnce => {
                let packet_id = self.next_packet_id();
                let packet = build_publish_packet(topic, qos, retain, Some(packet_id), payload);
                self.send_and_wait(packet_id, &packet).await
            }
        };
        outcome.map_err(|reason| ClientError::Publish {
            client_id: self.shared.client_id.clone(),
            topic: topic.to_owned(),
            reason,
        })
    }

    async fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), ClientError> {
        self.ensure_alive()?;
        let packet_id = self.next_packet_id();
        let packet = build_subscribe_packet(packet_id, topic, qos);
        let outcome = self.send_and_wait(packet_id, &packet).await;
        outcome.map_err(|reason| ClientError::Subscribe {
            client_id: self.shared.client_id.clone(),
            topic: topic.to_owned(),
            reason,
        })
    }

    async fn disconnect(&mut self, grace: Duration) -> Result<(), ClientError> {
        if self.shared.disconnecting.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let result = if self.shared.lost.load(Ordering::Acquire) {
            Ok(())
        } else {
            self.shared.write(&build_empty_packet(DISCONNECT)).await
        };
        tokio::time::sleep(grace).await;
        {
            let mut writer = self.shared.writer.lock().await;
            drop(writer.shutdown().await);
        }
        self.stop_tasks();
        result
    }
}

impl Drop for MqttSession {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}
