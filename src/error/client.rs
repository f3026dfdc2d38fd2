use std::time::Duration;

use thiserror::Error;

/// Failures raised by the messaging collaborator and the clients driving it.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Error establishing MQTT connection to {broker} for '{client_id}': {source}")]
    Connect {
        broker: String,
        client_id: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Broker refused connection for '{client_id}' with return code {code}.")]
    ConnectRefused { client_id: String, code: u8 },
    #[error("Timed out after {timeout:?} connecting '{client_id}'.")]
    ConnectTimeout { client_id: String, timeout: Duration },
    #[error("Connection lost for client '{client_id}': {reason}")]
    ConnectionLost { client_id: String, reason: String },
    #[error("Publish to '{topic}' failed for '{client_id}': {reason}")]
    Publish {
        client_id: String,
        topic: String,
        reason: String,
    },
    #[error("Subscribe to '{topic}' failed for '{client_id}': {reason}")]
    Subscribe {
        client_id: String,
        topic: String,
        reason: String,
    },
    #[error("Client '{client_id}' is not connected.")]
    NotConnected { client_id: String },
    #[error("MQTT protocol violation: {message}")]
    Protocol { message: String },
    #[error("MQTT I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl ClientError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        ClientError::Protocol {
            message: message.into(),
        }
    }
}
