use std::time::Duration;

use crate::args::LoadArgs;
use crate::args::defaults::{
    DEFAULT_HOST, DEFAULT_INTERVAL_MS, DEFAULT_MESSAGE_COUNT, DEFAULT_MESSAGE_SIZE, DEFAULT_PORT,
    DEFAULT_TARGET_TOPIC,
};
use crate::broker::QoS;
use crate::error::ValidationError;
use crate::mutation::{MutationPolicy, MutatorKind};
use crate::schedule::{ScheduleKind, SchedulePolicy};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Validated, immutable run configuration shared by every client.
#[derive(Debug, Clone)]
pub struct LoadSettings {
    /// Payload template; empty means `message_size` random bytes.
    pub message: String,
    pub message_size: usize,
    /// Messages published by each client.
    pub message_count: u64,
    pub schedule: SchedulePolicy,
    pub target_topic: String,
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub client_count: usize,
    pub id_as_sub_topic: bool,
    pub qos: QoS,
    pub mutation: MutationPolicy,
    pub debug: bool,
    pub subscribe_topic: Option<String>,
    pub connect_timeout: Duration,
    pub seed: Option<u64>,
}

impl LoadSettings {
    /// Validates CLI (and config-overlaid) arguments.
    ///
    /// # Errors
    ///
    /// Returns an error for a QoS outside 0..=2, a mutation rate outside
    /// `[0, 1]`, no clients, an empty host, an unusable port, or a negative
    /// message count or size.
    pub fn from_args(args: &LoadArgs) -> Result<Self, ValidationError> {
        let qos = QoS::try_from(args.qos)?;

        let rate = args.mutation_rate;
        if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
            return Err(ValidationError::InvalidMutationRate { value: rate });
        }

        let client_count = usize::try_from(args.client_count)
            .ok()
            .filter(|count| *count > 0)
            .ok_or(ValidationError::NoClients)?;

        let host = args.host.trim();
        if host.is_empty() {
            return Err(ValidationError::EmptyHost);
        }
        let port = u16::try_from(args.port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or(ValidationError::InvalidPort { value: args.port })?;

        let message_count =
            u64::try_from(args.message_count).map_err(|_err| ValidationError::NegativeMessageCount {
                value: args.message_count,
            })?;
        let message_size =
            usize::try_from(args.message_size).map_err(|_err| ValidationError::NegativeMessageSize {
                value: args.message_size,
            })?;

        let subscribe_topic = args
            .subscribe
            .as_deref()
            .map(str::trim)
            .filter(|topic| !topic.is_empty())
            .map(str::to_owned);

        Ok(Self {
            message: args.message.clone(),
            message_size,
            message_count,
            schedule: SchedulePolicy::new(args.interval, ScheduleKind::from_name(&args.schedule)),
            target_topic: args.target_topic.clone(),
            username: args.username.clone(),
            password: args.password.clone(),
            host: host.to_owned(),
            port,
            client_count,
            id_as_sub_topic: args.id_as_sub_topic,
            qos,
            mutation: MutationPolicy::new(
                MutatorKind::from_name(&args.mutator),
                rate,
                args.disallowed.clone(),
            ),
            debug: args.debug,
            subscribe_topic,
            connect_timeout: args.connect_timeout,
            seed: args.seed,
        })
    }

    /// Progress units expected from publishing alone.
    #[must_use]
    pub fn expected_publishes(&self) -> u64 {
        let clients = u64::try_from(self.client_count).unwrap_or(u64::MAX);
        self.message_count.saturating_mul(clients)
    }
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            message: String::new(),
            message_size: usize::try_from(DEFAULT_MESSAGE_SIZE).unwrap_or_default(),
            message_count: u64::try_from(DEFAULT_MESSAGE_COUNT).unwrap_or_default(),
            schedule: SchedulePolicy::new(DEFAULT_INTERVAL_MS, ScheduleKind::default()),
            target_topic: DEFAULT_TARGET_TOPIC.to_owned(),
            username: String::new(),
            password: String::new(),
            host: DEFAULT_HOST.to_owned(),
            port: u16::try_from(DEFAULT_PORT).unwrap_or(1883),
            client_count: 1,
            id_as_sub_topic: false,
            qos: QoS::AtLeastOnce,
            mutation: MutationPolicy::disabled(),
            debug: false,
            subscribe_topic: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            seed: None,
        }
    }
}
