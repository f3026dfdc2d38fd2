use clap::{ArgAction, Parser};
use std::time::Duration;

use super::defaults::{
    DEFAULT_CLIENT_COUNT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_INTERVAL_MS,
    DEFAULT_MESSAGE_COUNT, DEFAULT_MESSAGE_SIZE, DEFAULT_MUTATION_RATE, DEFAULT_PORT, DEFAULT_QOS,
    DEFAULT_SCHEDULE, DEFAULT_TARGET_TOPIC,
};
use super::parsers::{parse_bool_env, parse_duration_arg};

#[derive(Debug, Parser, Clone)]
#[command(
    version,
    about = "Concurrent MQTT publish load generator with an optional character-level mutation fuzzer.",
    disable_help_flag = true
)]
pub struct LoadArgs {
    /// Message to send and maybe mutate. Empty sends --size random bytes
    #[arg(short = 'm', long = "message", default_value = "")]
    pub message: String,

    /// Number of messages each client sends
    #[arg(short = 'c', long = "count", default_value_t = DEFAULT_MESSAGE_COUNT, allow_negative_numbers = true)]
    pub message_count: i64,

    /// Size in bytes of the random payload used when --message is empty
    #[arg(short = 's', long = "size", default_value_t = DEFAULT_MESSAGE_SIZE, allow_negative_numbers = true)]
    pub message_size: i64,

    /// Milliseconds to wait between messages (<= 0 disables waiting)
    #[arg(short = 'i', long = "interval", default_value_t = DEFAULT_INTERVAL_MS, allow_negative_numbers = true)]
    pub interval: i64,

    /// Distribution of the wait between messages: flat, normal, or random
    #[arg(short = 'z', long = "schedule", default_value = DEFAULT_SCHEDULE)]
    pub schedule: String,

    /// Target MQTT topic to publish messages to
    #[arg(short = 't', long = "topic", default_value = DEFAULT_TARGET_TOPIC)]
    pub target_topic: String,

    /// MQTT username
    #[arg(short = 'u', long = "username", default_value = "")]
    pub username: String,

    /// MQTT password
    #[arg(short = 'P', long = "password", default_value = "")]
    pub password: String,

    /// MQTT host
    #[arg(short = 'h', long = "host", default_value = DEFAULT_HOST)]
    pub host: String,

    /// MQTT port
    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT, allow_negative_numbers = true)]
    pub port: i64,

    /// Number of concurrent MQTT clients
    #[arg(short = 'n', long = "clients", default_value_t = DEFAULT_CLIENT_COUNT, allow_negative_numbers = true)]
    pub client_count: i64,

    /// Append each client's ordinal as an extra level to --topic
    #[arg(long = "suffix")]
    pub id_as_sub_topic: bool,

    /// MQTT QoS used by all clients (0, 1, or 2)
    #[arg(short = 'q', long = "qos", default_value_t = DEFAULT_QOS, allow_negative_numbers = true)]
    pub qos: i64,

    /// Mutate topic and message: alfa (alphanumerics), sym (printable ASCII), bin (random bit flips)
    #[arg(short = 'M', long = "mutator", default_value = "")]
    pub mutator: String,

    /// Probability of mutating each character
    #[arg(long = "Mr", default_value_t = DEFAULT_MUTATION_RATE, allow_negative_numbers = true)]
    pub mutation_rate: f64,

    /// Characters mutation must never introduce (e.g. '+#')
    #[arg(long = "disallowed", default_value = "")]
    pub disallowed: String,

    /// Print every publish instead of the progress bar
    #[arg(long = "debug")]
    pub debug: bool,

    /// Topic filter every client subscribes to; received messages are counted
    #[arg(long = "subscribe")]
    pub subscribe: Option<String>,

    /// Seed for reproducible payloads, mutations, and waits
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Deadline for each client's MQTT handshake (supports ms/s/m/h)
    #[arg(
        long = "connect-timeout",
        default_value = DEFAULT_CONNECT_TIMEOUT,
        value_parser = parse_duration_arg
    )]
    pub connect_timeout: Duration,

    /// Enable verbose logging (sets log level to debug unless overridden by MQTT_LOAD_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable color output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env)]
    pub no_color: bool,

    /// Path to config file (TOML/JSON). Defaults to ./mqtt-load-generator.toml or .json if present.
    #[arg(long)]
    pub config: Option<String>,

    /// Print help
    #[arg(long = "help", action = ArgAction::Help)]
    pub help: Option<bool>,
}
