pub(crate) const DEFAULT_MESSAGE_COUNT: i64 = 1000;
pub(crate) const DEFAULT_MESSAGE_SIZE: i64 = 100;
pub(crate) const DEFAULT_INTERVAL_MS: i64 = 1;
pub(crate) const DEFAULT_SCHEDULE: &str = "normal";
pub(crate) const DEFAULT_TARGET_TOPIC: &str = "/load";
pub(crate) const DEFAULT_HOST: &str = "localhost";
pub(crate) const DEFAULT_PORT: i64 = 1883;
pub(crate) const DEFAULT_CLIENT_COUNT: i64 = 1;
pub(crate) const DEFAULT_QOS: i64 = 1;
pub(crate) const DEFAULT_MUTATION_RATE: f64 = 0.07;
pub(crate) const DEFAULT_CONNECT_TIMEOUT: &str = "10s";
