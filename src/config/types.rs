use std::time::Duration;

use serde::Deserialize;

use crate::args::parse_duration_arg;
use crate::error::{AppResult, ConfigError};

/// Every field mirrors a CLI flag; absent fields leave the CLI value alone.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub message: Option<String>,
    #[serde(alias = "count")]
    pub message_count: Option<i64>,
    #[serde(alias = "size")]
    pub message_size: Option<i64>,
    pub interval: Option<i64>,
    pub schedule: Option<String>,
    #[serde(alias = "topic")]
    pub target_topic: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<i64>,
    #[serde(alias = "clients")]
    pub client_count: Option<i64>,
    #[serde(alias = "suffix")]
    pub id_as_sub_topic: Option<bool>,
    pub qos: Option<i64>,
    pub mutator: Option<String>,
    pub mutation_rate: Option<f64>,
    pub disallowed: Option<String>,
    pub debug: Option<bool>,
    pub subscribe: Option<String>,
    pub seed: Option<u64>,
    pub connect_timeout: Option<DurationValue>,
    pub verbose: Option<bool>,
    pub no_color: Option<bool>,
}

/// A duration given either as whole seconds or as text like `500ms`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> AppResult<Duration> {
        match self {
            DurationValue::Seconds(secs) => parse_duration_arg(&format!("{secs}s")),
            DurationValue::Text(text) => parse_duration_arg(text),
        }
        .map_err(|err| {
            ConfigError::InvalidConnectTimeout {
                message: err.to_string(),
            }
            .into()
        })
    }
}
