//! Core library for the `mqtt-load-generator` CLI.
//!
//! A pool of concurrent MQTT clients connects to one broker, waits until every
//! client is connected, then publishes a fixed number of messages per client
//! on a configurable schedule. Topics and payloads can be randomly mutated to
//! fuzz the broker. Progress flows over a channel to a single aggregator.
//!
//! The wire protocol sits behind the [`broker::Broker`] and
//! [`broker::Session`] traits; [`broker::MqttBroker`] speaks MQTT 3.1.1 over
//! TCP and [`broker::MemoryBroker`] keeps everything in-process.
pub mod args;
pub mod broker;
pub mod client;
pub mod config;
pub mod error;
pub mod mutation;
pub mod pool;
pub mod progress;
pub mod runner;
pub mod schedule;

#[cfg(feature = "fuzzing")]
pub mod fuzzing;
