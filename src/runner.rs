//! One complete load run: progress aggregation plus the client pool.
use std::sync::Arc;

use tokio::time::Instant;
use tracing::info;

use crate::broker::Broker;
use crate::config::LoadSettings;
use crate::error::AppResult;
use crate::pool::{Pool, RunReport};
use crate::progress::{self, ProgressReporter, ProgressTotals};

#[derive(Debug)]
pub struct LoadOutcome {
    pub report: RunReport,
    pub totals: ProgressTotals,
}

/// Connects the whole fleet, runs it to completion, and waits for the
/// aggregator to drain every progress unit.
///
/// # Errors
///
/// Returns an error when a client cannot connect or a task fails to join.
/// Publish failures do not abort the run; they are listed in the report.
pub async fn run_load(
    settings: Arc<LoadSettings>,
    broker: Arc<dyn Broker>,
    reporter: Box<dyn ProgressReporter>,
) -> AppResult<LoadOutcome> {
    let (sender, receiver) = progress::channel();
    let aggregator = progress::spawn_progress_aggregator(receiver, reporter);
    let started = Instant::now();

    let report = match Pool::build(settings, broker, sender).setup().await {
        Ok(connected) => connected.run().await?,
        Err(err) => {
            aggregator.abort();
            return Err(err);
        }
    };
    let totals = aggregator.await?;

    info!(
        "Published {} messages from {} clients in {:.2?}",
        report.published,
        report.clients,
        started.elapsed()
    );
    if totals.received > 0 {
        info!("Received {} messages", totals.received);
    }
    Ok(LoadOutcome { report, totals })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::test_support::parse_test_args;
    use crate::broker::MemoryBroker;
    use crate::error::{AppError, ClientError, ValidationError};
    use crate::progress::SilentReporter;

    fn run_async_test<F>(future: F) -> AppResult<()>
    where
        F: std::future::Future<Output = AppResult<()>>,
    {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        runtime.block_on(future)
    }

    #[test]
    fn run_load_counts_every_publish() -> AppResult<()> {
        let args = parse_test_args([
            "mqtt-load-generator",
            "-n",
            "3",
            "-c",
            "5",
            "-i",
            "0",
            "-m",
            "hello",
        ])?;
        let settings = Arc::new(LoadSettings::from_args(&args)?);
        let broker = MemoryBroker::new();

        run_async_test(async {
            let outcome =
                run_load(settings, Arc::new(broker.clone()), Box::new(SilentReporter)).await?;
            if !outcome.report.is_success() {
                return Err(AppError::validation(format!(
                    "Unexpected failures: {:?}",
                    outcome.report.failures
                )));
            }
            if outcome.totals.published != 15 || outcome.report.published != 15 {
                return Err(AppError::validation(format!(
                    "Expected 15 publishes, got {:?}",
                    outcome.totals
                )));
            }
            if broker.published().iter().any(|message| message.payload != b"hello") {
                return Err(AppError::validation("Expected unmutated payloads"));
            }
            Ok(())
        })
    }

    #[test]
    fn run_load_with_subscription_counts_received_units() -> AppResult<()> {
        let args = parse_test_args([
            "mqtt-load-generator",
            "-n",
            "2",
            "-c",
            "3",
            "-i",
            "0",
            "-t",
            "/load",
            "--suffix",
            "--subscribe",
            "/load/0",
        ])?;
        let settings = Arc::new(LoadSettings::from_args(&args)?);

        run_async_test(async {
            let outcome = run_load(
                settings,
                Arc::new(MemoryBroker::new()),
                Box::new(SilentReporter),
            )
            .await?;
            if outcome.totals.published != 6 {
                return Err(AppError::validation(format!(
                    "Expected 6 publishes, got {:?}",
                    outcome.totals
                )));
            }
            // Both clients subscribe to client 0's topic; each of its three
            // messages reaches every subscriber still connected, itself included.
            if !(3..=6).contains(&outcome.totals.received) {
                return Err(AppError::validation(format!(
                    "Unexpected received count: {:?}",
                    outcome.totals
                )));
            }
            Ok(())
        })
    }

    #[test]
    fn invalid_qos_is_rejected_before_any_connect() -> AppResult<()> {
        let args = parse_test_args(["mqtt-load-generator", "-q", "5"])?;
        let broker = MemoryBroker::new();

        match LoadSettings::from_args(&args) {
            Err(ValidationError::InvalidQos { value: 5 }) => {}
            other => {
                return Err(AppError::validation(format!(
                    "Expected invalid QoS, got {:?}",
                    other
                )));
            }
        }
        if broker.connect_attempts() != 0 {
            return Err(AppError::validation("Expected no connection attempts"));
        }
        Ok(())
    }

    #[test]
    fn run_load_propagates_connect_failures() -> AppResult<()> {
        let settings = Arc::new(LoadSettings {
            client_count: 2,
            message_count: 1,
            ..LoadSettings::default()
        });

        run_async_test(async {
            let broker = MemoryBroker::new().refusing_connections();
            match run_load(settings, Arc::new(broker), Box::new(SilentReporter)).await {
                Err(AppError::Client(ClientError::ConnectRefused { .. })) => Ok(()),
                other => Err(AppError::validation(format!(
                    "Expected refused connect, got {:?}",
                    other
                ))),
            }
        })
    }
}
