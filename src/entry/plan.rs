use std::sync::Arc;

use mqtt_load_generator::args::LoadArgs;
use mqtt_load_generator::broker::MqttBroker;
use mqtt_load_generator::config::LoadSettings;
use mqtt_load_generator::error::{AppError, AppResult};
use mqtt_load_generator::progress::{ProgressBar, ProgressReporter, SilentReporter};
use mqtt_load_generator::runner::run_load;
use tracing::{error, info};

/// Everything needed to start a run, validated up front.
pub(super) struct LoadPlan {
    settings: Arc<LoadSettings>,
    no_color: bool,
}

pub(super) fn build_plan(args: &LoadArgs) -> AppResult<LoadPlan> {
    let settings = LoadSettings::from_args(args).map_err(|err| {
        error!("{}", err);
        AppError::from(err)
    })?;
    info!(
        "Target mqtt://{}:{}, topic '{}', {} clients x {} messages",
        settings.host,
        settings.port,
        settings.target_topic,
        settings.client_count,
        settings.message_count
    );
    Ok(LoadPlan {
        settings: Arc::new(settings),
        no_color: args.no_color,
    })
}

pub(super) async fn execute_plan(plan: LoadPlan) -> AppResult<()> {
    let reporter: Box<dyn ProgressReporter> = if plan.settings.debug {
        Box::new(SilentReporter)
    } else {
        ProgressBar::for_stderr(plan.settings.expected_publishes(), plan.no_color)
    };

    let outcome = run_load(plan.settings, Arc::new(MqttBroker::new()), reporter).await?;
    if outcome.report.is_success() {
        return Ok(());
    }

    for failure in &outcome.report.failures {
        error!(
            "Client '{}' stopped early after {} messages: {}",
            failure.client_id, failure.published, failure.error
        );
    }
    Err(AppError::ClientsFailed {
        failed: outcome.report.failures.len(),
        total: outcome.report.clients,
    })
}
