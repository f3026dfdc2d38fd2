use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::LoadArgs;
use crate::error::AppResult;

use super::types::ConfigFile;

/// Overlays config file values onto CLI arguments.
///
/// Values given on the command line always win over the file.
///
/// # Errors
///
/// Returns an error when a config value cannot be interpreted.
pub fn apply_config(
    args: &mut LoadArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    overlay(&mut args.message, matches, "message", config.message.as_ref());
    overlay(
        &mut args.message_count,
        matches,
        "message_count",
        config.message_count.as_ref(),
    );
    overlay(
        &mut args.message_size,
        matches,
        "message_size",
        config.message_size.as_ref(),
    );
    overlay(&mut args.interval, matches, "interval", config.interval.as_ref());
    overlay(&mut args.schedule, matches, "schedule", config.schedule.as_ref());
    overlay(
        &mut args.target_topic,
        matches,
        "target_topic",
        config.target_topic.as_ref(),
    );
    overlay(&mut args.username, matches, "username", config.username.as_ref());
    overlay(&mut args.password, matches, "password", config.password.as_ref());
    overlay(&mut args.host, matches, "host", config.host.as_ref());
    overlay(&mut args.port, matches, "port", config.port.as_ref());
    overlay(
        &mut args.client_count,
        matches,
        "client_count",
        config.client_count.as_ref(),
    );
    overlay(
        &mut args.id_as_sub_topic,
        matches,
        "id_as_sub_topic",
        config.id_as_sub_topic.as_ref(),
    );
    overlay(&mut args.qos, matches, "qos", config.qos.as_ref());
    overlay(&mut args.mutator, matches, "mutator", config.mutator.as_ref());
    overlay(
        &mut args.mutation_rate,
        matches,
        "mutation_rate",
        config.mutation_rate.as_ref(),
    );
    overlay(
        &mut args.disallowed,
        matches,
        "disallowed",
        config.disallowed.as_ref(),
    );
    overlay(&mut args.debug, matches, "debug", config.debug.as_ref());
    overlay(&mut args.verbose, matches, "verbose", config.verbose.as_ref());
    overlay(&mut args.no_color, matches, "no_color", config.no_color.as_ref());

    if !is_cli(matches, "subscribe")
        && let Some(topic) = config.subscribe.clone()
    {
        args.subscribe = Some(topic);
    }

    if !is_cli(matches, "seed")
        && let Some(seed) = config.seed
    {
        args.seed = Some(seed);
    }

    if !is_cli(matches, "connect_timeout")
        && let Some(timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = timeout.to_duration()?;
    }

    Ok(())
}

fn overlay<T: Clone>(target: &mut T, matches: &ArgMatches, name: &str, value: Option<&T>) {
    if !is_cli(matches, name)
        && let Some(value) = value
    {
        target.clone_from(value);
    }
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}
