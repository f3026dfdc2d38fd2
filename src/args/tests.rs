use std::time::Duration;

use super::parse_duration_arg;
use super::parsers::parse_bool_env;
use super::test_support::parse_test_args;
use crate::error::{AppError, AppResult, ValidationError};

#[test]
fn parse_args_defaults() -> AppResult<()> {
    let args = parse_test_args(["mqtt-load-generator"])?;

    let checks = [
        (args.message.is_empty(), "Expected empty message"),
        (args.message_count == 1000, "Unexpected message_count"),
        (args.message_size == 100, "Unexpected message_size"),
        (args.interval == 1, "Unexpected interval"),
        (args.schedule == "normal", "Unexpected schedule"),
        (args.target_topic == "/load", "Unexpected target_topic"),
        (args.username.is_empty(), "Expected empty username"),
        (args.password.is_empty(), "Expected empty password"),
        (args.host == "localhost", "Unexpected host"),
        (args.port == 1883, "Unexpected port"),
        (args.client_count == 1, "Unexpected client_count"),
        (!args.id_as_sub_topic, "Expected id_as_sub_topic to be false"),
        (args.qos == 1, "Unexpected qos"),
        (args.mutator.is_empty(), "Expected empty mutator"),
        (
            (args.mutation_rate - 0.07).abs() < f64::EPSILON,
            "Unexpected mutation_rate",
        ),
        (args.disallowed.is_empty(), "Expected empty disallowed"),
        (!args.debug, "Expected debug to be false"),
        (args.subscribe.is_none(), "Expected subscribe to be None"),
        (args.seed.is_none(), "Expected seed to be None"),
        (
            args.connect_timeout == Duration::from_secs(10),
            "Unexpected connect_timeout",
        ),
        (args.config.is_none(), "Expected config to be None"),
    ];
    for (ok, message) in checks {
        if !ok {
            return Err(AppError::validation(message));
        }
    }
    Ok(())
}

#[test]
fn parse_args_short_flags_mirror_the_original_tool() -> AppResult<()> {
    let args = parse_test_args([
        "mqtt-load-generator",
        "-m",
        "hello",
        "-c",
        "5",
        "-s",
        "12",
        "-i",
        "-1",
        "-z",
        "flat",
        "-t",
        "/bench",
        "-u",
        "user",
        "-P",
        "secret",
        "-h",
        "broker.local",
        "-p",
        "8883",
        "-n",
        "3",
        "--suffix",
        "-q",
        "2",
        "-M",
        "sym",
        "--Mr",
        "0.5",
        "--disallowed",
        "+#",
        "--debug",
        "--seed",
        "9",
    ])?;

    let checks = [
        (args.message == "hello", "Unexpected message"),
        (args.message_count == 5, "Unexpected message_count"),
        (args.message_size == 12, "Unexpected message_size"),
        (args.interval == -1, "Unexpected interval"),
        (args.schedule == "flat", "Unexpected schedule"),
        (args.target_topic == "/bench", "Unexpected target_topic"),
        (args.username == "user", "Unexpected username"),
        (args.password == "secret", "Unexpected password"),
        (args.host == "broker.local", "Unexpected host"),
        (args.port == 8883, "Unexpected port"),
        (args.client_count == 3, "Unexpected client_count"),
        (args.id_as_sub_topic, "Expected id_as_sub_topic"),
        (args.qos == 2, "Unexpected qos"),
        (args.mutator == "sym", "Unexpected mutator"),
        (
            (args.mutation_rate - 0.5).abs() < f64::EPSILON,
            "Unexpected mutation_rate",
        ),
        (args.disallowed == "+#", "Unexpected disallowed"),
        (args.debug, "Expected debug"),
        (args.seed == Some(9), "Unexpected seed"),
    ];
    for (ok, message) in checks {
        if !ok {
            return Err(AppError::validation(message));
        }
    }
    Ok(())
}

#[test]
fn parse_args_accepts_out_of_range_qos_for_later_validation() -> AppResult<()> {
    let args = parse_test_args(["mqtt-load-generator", "-q", "5"])?;
    if args.qos != 5 {
        return Err(AppError::validation("Expected qos to be parsed as 5"));
    }
    Ok(())
}

#[test]
fn parse_args_rejects_invalid_connect_timeout() -> AppResult<()> {
    let result = parse_test_args(["mqtt-load-generator", "--connect-timeout", "0s"]);
    if result.is_ok() {
        return Err(AppError::validation("Expected zero timeout to be rejected"));
    }
    Ok(())
}

#[test]
fn parse_duration_units() -> AppResult<()> {
    let cases = [
        ("250ms", Duration::from_millis(250)),
        ("10", Duration::from_secs(10)),
        ("10s", Duration::from_secs(10)),
        ("2m", Duration::from_secs(120)),
        ("1h", Duration::from_secs(3600)),
    ];
    for (input, expected) in cases {
        let parsed = parse_duration_arg(input)?;
        if parsed != expected {
            return Err(AppError::validation(format!(
                "Unexpected duration for '{}': {:?}",
                input, parsed
            )));
        }
    }
    Ok(())
}

#[test]
fn parse_duration_errors() -> AppResult<()> {
    let cases: [(&str, fn(&ValidationError) -> bool); 5] = [
        ("", |err| matches!(err, ValidationError::DurationEmpty)),
        ("ms", |err| {
            matches!(err, ValidationError::InvalidDurationFormat { .. })
        }),
        ("5d", |err| {
            matches!(err, ValidationError::InvalidDurationUnit { .. })
        }),
        ("0ms", |err| matches!(err, ValidationError::DurationZero)),
        ("99999999999999999h", |err| {
            matches!(err, ValidationError::DurationOverflow)
        }),
    ];
    for (input, expected) in cases {
        match parse_duration_arg(input) {
            Err(AppError::Validation(err)) if expected(&err) => {}
            other => {
                return Err(AppError::validation(format!(
                    "Unexpected result for '{}': {:?}",
                    input, other
                )));
            }
        }
    }
    Ok(())
}

#[test]
fn parse_bool_env_values() -> AppResult<()> {
    for value in ["1", "true", "YES", " on "] {
        if !parse_bool_env(value)? {
            return Err(AppError::validation(format!("Expected true for {}", value)));
        }
    }
    for value in ["0", "false", "No", "off"] {
        if parse_bool_env(value)? {
            return Err(AppError::validation(format!("Expected false for {}", value)));
        }
    }
    if parse_bool_env("maybe").is_ok() {
        return Err(AppError::validation("Expected invalid boolean error"));
    }
    Ok(())
}
