use std::path::Path;
use std::time::Duration;

use clap::{CommandFactory, FromArgMatches, Parser};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::args::{LoadArgs, parse_duration_arg};
use crate::broker::codec::decode_packet;
use crate::config::{LoadSettings, apply_config, parse_config};
use crate::error::{AppError, AppResult};
use crate::mutation::{MutationPolicy, MutatorKind};

/// Mutator names accepted by `-M`, indexed by the fuzzer's selector byte.
const MUTATORS: [&str; 4] = ["", "alfa", "sym", "bin"];

/// Output of one mutation pass over a fuzzed topic and payload.
#[derive(Debug)]
pub struct MutationSample {
    pub kind: MutatorKind,
    pub disallowed: String,
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Runs the mutation engine over `topic` and `payload`.
///
/// `selector` picks the mutator and `seed` drives the random source, so a
/// crashing input replays deterministically.
#[must_use]
pub fn mutate_input(
    selector: u8,
    seed: u64,
    disallowed: &str,
    topic: &str,
    payload: &[u8],
) -> MutationSample {
    let name = MUTATORS
        .get(usize::from(selector).checked_rem(MUTATORS.len()).unwrap_or_default())
        .copied()
        .unwrap_or_default();
    let policy = MutationPolicy::new(MutatorKind::from_name(name), 1.0, disallowed);
    let mut rng = StdRng::seed_from_u64(seed);
    MutationSample {
        kind: policy.kind(),
        disallowed: disallowed.to_owned(),
        topic: policy.mutate(topic, &mut rng),
        payload: policy.mutate_bytes(payload, &mut rng),
    }
}

/// Parses CLI tokens and validates them into settings.
///
/// # Errors
///
/// Returns an error when parsing or validation fails.
pub fn settings_from_cli<I>(tokens: I) -> AppResult<LoadSettings>
where
    I: IntoIterator<Item = String>,
{
    let argv = std::iter::once("mqtt-load-generator".to_owned()).chain(tokens);
    let args = LoadArgs::try_parse_from(argv)?;
    LoadSettings::from_args(&args).map_err(AppError::from)
}

/// Parses a duration argument (e.g. `10s`, `500ms`).
///
/// # Errors
///
/// Returns an error when the duration is invalid.
pub fn parse_duration_arg_input(input: &str) -> AppResult<Duration> {
    parse_duration_arg(input)
}

/// Parses TOML config, overlays it on the defaults, and validates the result.
///
/// # Errors
///
/// Returns an error when parsing or validation fails.
pub fn settings_from_toml(input: &str) -> AppResult<LoadSettings> {
    settings_from_config(Path::new("fuzz.toml"), input)
}

/// Parses JSON config, overlays it on the defaults, and validates the result.
///
/// # Errors
///
/// Returns an error when parsing or validation fails.
pub fn settings_from_json(input: &str) -> AppResult<LoadSettings> {
    settings_from_config(Path::new("fuzz.json"), input)
}

fn settings_from_config(path: &Path, input: &str) -> AppResult<LoadSettings> {
    let config = parse_config(path, input)?;
    let matches = LoadArgs::command().try_get_matches_from(["mqtt-load-generator"])?;
    let mut args = LoadArgs::from_arg_matches(&matches)?;
    apply_config(&mut args, &matches, &config)?;
    LoadSettings::from_args(&args).map_err(AppError::from)
}

/// Decodes one MQTT control packet: the first byte is the fixed header and
/// the rest is the body.
///
/// # Errors
///
/// Returns an error when the packet is malformed.
pub fn decode_packet_input(data: &[u8]) -> AppResult<()> {
    let Some((header, body)) = data.split_first() else {
        return Ok(());
    };
    decode_packet(*header, body)?;
    Ok(())
}
