mod plan;

use std::ffi::OsString;

use clap::{ArgMatches, CommandFactory, FromArgMatches};

use mqtt_load_generator::args::LoadArgs;
use mqtt_load_generator::error::AppResult;
use plan::{build_plan, execute_plan};

pub(crate) fn run() -> AppResult<()> {
    let (mut args, matches) = parse_args()?;
    let config = mqtt_load_generator::config::load_config(args.config.as_deref())?;
    if let Some(config) = config.as_ref() {
        mqtt_load_generator::config::apply_config(&mut args, &matches, config)?;
    }

    crate::logger::init_logging(args.verbose, args.no_color);

    let plan = build_plan(&args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(execute_plan(plan))
}

fn parse_args() -> AppResult<(LoadArgs, ArgMatches)> {
    let raw_args: Vec<OsString> = std::env::args_os().collect();
    let matches = LoadArgs::command().get_matches_from(raw_args);
    let args = LoadArgs::from_arg_matches(&matches)?;
    Ok((args, matches))
}
