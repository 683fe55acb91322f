#![allow(clippy::needless_return)]
#![warn(clippy::implicit_return)]

#[macro_use]
extern crate log;

use flexi_logger::LogSpecification;
use libytgrab::Error;

mod clap_conf;
use clap_conf::{
	CliDerive,
	SubCommands,
};

mod commands;
mod logger;
mod utils;

/// Main
fn main() -> Result<(), crate::Error> {
	let mut logger_handle = logger::setup_logger()?;

	let cli_matches = CliDerive::custom_parse()?;

	if cli_matches.force_color {
		colored::control::set_override(true);
	}

	log::info!("CLI Verbosity is {}", cli_matches.verbosity);

	// apply cli "verbosity" argument to the log level
	logger_handle.set_new_spec(
		match cli_matches.verbosity {
			0 => LogSpecification::parse("warn"),
			1 => LogSpecification::parse("info"),
			2 => LogSpecification::parse("debug"),
			3 => LogSpecification::parse("trace"),
			_ => {
				return Err(crate::Error::other(
					"Expected verbosity integer range between 0 and 3 (inclusive)",
				));
			},
		}
		.map_err(|err| return crate::Error::other(format!("Could not parse the log specification: {err}")))?,
	);

	match &cli_matches.subcommands {
		Some(SubCommands::Completions(v)) => commands::completions::command_completions(&cli_matches, v),
		None => commands::download::command_download(&cli_matches, &cli_matches.download),
	}?;

	return Ok(());
}
