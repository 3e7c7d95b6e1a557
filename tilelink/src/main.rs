mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{ErrorLevel, Verbosity};
use std::path::PathBuf;
use tilelink::config::Config;

#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about,
	long_about = None,
	propagate_version = true,
	disable_help_subcommand = true,
)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// YAML config file
	#[arg(long, short, global = true, value_name = "FILE")]
	config: Option<PathBuf>,

	/// Base URL of the signing service, overrides the config
	#[arg(long, global = true, value_name = "URL")]
	signing_url: Option<String>,

	/// TileJSON request timeout in milliseconds, overrides the config
	#[arg(long, global = true, value_name = "MS")]
	timeout_ms: Option<u64>,

	#[command(flatten)]
	verbose: Verbosity<ErrorLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Resolve a TileJSON URL into a signed tile template
	Resolve(tools::resolve::Subcommand),

	/// Build a render plan from a result set JSON file
	Plan(tools::plan::Subcommand),

	/// Report resolution and auth hints of a tile template
	Analyze(tools::analyze::Subcommand),

	/// List the tile URLs covering a bounding box
	Tiles(tools::tiles::Subcommand),
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	env_logger::Builder::new()
		.filter_level(cli.verbose.log_level_filter())
		.format_timestamp(None)
		.init();

	run(cli)
}

fn load_config(cli: &Cli) -> Result<Config> {
	let mut config = match &cli.config {
		Some(path) => Config::from_path(path)?,
		None => Config::default(),
	};
	config.override_optional_signing_url(&cli.signing_url);
	config.override_optional_timeout_ms(cli.timeout_ms);
	config.validate()?;
	Ok(config)
}

fn run(cli: Cli) -> Result<()> {
	match &cli.command {
		Commands::Resolve(arguments) => tools::resolve::run(arguments, &load_config(&cli)?),
		Commands::Plan(arguments) => tools::plan::run(arguments, &load_config(&cli)?),
		Commands::Analyze(arguments) => tools::analyze::run(arguments),
		Commands::Tiles(arguments) => tools::tiles::run(arguments),
	}
}
