use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tilelink::{
	config::Config,
	plan::{RenderPlanBuilder, ResultSet},
};
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// result set JSON file
	#[arg(required = true)]
	path: PathBuf,
}

#[tokio::main]
pub async fn run(arguments: &Subcommand, config: &Config) -> Result<()> {
	let result_set = ResultSet::from_path(&arguments.path)?;
	let builder = RenderPlanBuilder::from_config(config)?;
	let plan = builder.build(&result_set, &CancellationToken::new()).await;

	for warning in &plan.warnings {
		log::warn!("{warning}");
	}
	log::info!(
		"{:?} plan with {} tiles and {} failures",
		plan.kind,
		plan.tiles.len(),
		plan.failures.len()
	);
	println!("{}", serde_json::to_string_pretty(&plan)?);
	Ok(())
}
