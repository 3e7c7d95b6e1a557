use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tilelink::{
	config::Config,
	resolver::{ResolveOptions, ResolvedTileJson, TileJsonResolver},
};
use tilelink_core::quality::{TileUrlQualityReport, analyze};
use tilelink_derive::context;

#[derive(Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// URL of the TileJSON document
	#[arg(required = true)]
	url: String,

	/// collection id, used for asset correction and signing
	#[arg(long)]
	collection: Option<String>,
}

#[derive(Serialize)]
struct Output {
	#[serde(flatten)]
	resolved: ResolvedTileJson,
	quality: TileUrlQualityReport,
}

#[context("resolving '{}'", arguments.url)]
#[tokio::main]
pub async fn run(arguments: &Subcommand, config: &Config) -> Result<()> {
	let resolver = TileJsonResolver::from_config(config)?;
	let options = ResolveOptions {
		collection: arguments.collection.clone(),
		..ResolveOptions::default()
	};

	let resolved = resolver.resolve(&arguments.url, &options).await?;
	let quality = analyze(&resolved.tile_template);
	quality.log(&arguments.url);

	println!("{}", serde_json::to_string_pretty(&Output { resolved, quality })?);
	Ok(())
}
