use anyhow::Result;
use clap::Args;
use tilelink_core::{GeoBBox, template::covering_tile_urls};

#[derive(Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// tile URL template with {z}, {x} and {y}
	#[arg(required = true)]
	template: String,

	/// bounding box as "west,south,east,north" in degrees
	#[arg(long, allow_hyphen_values = true)]
	bbox: String,

	/// zoom level
	#[arg(long, short)]
	zoom: u8,

	/// refuse to list more tiles than this
	#[arg(long, default_value_t = 10_000)]
	max_tiles: u64,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let bbox = GeoBBox::from_string_list(&arguments.bbox)?;
	let tiles = covering_tile_urls(&arguments.template, &bbox, arguments.zoom, arguments.max_tiles)?;
	log::info!("{} tiles cover {bbox:?} at zoom {}", tiles.len(), arguments.zoom);
	for (_, url) in tiles {
		println!("{url}");
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::tests::run_command;

	#[test]
	fn list_tiles() {
		run_command(vec![
			"tilelink",
			"tiles",
			"https://t.example/{z}/{x}/{y}.png",
			"--bbox",
			"-10,-10,10,10",
			"--zoom",
			"3",
		])
		.unwrap();
	}

	#[test]
	fn too_many_tiles() {
		let err = run_command(vec![
			"tilelink",
			"tiles",
			"https://t.example/{z}/{x}/{y}.png",
			"--bbox=-180,-90,180,90",
			"-z",
			"12",
			"--max-tiles",
			"100",
		])
		.unwrap_err();
		assert!(err.to_string().contains("more than the limit of 100"), "{err}");
	}

	#[test]
	fn bad_bbox() {
		let err = run_command(vec![
			"tilelink",
			"tiles",
			"https://t.example/{z}/{x}/{y}.png",
			"--bbox",
			"10,0,0",
			"-z",
			"3",
		])
		.unwrap_err();
		assert!(format!("{err:#}").starts_with("Failed to parse bounding box '10,0,0'"), "{err:#}");
	}
}
