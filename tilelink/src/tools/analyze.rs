use anyhow::Result;
use clap::Args;
use tilelink_core::quality::analyze;

#[derive(Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// tile URL template, e.g. "https://example.org/{z}/{x}/{y}@2x.png"
	#[arg(required = true)]
	template: String,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let report = analyze(&arguments.template);
	println!("{}", serde_json::to_string_pretty(&report)?);
	Ok(())
}
