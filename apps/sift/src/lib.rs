use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sift_service::SiftService;

#[derive(Debug, Parser)]
#[command(
	version = sift_cli::VERSION,
	rename_all = "kebab",
	styles = sift_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Topic to research, e.g. a person, a film or an event.
	#[arg(value_name = "TOPIC")]
	pub topic: String,
	/// Pretty-print the JSON report.
	#[arg(long)]
	pub pretty: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = sift_config::load(&args.config)?;

	init_tracing(&config);

	let service = SiftService::new(config);
	let report = service.report(&args.topic).await?;

	tracing::info!(
		run_id = %report.run_id,
		outcome = report.outcome.as_str(),
		items = report.items.len(),
		"Report ready."
	);

	let json = if args.pretty {
		serde_json::to_string_pretty(&report)?
	} else {
		serde_json::to_string(&report)?
	};

	println!("{json}");

	Ok(())
}

fn init_tracing(config: &sift_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	// Logs go to stderr so stdout carries only the report.
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_topic_and_flags() {
		let args = Args::try_parse_from(["sift", "-c", "sift.toml", "--pretty", "某导演"])
			.expect("Arguments must parse.");

		assert_eq!(args.config, PathBuf::from("sift.toml"));
		assert_eq!(args.topic, "某导演");
		assert!(args.pretty);
	}

	#[test]
	fn topic_is_required() {
		assert!(Args::try_parse_from(["sift", "-c", "sift.toml"]).is_err());
	}
}
