use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use covshim::cli;
use covshim::config::{Args, Config, JOB_ID_VAR};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::from_args(args, std::env::var(JOB_ID_VAR).ok())?;

    let body = cli::render(&config).with_context(|| {
        format!(
            "Failed to produce {} output from {}",
            config.output_type,
            config.input.display()
        )
    })?;
    cli::write_output(config.output.as_deref(), &body).context("Failed to write output")?;
    Ok(())
}

/// Logs go to stderr so stdout carries only the report. `RUST_LOG` wins over
/// `-v`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
