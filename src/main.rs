use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error};

use rewrite_stream::io::input::open_input;
use rewrite_stream::oembed::{ObjectUriRewrite, PhotoCodec};
use rewrite_stream::{CancelToken, Pipeline, Sink};

mod cli;
mod setup_tracing;

fn main() -> ExitCode {
    setup_tracing::register();

    if let Err(e) = run() {
        error!("{e:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run() -> Result<()> {
    let matches = cli::root_cli().get_matches();
    let invocation = cli::parse(&matches);
    let config = invocation.config;

    config.validate()?;
    let rewrite = ObjectUriRewrite::from_template(&invocation.template)?;
    let sink = Arc::new(Sink::open(&config.outputs)?);
    let input = open_input(invocation.input.as_deref())?;

    let pipeline = Pipeline::new(config, PhotoCodec::new(), rewrite)?;
    let summary = pipeline
        .run(input, sink, &CancelToken::new())
        .context("processing aborted")?;

    debug!(
        read = summary.read,
        written = summary.written,
        peak_in_flight = summary.peak_in_flight,
        "run complete"
    );
    Ok(())
}
