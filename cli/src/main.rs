mod config;
mod repl;
mod setup;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use config::Args;
use tokio::io::{stdin, stdout, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so `.env` entries feed the env fallbacks.
    dotenvy::dotenv().ok();
    let args = Args::parse();
    telemetry::init_telemetry(&args.log_level);

    let mut orchestrator =
        setup::prepare_orchestrator(&args).context("failed to start the assistant")?;

    repl::run(&mut orchestrator, &args.user_id, BufReader::new(stdin()), stdout()).await
}
