use clap::Parser;
use tracing::{error, info};

use mrbill::cmd::naive::Args;
use mrbill::rates::{ProcessEnv, RateTable};
use mrbill::settings::Settings;
use mrbill::storage::Storage;
use mrbill::strategy::{AggregationStrategy, LocalStrategy};
use mrbill::Result;

async fn run(args: Args, settings: Settings) -> Result<()> {
    let input = settings.require_input(args.input_path)?;
    let rates = RateTable::from_source(&ProcessEnv)?;
    info!(rates = rates.len(), %input, "starting naive billing");

    let storage = Storage::new(settings.aws);
    let lines = storage.read_lines(&input).await?;
    let report = LocalStrategy.aggregate(&lines, &rates)?;

    storage.write_text(&args.output_path, &report.render()).await?;
    info!(users = report.len(), output = %args.output_path, "billing written");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    let settings = Settings::from_source(&ProcessEnv)?;
    mrbill::telemetry::init(&settings.log_level);

    run(args, settings).await.inspect_err(|e| error!("{e}"))?;
    Ok(())
}
