use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};

use mrbill::cmd::job::Args;
use mrbill::rates::{ProcessEnv, RateTable};
use mrbill::report::results_file_name;
use mrbill::settings::Settings;
use mrbill::standalone::EngineConfig;
use mrbill::storage::{Location, Storage};
use mrbill::strategy::{AggregationStrategy, DistributedStrategy};
use mrbill::{BillingError, Result};

async fn run(args: Args, settings: Settings) -> Result<()> {
    let input = settings.require_input(args.input_path)?;
    let engine = EngineConfig::new(
        args.workers.unwrap_or(settings.engine.num_workers),
        args.reducers.unwrap_or(settings.engine.num_reduce),
    );
    let rates = RateTable::from_source(&ProcessEnv)?;
    info!(rates = rates.len(), %input, environment = %settings.environment, "starting billing job");

    let storage = Storage::new(settings.aws);
    let lines = storage.read_lines(&input).await?;
    let strategy = DistributedStrategy::new(engine);
    // the engine blocks on its own pool
    let report = tokio::task::block_in_place(|| strategy.aggregate(&lines, &rates))?;

    for line in report.lines() {
        info!("{line}");
    }

    match args.output_dir.or(settings.output_dir) {
        Some(dir) => {
            let dir: Location = dir.parse().map_err(|reason| BillingError::OutputUnavailable {
                target: dir.clone(),
                reason,
            })?;
            let target = dir.join(&results_file_name(Utc::now()));
            storage.write_to(&target, &report.render()).await?;
            info!(users = report.len(), output = %target, "billing written");
        }
        None => warn!("no output directory configured, results only logged"),
    }
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
