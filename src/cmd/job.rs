use clap::Parser;

/// Billing as a map/shuffle/reduce job on a local worker pool.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Log source: a local path or glob, or an s3:// URI.
    /// Falls back to LOG_SOURCE_PATH_LOCAL / LOG_SOURCE_PATH_AWS.
    #[clap(short, long, default_value = None)]
    pub input_path: Option<String>,
    /// Directory (local or s3://) for the timestamped results file.
    /// Falls back to OUTPUT_DIR_LOCAL / OUTPUT_DIR_AWS; no file is written
    /// when neither is set.
    #[clap(short, long, default_value = None)]
    pub output_dir: Option<String>,
    /// [OPT] Number of map workers (default BILLING_NUM_WORKERS or 3)
    #[clap(short, long, default_value = None)]
    pub workers: Option<usize>,
    /// [OPT] Number of reduce buckets (default BILLING_NUM_REDUCERS or 11)
    #[clap(short, long, default_value = None)]
    pub reducers: Option<u32>,
}
