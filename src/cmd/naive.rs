use clap::Parser;

/// Sequential billing pass over a local or S3 log source.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Log source: a local path or glob, or an s3:// URI.
    /// Falls back to LOG_SOURCE_PATH_LOCAL / LOG_SOURCE_PATH_AWS.
    #[clap(short, long, default_value = None)]
    pub input_path: Option<String>,
    /// Where to write the report
    #[clap(short, long, default_value = "./data/billing.txt")]
    pub output_path: String,
}
