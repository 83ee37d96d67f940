//! Run settings read from the environment.
//!
//! Everything here has a default except the AWS credentials and the input
//! and output locations, which the command line can also supply.

use std::fmt;
use std::str::FromStr;

use crate::error::{BillingError, Result};
use crate::rates::ConfigSource;
use crate::standalone::EngineConfig;

/// Where the pipeline runs. Selects which of the `*_LOCAL` / `*_AWS` path
/// settings apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Local,
    Kub,
    Aws,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "kub" => Ok(Self::Kub),
            "aws" => Ok(Self::Aws),
            other => Err(format!("unknown environment `{other}`")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Kub => "kub",
            Self::Aws => "aws",
        })
    }
}

impl Environment {
    /// Setting that holds the default log source in this environment.
    pub fn input_key(self) -> &'static str {
        match self {
            Self::Aws => "LOG_SOURCE_PATH_AWS",
            Self::Local | Self::Kub => "LOG_SOURCE_PATH_LOCAL",
        }
    }

    /// Setting that holds the default output directory in this environment.
    pub fn output_key(self) -> &'static str {
        match self {
            Self::Aws => "OUTPUT_DIR_AWS",
            Self::Local | Self::Kub => "OUTPUT_DIR_LOCAL",
        }
    }
}

/// Connection details for the S3-compatible object store.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsSettings {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Custom endpoint, e.g. a MinIO server.
    pub endpoint_url: Option<String>,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            region: "us-east-1".into(),
            access_key_id: None,
            secret_access_key: None,
            endpoint_url: None,
        }
    }
}

// keep the secret out of logs
impl fmt::Debug for AwsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSettings")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub environment: Environment,
    pub log_level: String,
    /// Default input path for the selected environment.
    pub input_path: Option<String>,
    /// Default output directory for the selected environment.
    pub output_dir: Option<String>,
    pub aws: AwsSettings,
    pub engine: EngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::Local,
            log_level: "info".into(),
            input_path: None,
            output_dir: None,
            aws: AwsSettings::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl Settings {
    pub fn from_source<S: ConfigSource + ?Sized>(source: &S) -> Result<Self> {
        let defaults = Settings::default();
        let get = |key: &str| source.var(key).filter(|v| !v.trim().is_empty());

        let environment = match get("ENVIRONMENT") {
            Some(raw) => raw.parse::<Environment>().map_err(|reason| BillingError::InvalidSetting {
                key: "ENVIRONMENT".into(),
                value: raw.clone(),
                reason,
            })?,
            None => defaults.environment,
        };

        let num_workers = parse_number(source, "BILLING_NUM_WORKERS", defaults.engine.num_workers)?;
        let num_reduce = parse_number(source, "BILLING_NUM_REDUCERS", defaults.engine.num_reduce)?;

        Ok(Settings {
            environment,
            log_level: get("LOG_LEVEL")
                .map(|level| level.trim().to_ascii_lowercase())
                .unwrap_or(defaults.log_level),
            input_path: get(environment.input_key()),
            output_dir: get(environment.output_key()),
            aws: AwsSettings {
                region: get("AWS_REGION").unwrap_or(defaults.aws.region),
                access_key_id: get("AWS_ACCESS_KEY_ID"),
                secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
                endpoint_url: get("S3_ENDPOINT_URL"),
            },
            engine: EngineConfig::new(num_workers, num_reduce),
        })
    }
}

impl Settings {
    /// Resolves the log source: an explicit path wins over the environment's
    /// default.
    pub fn require_input(&self, explicit: Option<String>) -> Result<String> {
        explicit
            .or_else(|| self.input_path.clone())
            .ok_or_else(|| BillingError::InvalidSetting {
                key: self.environment.input_key().into(),
                value: String::new(),
                reason: "no input path given".into(),
            })
    }
}

fn parse_number<S, N>(source: &S, key: &str, default: N) -> Result<N>
where
    S: ConfigSource + ?Sized,
    N: FromStr + PartialOrd + Default,
    N::Err: fmt::Display,
{
    let Some(raw) = source.var(key).filter(|v| !v.trim().is_empty()) else {
        return Ok(default);
    };
    let invalid = |reason: String| BillingError::InvalidSetting {
        key: key.to_string(),
        value: raw.clone(),
        reason,
    };
    let value = raw.trim().parse::<N>().map_err(|e| invalid(e.to_string()))?;
    if value <= N::default() {
        return Err(invalid("must be at least 1".into()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = Settings::from_source(&[("PATH", "/bin")]).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.engine, EngineConfig::new(3, 11));
    }

    #[test]
    fn local_paths_are_selected_by_default() {
        let settings = Settings::from_source(&[
            ("LOG_SOURCE_PATH_LOCAL", "./data/api_logs.txt"),
            ("LOG_SOURCE_PATH_AWS", "s3://logs/api_logs.txt"),
            ("OUTPUT_DIR_LOCAL", "./out"),
        ])
        .unwrap();
        assert_eq!(settings.input_path.as_deref(), Some("./data/api_logs.txt"));
        assert_eq!(settings.output_dir.as_deref(), Some("./out"));
    }

    #[test]
    fn aws_environment_selects_aws_paths() {
        let settings = Settings::from_source(&[
            ("ENVIRONMENT", "AWS"),
            ("LOG_SOURCE_PATH_LOCAL", "./data/api_logs.txt"),
            ("LOG_SOURCE_PATH_AWS", "s3://logs/api_logs.txt"),
            ("OUTPUT_DIR_AWS", "s3://results/billing"),
            ("AWS_REGION", "eu-west-1"),
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SECRET_ACCESS_KEY", "shh"),
        ])
        .unwrap();
        assert_eq!(settings.environment, Environment::Aws);
        assert_eq!(settings.input_path.as_deref(), Some("s3://logs/api_logs.txt"));
        assert_eq!(settings.output_dir.as_deref(), Some("s3://results/billing"));
        assert_eq!(settings.aws.region, "eu-west-1");
        assert!(!format!("{:?}", settings.aws).contains("shh"));
    }

    #[test]
    fn engine_sizing_is_configurable() {
        let settings = Settings::from_source(&[
            ("BILLING_NUM_WORKERS", "8"),
            ("BILLING_NUM_REDUCERS", " 4 "),
            ("LOG_LEVEL", "DEBUG"),
        ])
        .unwrap();
        assert_eq!(settings.engine, EngineConfig::new(8, 4));
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn bad_numbers_are_rejected() {
        for (key, value) in [
            ("BILLING_NUM_WORKERS", "many"),
            ("BILLING_NUM_WORKERS", "0"),
            ("BILLING_NUM_REDUCERS", "-2"),
        ] {
            let err = Settings::from_source(&[(key, value)]).unwrap_err();
            assert!(matches!(err, BillingError::InvalidSetting { .. }), "{key}={value}");
        }
    }

    #[test]
    fn explicit_input_wins() {
        let settings = Settings::from_source(&[("LOG_SOURCE_PATH_LOCAL", "env.txt")]).unwrap();
        assert_eq!(settings.require_input(Some("cli.txt".into())).unwrap(), "cli.txt");
        assert_eq!(settings.require_input(None).unwrap(), "env.txt");
        assert!(Settings::default().require_input(None).is_err());
    }

    #[test]
    fn kub_reads_local_paths() {
        assert_eq!(Environment::Kub.input_key(), "LOG_SOURCE_PATH_LOCAL");
        assert_eq!(Environment::Aws.output_key(), "OUTPUT_DIR_AWS");
    }

    #[test]
    fn unknown_environment_is_rejected() {
        assert!(Settings::from_source(&[("ENVIRONMENT", "mars")]).is_err());
    }
}
