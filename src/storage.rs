//! Reading log lines and writing reports, on the local filesystem or on an
//! S3-compatible object store (AWS S3, MinIO).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use glob::glob;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use crate::error::{BillingError, Result};
use crate::settings::AwsSettings;

const S3_SCHEMES: [&str; 2] = ["s3://", "s3a://"];

/// A parsed input or output location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A local path. For inputs this may be a glob pattern.
    Local(String),
    /// An object in a bucket.
    S3 { bucket: String, key: String },
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let Some(rest) = S3_SCHEMES.iter().find_map(|scheme| s.strip_prefix(scheme)) else {
            if s.is_empty() {
                return Err("empty path".into());
            }
            return Ok(Location::Local(s.to_string()));
        };
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(format!("missing bucket in `{s}`"));
        }
        Ok(Location::S3 {
            bucket: bucket.to_string(),
            key: key.trim_start_matches('/').to_string(),
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => f.write_str(path),
            Location::S3 { bucket, key } => write!(f, "s3://{bucket}/{key}"),
        }
    }
}

impl Location {
    /// `self` treated as a directory, with `name` appended.
    pub fn join(&self, name: &str) -> Location {
        match self {
            Location::Local(dir) => {
                Location::Local(Path::new(dir).join(name).to_string_lossy().into_owned())
            }
            Location::S3 { bucket, key } => {
                let key = key.trim_end_matches('/');
                Location::S3 {
                    bucket: bucket.clone(),
                    key: if key.is_empty() {
                        name.to_string()
                    } else {
                        format!("{key}/{name}")
                    },
                }
            }
        }
    }
}

/// Builds an S3 client from `settings`.
///
/// Static credentials are used when both halves are configured, otherwise
/// the default AWS provider chain applies. A custom endpoint switches to
/// path-style addressing, which MinIO needs.
pub async fn get_s3_client(settings: &AwsSettings) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()));
    if let (Some(id), Some(secret)) = (&settings.access_key_id, &settings.secret_access_key) {
        loader = loader.credentials_provider(Credentials::new(
            id.clone(),
            secret.clone(),
            None,
            None,
            "billing-env",
        ));
    }
    if let Some(endpoint) = &settings.endpoint_url {
        loader = loader.endpoint_url(endpoint.clone());
    }
    let sdk_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(settings.endpoint_url.is_some())
        .build();
    Client::from_conf(s3_config)
}

/// Line source and report sink. The S3 client is only built the first time
/// an `s3://` location is touched.
pub struct Storage {
    aws: AwsSettings,
    client: OnceCell<Client>,
}

impl Storage {
    pub fn new(aws: AwsSettings) -> Self {
        Self {
            aws,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> &Client {
        self.client.get_or_init(|| get_s3_client(&self.aws)).await
    }

    /// Reads every line at `path`, in order, without line terminators.
    pub async fn read_lines(&self, path: &str) -> Result<Vec<String>> {
        let location: Location = path.parse().map_err(|e| BillingError::source(path, e))?;
        let content = match &location {
            Location::Local(pattern) => read_local(pattern).await?,
            Location::S3 { bucket, key } => self
                .get_object(bucket, key)
                .await
                .map_err(|e| BillingError::source(path, e))?,
        };
        let lines: Vec<String> = content.lines().map(str::to_owned).collect();
        debug!(%location, lines = lines.len(), "read input");
        Ok(lines)
    }

    /// Writes `content` to `target` in one piece, creating local parent
    /// directories as needed.
    pub async fn write_text(&self, target: &str, content: &str) -> Result<()> {
        let location: Location = target.parse().map_err(|e| BillingError::output(target, e))?;
        self.write_to(&location, content).await
    }

    pub async fn write_to(&self, location: &Location, content: &str) -> Result<()> {
        let target = location.to_string();
        match location {
            Location::Local(path) => {
                let path = Path::new(path);
                if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(dir)
                        .await
                        .map_err(|e| BillingError::output(&target, e))?;
                }
                tokio::fs::write(path, content)
                    .await
                    .map_err(|e| BillingError::output(&target, e))?;
            }
            Location::S3 { bucket, key } => {
                if key.is_empty() {
                    return Err(BillingError::output(&target, "missing object key"));
                }
                self.upload_string(bucket, key, content)
                    .await
                    .map_err(|e| BillingError::output(&target, e))?;
            }
        }
        debug!(%target, bytes = content.len(), "wrote output");
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> std::result::Result<String, String> {
        trace!(bucket, key, "get_object");
        if key.is_empty() {
            return Err("missing object key".into());
        }
        let mut object = self
            .client()
            .await
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| DisplayErrorContext(e).to_string())?;

        let mut content = Vec::new();
        while let Some(bytes) = object.body.try_next().await.map_err(|e| e.to_string())? {
            trace!(bytes = bytes.len(), "read chunk");
            content.extend_from_slice(&bytes);
        }
        String::from_utf8(content).map_err(|e| e.to_string())
    }

    async fn upload_string(
        &self,
        bucket: &str,
        key: &str,
        content: &str,
    ) -> std::result::Result<(), String> {
        self.client()
            .await
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(content.as_bytes().to_vec().into())
            .send()
            .await
            .map_err(|e| DisplayErrorContext(e).to_string())?;
        Ok(())
    }
}

/// Reads `pattern` as a plain file when one exists at that exact path,
/// otherwise concatenates every file matching it as a glob, in path order.
async fn read_local(pattern: &str) -> Result<String> {
    if Path::new(pattern).is_file() {
        return tokio::fs::read_to_string(pattern)
            .await
            .map_err(|e| BillingError::source(pattern, e));
    }
    let paths = glob(pattern)
        .map_err(|e| BillingError::source(pattern, e))?
        .collect::<std::result::Result<Vec<PathBuf>, _>>()
        .map_err(|e| BillingError::source(pattern, e))?;
    if paths.is_empty() {
        return Err(BillingError::source(pattern, "local file not found"));
    }

    let mut content = String::new();
    for path in paths {
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| BillingError::source(&path.to_string_lossy(), e))?;
        content.push_str(&text);
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
    }
    Ok(content)
}
