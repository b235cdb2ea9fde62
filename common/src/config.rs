use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::fmt;
use tracing::debug;

/// Job settings, read from a `dl.cfg`-style INI file.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(alias = "AWS")]
    pub aws: AwsSettings,
    #[serde(alias = "ETL", default)]
    pub etl: EtlSettings,
}

#[derive(Deserialize, Clone)]
pub struct AwsSettings {
    #[serde(alias = "AWS_ACCESS_KEY_ID")]
    pub aws_access_key_id: String,
    #[serde(alias = "AWS_SECRET_ACCESS_KEY")]
    pub aws_secret_access_key: String,
    #[serde(alias = "AWS_REGION", default = "default_region")]
    pub aws_region: String,
    /// Custom endpoint for S3-compatible stores such as MinIO.
    #[serde(alias = "AWS_ENDPOINT", default)]
    pub aws_endpoint: Option<String>,
}

// Keeps the secret out of logs.
impl fmt::Debug for AwsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSettings")
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("aws_secret_access_key", &"<redacted>")
            .field("aws_region", &self.aws_region)
            .field("aws_endpoint", &self.aws_endpoint)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EtlSettings {
    #[serde(alias = "INPUT_ROOT", default = "default_input_root")]
    pub input_root: String,
    #[serde(alias = "OUTPUT_ROOT", default = "default_output_root")]
    pub output_root: String,
    #[serde(alias = "COMPRESSION", default = "default_compression")]
    pub compression: String,
}

impl Default for EtlSettings {
    fn default() -> Self {
        Self {
            input_root: default_input_root(),
            output_root: default_output_root(),
            compression: default_compression(),
        }
    }
}

fn default_region() -> String {
    "us-west-2".to_string()
}

fn default_input_root() -> String {
    "s3a://udacity-dend".to_string()
}

fn default_output_root() -> String {
    "s3a://sparkify-data-lake".to_string()
}

fn default_compression() -> String {
    "snappy".to_string()
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::new(path, FileFormat::Ini))
            .add_source(
                Environment::with_prefix("SPARKIFY")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;

        debug!(?settings, "Loaded job settings");

        Ok(settings)
    }
}
