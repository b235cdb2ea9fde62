pub mod location;

pub use location::StorageLocation;

use common::config::AwsSettings;
use common::{Error, Result};
use datafusion::execution::context::SessionContext;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Credentials and connection details for S3, owned by one session.
#[derive(Clone)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
}

impl From<&AwsSettings> for S3Config {
    fn from(aws: &AwsSettings) -> Self {
        Self {
            endpoint: aws.aws_endpoint.clone(),
            region: aws.aws_region.clone(),
            access_key: aws.aws_access_key_id.clone(),
            secret_key: aws.aws_secret_access_key.clone(),
        }
    }
}

#[derive(Clone)]
pub struct S3Manager {
    pub config: S3Config,
    object_store_cache: Arc<dashmap::DashMap<String, Arc<AmazonS3>>>,
}

impl S3Manager {
    pub fn new(config: S3Config) -> Self {
        Self {
            config,
            object_store_cache: Arc::new(dashmap::DashMap::new()),
        }
    }

    pub fn get_object_store(&self, bucket: &str) -> Result<Arc<AmazonS3>> {
        if let Some(store) = self.object_store_cache.get(bucket) {
            return Ok(store.clone());
        }

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&self.config.region)
            .with_access_key_id(&self.config.access_key)
            .with_secret_access_key(&self.config.secret_key);

        if let Some(endpoint) = &self.config.endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }

        let store = Arc::new(builder.build()?);
        self.object_store_cache
            .insert(bucket.to_string(), store.clone());
        Ok(store)
    }

    /// Makes `root` readable and writable through `ctx`.
    ///
    /// `s3://` and `s3a://` roots get a bucket-scoped store carrying this
    /// manager's credentials. Local paths and `file://` URIs are served by
    /// the context's built-in local filesystem store.
    pub fn register_root(&self, ctx: &SessionContext, root: &str) -> Result<()> {
        if Path::new(root).is_absolute() || !root.contains("://") {
            return Ok(());
        }

        let url = Url::parse(root)?;
        match url.scheme() {
            "file" => Ok(()),
            "s3" | "s3a" => {
                let bucket = url.host_str().ok_or_else(|| {
                    Error::InvalidUri(format!("S3 root '{}' has no bucket", root))
                })?;
                let store = self.get_object_store(bucket)?;
                let store_url = Url::parse(&format!("{}://{}", url.scheme(), bucket))?;
                ctx.register_object_store(&store_url, store);
                debug!(%store_url, "Registered S3 object store");
                Ok(())
            }
            other => Err(Error::InvalidUri(format!(
                "Unsupported storage scheme '{}' in '{}'",
                other, root
            ))),
        }
    }
}
