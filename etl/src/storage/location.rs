use crate::utils::glob::PathPattern;
use common::{Error, Result};
use datafusion::datasource::listing::ListingTableUrl;
use datafusion::execution::context::SessionContext;
use futures::{StreamExt, TryStreamExt};
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use std::sync::Arc;
use tracing::debug;

pub const JSON_EXTENSION: &str = ".json";

/// A directory-like location in one of the session's object stores.
#[derive(Clone)]
pub struct StorageLocation {
    url: ListingTableUrl,
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for StorageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageLocation")
            .field("url", &self.url.as_str())
            .finish()
    }
}

impl StorageLocation {
    /// Resolves `uri` against the stores registered on `ctx`.
    pub fn resolve(ctx: &SessionContext, uri: &str) -> Result<Self> {
        let dir = format!("{}/", uri.trim_end_matches('/'));
        let url = ListingTableUrl::parse(&dir)
            .map_err(|e| Error::InvalidUri(format!("Cannot parse location '{}': {}", uri, e)))?;
        let store = ctx.runtime_env().object_store(url.object_store())?;

        Ok(Self { url, store })
    }

    /// Directory URI with a trailing `/`.
    pub fn uri(&self) -> &str {
        self.url.as_str()
    }

    pub fn prefix(&self) -> &Path {
        self.url.prefix()
    }

    pub fn child(&self, name: &str) -> Result<Self> {
        let url = ListingTableUrl::parse(format!("{}{}/", self.url.as_str(), name))?;
        Ok(Self {
            url,
            store: Arc::clone(&self.store),
        })
    }

    fn object_uri(&self, location: &Path) -> String {
        format!("{}{}", self.url.object_store().as_str(), location)
    }

    /// URIs of every JSON file under this location matching `pattern`,
    /// sorted.
    pub async fn list_matching(&self, pattern: &PathPattern) -> Result<Vec<String>> {
        let mut list_prefix = self.prefix().clone();
        for segment in pattern.literal_prefix() {
            list_prefix = list_prefix.child(segment);
        }

        let objects: Vec<ObjectMeta> = self
            .store
            .list(Some(&list_prefix))
            .try_collect()
            .await?;

        let mut files: Vec<String> = objects
            .iter()
            .filter(|meta| meta.location.as_ref().ends_with(JSON_EXTENSION))
            .filter(|meta| {
                let parts: Option<Vec<String>> = meta
                    .location
                    .prefix_match(self.prefix())
                    .map(|parts| parts.map(|p| p.as_ref().to_string()).collect());
                parts.is_some_and(|parts| pattern.matches(parts.as_slice()))
            })
            .map(|meta| self.object_uri(&meta.location))
            .collect();
        files.sort();

        debug!(
            location = self.uri(),
            pattern = pattern.as_str(),
            listed = objects.len(),
            matched = files.len(),
            "Resolved input files"
        );

        Ok(files)
    }

    /// Removes every object under this location and returns how many went.
    pub async fn delete_all(&self) -> Result<usize> {
        let locations = self
            .store
            .list(Some(self.prefix()))
            .map_ok(|meta| meta.location)
            .boxed();

        let deleted: Vec<Path> = self.store.delete_stream(locations).try_collect().await?;
        Ok(deleted.len())
    }

    pub async fn put(&self, name: &str, data: Vec<u8>) -> Result<()> {
        let path = self.prefix().child(name);
        self.store.put(&path, PutPayload::from(data)).await?;
        Ok(())
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.prefix().child(name);
        let bytes = self.store.get(&path).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
