use super::catalog::{Chunk, ResourceCatalog};
use super::transport::{resolve_uri, Transport};
use crate::config::Config;
use crate::error::{Error, Result};
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use url::Url;

/// Name of the manifest under `publicPath`.
pub const MANIFEST_NAME: &str = "resources.json";

/// Fetches catalog entries chunk by chunk and assembles them, verifying every
/// size along the way. A failed check aborts the whole load.
#[derive(Clone)]
pub struct ResourceLoader {
    transport: Arc<dyn Transport>,
}

impl ResourceLoader {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Fetch and parse `<publicPath>/resources.json`.
    pub async fn load_catalog(&self, config: &Config) -> Result<ResourceCatalog> {
        let url = resolve_uri(MANIFEST_NAME, config.public_path())?;
        tracing::debug!("Loading resource metadata from {}", url);
        let bytes = self.transport.fetch(&url).await.map_err(|e| {
            tracing::error!(
                "Resource metadata not found at {}. Ensure that the config.publicPath is configured correctly.",
                url
            );
            e
        })?;
        ResourceCatalog::from_json(&bytes)
    }

    /// Load `key`, reporting `(key, bytes_so_far, size)` to the config's
    /// progress sink after each chunk.
    pub async fn load(&self, key: &str, catalog: &ResourceCatalog, config: &Config) -> Result<Bytes> {
        self.load_with_progress(key, catalog, config, &|k, current, total| {
            config.report(k, current, total)
        })
        .await
    }

    /// Like [`load`](Self::load) with an explicit progress sink.
    pub async fn load_with_progress(
        &self,
        key: &str,
        catalog: &ResourceCatalog,
        config: &Config,
        progress: &(dyn Fn(&str, u64, u64) + Send + Sync),
    ) -> Result<Bytes> {
        let entry = catalog
            .get(key)
            .ok_or_else(|| Error::ResourceNotFound(key.to_string()))?;

        tracing::info!(
            "Loading {} ({} bytes in {} chunks)",
            key,
            entry.size,
            entry.chunks.len()
        );

        let urls = entry
            .chunks
            .iter()
            .map(|chunk| resolve_uri(&chunk.hash, config.public_path()))
            .collect::<Result<Vec<_>>>()?;

        let transport = &self.transport;
        let mut pending: FuturesUnordered<_> = entry
            .chunks
            .iter()
            .zip(urls)
            .enumerate()
            .map(|(index, (chunk, url))| async move {
                fetch_chunk(transport.as_ref(), key, chunk, &url)
                    .await
                    .map(|bytes| (index, bytes))
            })
            .collect();

        // Completion order is arbitrary; slots keep catalog order.
        let mut parts: Vec<Option<Bytes>> = vec![None; entry.chunks.len()];
        let mut received = 0u64;
        while let Some(result) = pending.next().await {
            let (index, bytes) = result?;
            received += bytes.len() as u64;
            progress(key, received, entry.size);
            parts[index] = Some(bytes);
        }
        if parts.is_empty() {
            progress(key, 0, entry.size);
        }

        let data = if parts.len() == 1 {
            parts.pop().flatten().unwrap_or_default()
        } else {
            let mut buffer = Vec::with_capacity(received as usize);
            for part in parts.into_iter().flatten() {
                buffer.extend_from_slice(&part);
            }
            Bytes::from(buffer)
        };

        let actual = data.len() as u64;
        if actual != entry.size {
            return Err(Error::ResourceSizeMismatch {
                key: key.to_string(),
                expected: entry.size,
                actual,
            });
        }

        tracing::debug!("Loaded {} ({} bytes)", key, actual);
        Ok(data)
    }

    /// Load every catalog entry once, e.g. to warm an HTTP cache.
    pub async fn preload(&self, config: &Config) -> Result<ResourceCatalog> {
        let catalog = self.load_catalog(config).await?;
        let mut keys: Vec<&str> = catalog.keys().collect();
        keys.sort_unstable();
        for key in keys {
            self.load(key, &catalog, config).await?;
        }
        Ok(catalog)
    }
}

async fn fetch_chunk(
    transport: &dyn Transport,
    key: &str,
    chunk: &Chunk,
    url: &Url,
) -> Result<Bytes> {
    let bytes = transport.fetch(url).await?;
    let actual = bytes.len() as u64;
    if actual != chunk.len() {
        return Err(Error::ChunkSizeMismatch {
            key: key.to_string(),
            hash: chunk.hash.clone(),
            expected: chunk.len(),
            actual,
        });
    }
    Ok(bytes)
}
