//! Remote blob store with a local file cache.
//!
//! Resources are fetched once from `GET {base_url}/files/{resource path}`
//! (authenticated with an `X-API-Key` header) and written below the cache
//! directory using the same relative layout as the registry. Later runs read
//! the cached copy without touching the network.

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use super::registry::Resource;
use crate::config::{Settings, StoreConfig};
use crate::error::ResourceError;

/// Client for the remote resource store.
#[derive(Debug, Clone)]
pub struct BlobStore {
    base_url: String,
    api_key: String,
    cache_dir: PathBuf,
    client: reqwest::Client,
}

impl BlobStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            cache_dir: config.cache_dir.clone(),
            client: reqwest::Client::new(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// URL the resource is downloaded from.
    pub fn resource_url(&self, resource: Resource) -> String {
        format!("{}/files/{}", self.base_url, resource.path())
    }

    /// Makes sure `resource` is present in the cache and returns its path.
    ///
    /// A non-empty cached file is trusted as-is. Otherwise the resource is
    /// streamed to a temporary `.part` file and renamed into place once the
    /// download completes, so an interrupted download never leaves a
    /// truncated model behind.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError` on HTTP failure, a non-success status, or
    /// cache I/O errors.
    pub async fn ensure_cached(&self, resource: Resource) -> Result<PathBuf, ResourceError> {
        let target = resource.locate(&self.cache_dir);
        if let Ok(meta) = fs::metadata(&target).await {
            if meta.is_file() && meta.len() > 0 {
                info!(resource = %resource, path = %target.display(), "Using cached resource");
                return Ok(target);
            }
        }

        let parent = target.parent().unwrap_or(&self.cache_dir).to_path_buf();
        fs::create_dir_all(&parent)
            .await
            .map_err(|source| ResourceError::Io { path: parent.clone(), source })?;

        let url = self.resource_url(resource);
        info!(resource = %resource, url = %url, "Downloading resource");

        let response = self
            .client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                resource = %resource,
                status = response.status().as_u16(),
                "Resource store rejected request"
            );
            return Err(ResourceError::Store {
                status: response.status().as_u16(),
                resource: resource.to_string(),
            });
        }

        let pb = match response.content_length() {
            Some(total) => {
                let pb = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                {
                    pb.set_style(style.progress_chars("=>-"));
                }
                pb
            }
            None => ProgressBar::new_spinner(),
        };
        pb.set_message(resource.file_name().to_string());

        let partial = partial_path(&target);
        let written = match stream_to_file(response, &partial, &pb).await {
            Ok(written) => written,
            Err(e) => {
                pb.abandon_with_message("download failed");
                let _ = fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        if written == 0 {
            pb.abandon_with_message("empty download");
            let _ = fs::remove_file(&partial).await;
            return Err(ResourceError::Empty(target));
        }

        fs::rename(&partial, &target)
            .await
            .map_err(|source| ResourceError::Io { path: target.clone(), source })?;
        pb.finish_with_message(format!("{} downloaded", resource.file_name()));
        info!(
            resource = %resource,
            size_bytes = written,
            path = %target.display(),
            "Resource cached"
        );

        Ok(target)
    }
}

/// Picks the directory the model is read from.
///
/// A copy under the resource directory wins. Otherwise, when a store is
/// configured, the model is downloaded into its cache directory first.
pub async fn resolve_model_root(
    settings: &Settings,
    resource: Resource,
) -> Result<PathBuf, ResourceError> {
    let local = &settings.models.resource_dir;
    if resource.locate(local).is_file() {
        return Ok(local.clone());
    }

    match &settings.store {
        Some(store_config) => {
            let store = BlobStore::new(store_config);
            store.ensure_cached(resource).await?;
            Ok(store.cache_dir().to_path_buf())
        }
        None => {
            warn!(
                "Model {} not found under {} and no store configured",
                resource,
                local.display()
            );
            Ok(local.clone())
        }
    }
}

/// Temporary download path next to `target`, e.g. `model.onnx.part`.
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

/// Writes the response body to `path` and returns the number of bytes written.
async fn stream_to_file(
    response: reqwest::Response,
    path: &Path,
    pb: &ProgressBar,
) -> Result<u64, ResourceError> {
    let io_err = |source: std::io::Error| ResourceError::Io { path: path.to_path_buf(), source };

    let mut file = fs::File::create(path).await.map_err(io_err)?;
    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await.map_err(io_err)?;
        written += chunk.len() as u64;
        pb.set_position(written);
    }
    file.flush().await.map_err(io_err)?;
    Ok(written)
}
