use crate::services::gateway::GatewayClient;
use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use service_core::error::AppError;
use service_core::http::ensure_success;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Object storage addressed by slash-separated paths.
///
/// `upload` never overwrites: writing to an existing path fails with
/// `AppError::Conflict`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError>;
    async fn download(&self, path: &str) -> Result<Vec<u8>, AppError>;
    async fn delete(&self, paths: &[String]) -> Result<(), AppError>;
}

pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invalid storage path: {}",
                path
            )));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, path: &str, data: Vec<u8>, _content_type: &str) -> Result<(), AppError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    AppError::Conflict(anyhow::anyhow!("The resource already exists: {}", path))
                }
                _ => AppError::from(e),
            })?;
        write_or_discard(file, &target, &data).await?;
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, AppError> {
        let target = self.resolve(path)?;
        fs::read(&target).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => AppError::NotFound(anyhow::anyhow!("Object not found: {}", path)),
            _ => AppError::from(e),
        })
    }

    async fn delete(&self, paths: &[String]) -> Result<(), AppError> {
        for path in paths {
            let target = self.resolve(path)?;
            match fs::remove_file(target).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Write `data` through `writer`. On failure the file at `target` is removed
/// so no partial object is left behind.
async fn write_or_discard<W>(mut writer: W, target: &Path, data: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match writer.write_all(data).await {
        Ok(()) => writer.flush().await,
        Err(e) => Err(e),
    };
    drop(writer);

    if written.is_err() {
        if let Err(cleanup) = fs::remove_file(target).await {
            tracing::warn!(
                path = %target.display(),
                error = %cleanup,
                "Could not remove partial object"
            );
        }
    }
    written
}

#[derive(Debug, Serialize)]
struct RemoveObjectsRequest<'a> {
    prefixes: &'a [String],
}

/// Blob store backed by the gateway's object storage API.
#[derive(Clone)]
pub struct HttpBlobStore {
    gateway: GatewayClient,
    bucket: String,
}

impl HttpBlobStore {
    pub fn new(gateway: GatewayClient, bucket: impl Into<String>) -> Self {
        Self {
            gateway,
            bucket: bucket.into(),
        }
    }

    fn object_url(&self, path: &str) -> Result<reqwest::Url, AppError> {
        let segments = ["storage", "v1", "object", self.bucket.as_str()]
            .into_iter()
            .chain(path.split('/').filter(|s| !s.is_empty()));
        self.gateway.url(segments)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        let url = self.object_url(path)?;
        tracing::debug!(bucket = %self.bucket, path = %path, size = data.len(), "Uploading object");

        let response = self
            .gateway
            .request(Method::POST, url)
            .header("x-upsert", "false")
            .header("content-type", content_type)
            .header("cache-control", "max-age=3600")
            .body(data)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, AppError> {
        let url = self.object_url(path)?;
        let response = self.gateway.request(Method::GET, url).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn delete(&self, paths: &[String]) -> Result<(), AppError> {
        let url = self
            .gateway
            .url(["storage", "v1", "object", self.bucket.as_str()])?;
        let response = self
            .gateway
            .request(Method::DELETE, url)
            .json(&RemoveObjectsRequest { prefixes: paths })
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
