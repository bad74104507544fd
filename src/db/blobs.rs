use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::error::ClientError;
use crate::models::StoredObject;
use crate::services::ObjectStorage;

/// Object storage backed by a directory tree. Download URLs are `file://` URLs.
#[derive(Clone, Debug)]
pub struct FsObjectStorage {
    root: PathBuf,
}

impl FsObjectStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ClientError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(ClientError::backend(
                "storage/invalid-path",
                format!("Invalid object path: {}", path),
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for FsObjectStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, ClientError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &bytes).await?;

        tracing::debug!(%path, content_type, size = bytes.len(), "blob stored");

        Ok(StoredObject {
            path: path.to_string(),
        })
    }

    async fn download_url(&self, object: &StoredObject) -> Result<String, ClientError> {
        let target = self.resolve(&object.path)?;
        let absolute = tokio::fs::canonicalize(&target).await.map_err(|_| {
            ClientError::backend(
                "storage/object-not-found",
                format!("Object '{}' does not exist", object.path),
            )
        })?;

        let url = url::Url::from_file_path(&absolute).map_err(|_| {
            ClientError::Internal(format!("No file URL for {}", absolute.display()))
        })?;
        Ok(url.to_string())
    }
}
