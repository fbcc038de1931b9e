use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Clone)]
pub struct DiskService {
    root: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum DiskServiceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// A file written by [`DiskService::save_image`].
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: usize,
    pub stored_at: DateTime<Utc>,
}

impl DiskService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<(), DiskServiceError> {
        std::fs::create_dir_all(&self.root).map_err(|source| DiskServiceError::Io {
            path: self.root.display().to_string(),
            source,
        })
    }

    pub fn generate_file_name(file_extension: &str) -> String {
        format!("{}.{}", Uuid::new_v4(), file_extension)
    }

    pub async fn save_image(
        &self,
        image_data: &[u8],
        file_extension: &str,
    ) -> Result<StoredImage, DiskServiceError> {
        let name = Self::generate_file_name(file_extension);
        let path = self.root.join(&name);

        if let Err(source) = write_new(&path, image_data).await {
            // Never leave a truncated image behind.
            let _ = tokio::fs::remove_file(&path).await;
            return Err(DiskServiceError::Io {
                path: path.display().to_string(),
                source,
            });
        }

        Ok(StoredImage {
            name,
            path,
            size_bytes: image_data.len(),
            stored_at: Utc::now(),
        })
    }
}

async fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(data).await?;
    file.flush().await?;
    Ok(())
}
