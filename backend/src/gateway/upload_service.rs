use log::{error, info, warn};
use shared::Notice;
use std::collections::BTreeSet;

use crate::config::GatewayConfig;
use crate::gateway::models::{RedirectTarget, UploadRequest};
use crate::storage::disk_service::{DiskService, DiskServiceError};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no file part in request")]
    NoFile,
    #[error("empty filename")]
    EmptyFilename,
    #[error("extension not allowed: {0:?}")]
    InvalidType(String),
    #[error("request body exceeds {limit_bytes} bytes")]
    TooLarge { limit_bytes: u64 },
    #[error("malformed multipart body: {0}")]
    Multipart(String),
    #[error("Storage error: {0}")]
    Storage(#[from] DiskServiceError),
}

impl UploadError {
    pub fn notice(&self) -> Notice {
        match self {
            UploadError::NoFile | UploadError::EmptyFilename => Notice::NoFileSelected,
            UploadError::InvalidType(_) => Notice::InvalidFileType,
            UploadError::TooLarge { limit_bytes } => Notice::FileTooLarge {
                limit_bytes: *limit_bytes,
            },
            UploadError::Multipart(_) | UploadError::Storage(_) => Notice::UploadFailed,
        }
    }
}

#[derive(Clone)]
pub struct UploadGateway {
    disk: DiskService,
    max_bytes: u64,
    allowed_extensions: BTreeSet<String>,
}

impl UploadGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            disk: DiskService::new(config.upload_dir.clone()),
            max_bytes: config.max_bytes,
            allowed_extensions: config.allowed_extensions.clone(),
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn allowed_extensions(&self) -> &BTreeSet<String> {
        &self.allowed_extensions
    }

    pub fn too_large(&self) -> UploadError {
        UploadError::TooLarge {
            limit_bytes: self.max_bytes,
        }
    }

    /// Returns the lower-cased extension when `filename` may be stored.
    pub fn checked_extension(&self, filename: &str) -> Result<String, UploadError> {
        if filename.is_empty() {
            return Err(UploadError::EmptyFilename);
        }
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .ok_or_else(|| UploadError::InvalidType(filename.to_string()))?;
        if !self.allowed_extensions.contains(&extension) {
            return Err(UploadError::InvalidType(filename.to_string()));
        }
        Ok(extension)
    }

    pub async fn validate_and_store(
        &self,
        request: UploadRequest,
    ) -> Result<RedirectTarget, UploadError> {
        let file = request.file.as_ref().ok_or(UploadError::NoFile)?;
        let extension = self.checked_extension(&file.filename)?;

        let stored = self
            .disk
            .save_image(&file.data, &extension)
            .await
            .inspect_err(|e| error!("Failed to store upload {:?}: {}", file.filename, e))?;

        info!(
            "Stored upload {:?} as {} ({} bytes) at {}",
            file.filename,
            stored.path.display(),
            stored.size_bytes,
            stored.stored_at.to_rfc3339()
        );

        Ok(RedirectTarget {
            params: request.view_params(stored.name),
        })
    }

    pub fn log_rejection(&self, err: &UploadError) {
        match err {
            UploadError::Storage(_) => {}
            _ => warn!("Upload rejected: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::models::UploadedFile;
    use tempfile::{TempDir, tempdir};

    fn gateway() -> (TempDir, UploadGateway) {
        let dir = tempdir().unwrap();
        let config = GatewayConfig {
            upload_dir: dir.path().to_path_buf(),
            ..GatewayConfig::default()
        };
        (dir, UploadGateway::new(&config))
    }

    fn request(filename: &str) -> UploadRequest {
        UploadRequest {
            file: Some(UploadedFile {
                filename: filename.to_string(),
                data: vec![0x89, b'P', b'N', b'G'],
            }),
            confidence: None,
            model: None,
        }
    }

    fn stored_count(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[test]
    fn every_allowed_extension_passes_in_any_case() {
        let (_dir, gateway) = gateway();
        for ext in ["png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp"] {
            assert_eq!(gateway.checked_extension(&format!("m31.{}", ext)).unwrap(), ext);
            let upper = ext.to_uppercase();
            assert_eq!(gateway.checked_extension(&format!("m31.{}", upper)).unwrap(), ext);
        }
    }

    #[test]
    fn only_the_last_suffix_counts() {
        let (_dir, gateway) = gateway();
        assert_eq!(gateway.checked_extension("archive.tar.JPEG").unwrap(), "jpeg");
        assert_eq!(gateway.checked_extension(".png").unwrap(), "png");
        assert!(matches!(
            gateway.checked_extension("galaxy.png.exe"),
            Err(UploadError::InvalidType(_))
        ));
    }

    #[test]
    fn missing_or_unknown_extensions_are_invalid() {
        let (_dir, gateway) = gateway();
        for name in ["galaxy", "galaxy.", "galaxy.svg", "notes.txt"] {
            let err = gateway.checked_extension(name).unwrap_err();
            assert_eq!(err.notice(), Notice::InvalidFileType, "{}", name);
        }
    }

    #[test]
    fn empty_filename_means_no_file_selected() {
        let (_dir, gateway) = gateway();
        let err = gateway.checked_extension("").unwrap_err();
        assert!(matches!(err, UploadError::EmptyFilename));
        assert_eq!(err.notice(), Notice::NoFileSelected);
    }

    #[actix_web::test]
    async fn success_stores_file_and_applies_defaults() {
        let (dir, gateway) = gateway();

        let target = gateway.validate_and_store(request("Hubble.TIFF")).await.unwrap();

        assert!(target.params.filename.ends_with(".tiff"));
        assert_eq!(target.params.confidence, "0.7");
        assert_eq!(target.params.model, "cnn_v2");
        let stored = dir.path().join(&target.params.filename);
        assert_eq!(std::fs::read(stored).unwrap(), vec![0x89, b'P', b'N', b'G']);
        assert_eq!(stored_count(&dir), 1);
    }

    #[actix_web::test]
    async fn form_fields_are_forwarded_verbatim() {
        let (_dir, gateway) = gateway();
        let mut req = request("m87.jpg");
        req.confidence = Some("0.95".to_string());
        req.model = Some("resnet 50&x".to_string());

        let target = gateway.validate_and_store(req).await.unwrap();

        assert_eq!(target.params.confidence, "0.95");
        assert_eq!(target.params.model, "resnet 50&x");
        let location = target.location();
        assert!(location.starts_with("/output?filename="));
        assert!(location.ends_with("&confidence=0.95&model=resnet%2050%26x"));
    }

    #[actix_web::test]
    async fn rejected_uploads_write_nothing() {
        let (dir, gateway) = gateway();

        let no_file = gateway
            .validate_and_store(UploadRequest::default())
            .await
            .unwrap_err();
        let bad_type = gateway
            .validate_and_store(request("virus.exe"))
            .await
            .unwrap_err();
        let empty = gateway.validate_and_store(request("")).await.unwrap_err();

        assert_eq!(no_file.notice(), Notice::NoFileSelected);
        assert_eq!(bad_type.notice(), Notice::InvalidFileType);
        assert_eq!(empty.notice(), Notice::NoFileSelected);
        assert_eq!(stored_count(&dir), 0);
    }

    #[actix_web::test]
    async fn storage_failure_maps_to_upload_failed() {
        let dir = tempdir().unwrap();
        let config = GatewayConfig {
            upload_dir: dir.path().join("missing"),
            ..GatewayConfig::default()
        };
        let gateway = UploadGateway::new(&config);

        let err = gateway.validate_and_store(request("ngc.png")).await.unwrap_err();

        assert!(matches!(err, UploadError::Storage(_)));
        assert_eq!(err.notice(), Notice::UploadFailed);
    }

    #[test]
    fn too_large_carries_configured_limit() {
        let (_dir, gateway) = gateway();
        assert_eq!(
            gateway.too_large().notice().to_string(),
            "File is too large. Maximum size is 16MB."
        );
    }
}
