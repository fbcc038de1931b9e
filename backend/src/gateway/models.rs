use shared::{DEFAULT_CONFIDENCE, DEFAULT_MODEL, ResultViewParams};

pub const FILE_FIELD: &str = "galaxy_image";
pub const CONFIDENCE_FIELD: &str = "confidence";
pub const MODEL_FIELD: &str = "model";

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Everything the upload form submitted, lives only for one request.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file: Option<UploadedFile>,
    pub confidence: Option<String>,
    pub model: Option<String>,
}

impl UploadRequest {
    pub fn view_params(&self, stored_name: String) -> ResultViewParams {
        ResultViewParams {
            filename: stored_name,
            confidence: self
                .confidence
                .clone()
                .unwrap_or_else(|| DEFAULT_CONFIDENCE.to_string()),
            model: self
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }
}

/// Where the browser is sent after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub params: ResultViewParams,
}

impl RedirectTarget {
    pub fn location(&self) -> String {
        format!(
            "/output?filename={}&confidence={}&model={}",
            urlencoding::encode(&self.params.filename),
            urlencoding::encode(&self.params.confidence),
            urlencoding::encode(&self.params.model)
        )
    }
}
