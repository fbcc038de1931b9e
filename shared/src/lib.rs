use serde::{Deserialize, Serialize};
use std::fmt;
use strum::AsRefStr;

pub const DEFAULT_CONFIDENCE: &str = "0.7";
pub const DEFAULT_MODEL: &str = "cnn_v2";

/// Parameters handed from the upload step to the results view through the query string.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ResultViewParams {
    #[serde(default)]
    pub filename: String,
    #[serde(default = "default_confidence")]
    pub confidence: String,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_confidence() -> String {
    DEFAULT_CONFIDENCE.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for ResultViewParams {
    fn default() -> Self {
        Self {
            filename: String::new(),
            confidence: default_confidence(),
            model: default_model(),
        }
    }
}

impl ResultViewParams {
    /// Builds the view from raw query pairs. The first value of a repeated key wins and
    /// unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut filename = None;
        let mut confidence = None;
        let mut model = None;
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "filename" => &mut filename,
                "confidence" => &mut confidence,
                "model" => &mut model,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        Self {
            filename: filename.unwrap_or_default(),
            confidence: confidence.unwrap_or_else(default_confidence),
            model: model.unwrap_or_else(default_model),
        }
    }
}

/// One-shot message shown on the upload form after a rejected upload.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Notice {
    NoFileSelected,
    InvalidFileType,
    FileTooLarge { limit_bytes: u64 },
    UploadFailed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoFileSelected => write!(f, "No file selected"),
            Notice::InvalidFileType => {
                write!(f, "Invalid file type. Please upload an image file.")
            }
            Notice::FileTooLarge { limit_bytes } => write!(
                f,
                "File is too large. Maximum size is {}.",
                human_size(*limit_bytes)
            ),
            Notice::UploadFailed => write!(f, "Upload failed. Please try again."),
        }
    }
}

pub fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_of_repeated_key_wins() {
        let params = ResultViewParams::from_pairs([
            ("model", "a"),
            ("model", "b"),
            ("filename", "x.png"),
            ("extra", "ignored"),
        ]);
        assert_eq!(params.model, "a");
        assert_eq!(params.filename, "x.png");
        assert_eq!(params.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn empty_pairs_give_defaults() {
        let params = ResultViewParams::from_pairs(Vec::<(String, String)>::new());
        assert_eq!(params, ResultViewParams::default());
    }

    #[test]
    fn notices_render_user_facing_text() {
        assert_eq!(Notice::NoFileSelected.to_string(), "No file selected");
        assert_eq!(
            Notice::InvalidFileType.to_string(),
            "Invalid file type. Please upload an image file."
        );
        assert_eq!(
            Notice::FileTooLarge { limit_bytes: 16 * 1024 * 1024 }.to_string(),
            "File is too large. Maximum size is 16MB."
        );
    }

    #[test]
    fn notice_kind_is_kebab_case() {
        assert_eq!(Notice::FileTooLarge { limit_bytes: 1 }.as_ref(), "file-too-large");
        assert_eq!(Notice::NoFileSelected.as_ref(), "no-file-selected");
    }

    #[test]
    fn human_size_picks_largest_exact_unit() {
        assert_eq!(human_size(16 * 1024 * 1024), "16MB");
        assert_eq!(human_size(1536), "1536 bytes");
        assert_eq!(human_size(2048), "2KB");
        assert_eq!(human_size(10), "10 bytes");
    }
}
