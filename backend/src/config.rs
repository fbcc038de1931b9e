use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::retention::RetentionPolicy;

pub const DEFAULT_MAX_BYTES: u64 = 16 * 1024 * 1024;
pub const DEFAULT_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("At least one allowed extension is required")]
    NoExtensions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind_address: String,
    pub upload_dir: PathBuf,
    pub max_bytes: u64,
    pub allowed_extensions: BTreeSet<String>,
    pub cookie_secure: bool,
    pub retention: RetentionConfig,
    /// Only ever sourced from the environment.
    #[serde(skip)]
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub max_age_secs: Option<u64>,
    pub max_files: Option<usize>,
    pub sweep_interval_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            upload_dir: PathBuf::from("static/uploads"),
            max_bytes: DEFAULT_MAX_BYTES,
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            cookie_secure: false,
            retention: RetentionConfig::default(),
            secret_key: None,
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_secs: Some(7 * 24 * 60 * 60),
            max_files: None,
            sweep_interval_secs: 60 * 60,
        }
    }
}

impl RetentionConfig {
    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_age: self.max_age_secs.map(Duration::from_secs),
            max_files: self.max_files,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl GatewayConfig {
    /// Defaults, then the YAML file named by `GATEWAY_CONFIG`, then individual env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("GATEWAY_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.normalize()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = serde_yaml::from_str(config_str)?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("BIND_ADDRESS") {
            self.bind_address = addr;
        } else if let Some(port) = lookup("PORT") {
            self.bind_address = format!("0.0.0.0:{}", port);
        }
        if let Some(dir) = lookup("UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("MAX_UPLOAD_BYTES") {
            self.max_bytes = parse_number("MAX_UPLOAD_BYTES", &value)?;
        }
        if let Some(value) = lookup("ALLOWED_EXTENSIONS") {
            self.allowed_extensions = value.split(',').map(|e| e.to_string()).collect();
        }
        if let Some(value) = lookup("RETENTION_MAX_AGE_SECS") {
            self.retention.max_age_secs = parse_optional("RETENTION_MAX_AGE_SECS", &value)?;
        }
        if let Some(value) = lookup("RETENTION_MAX_FILES") {
            self.retention.max_files = parse_optional("RETENTION_MAX_FILES", &value)?;
        }
        if let Some(value) = lookup("COOKIE_SECURE") {
            self.cookie_secure = matches!(value.as_str(), "1" | "true" | "yes");
        }
        self.secret_key = lookup("SECRET_KEY").filter(|s| !s.is_empty());
        Ok(())
    }

    /// Lower-cases extensions and strips any leading dot so lookups are a plain set hit.
    pub fn normalize(&mut self) -> Result<(), ConfigError> {
        self.allowed_extensions = self
            .allowed_extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if self.allowed_extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }
        if self.max_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_bytes",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

// "none" or an empty value disables the limit.
fn parse_optional<T: std::str::FromStr>(
    key: &'static str,
    value: &str,
) -> Result<Option<T>, ConfigError> {
    match value.trim() {
        "" | "none" => Ok(None),
        v => parse_number(key, v).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_upload_limits() {
        let config = GatewayConfig::default();
        assert_eq!(config.max_bytes, 16 * 1024 * 1024);
        assert_eq!(config.upload_dir, PathBuf::from("static/uploads"));
        assert_eq!(config.allowed_extensions.len(), 7);
        assert!(config.allowed_extensions.contains("webp"));
        assert!(config.secret_key.is_none());
    }

    #[test]
    fn env_overrides_replace_defaults() {
        let mut config = GatewayConfig::default();
        config
            .apply_env(env_of(&[
                ("UPLOAD_DIR", "/tmp/galaxies"),
                ("MAX_UPLOAD_BYTES", "2048"),
                ("ALLOWED_EXTENSIONS", ".PNG, jpg"),
                ("RETENTION_MAX_AGE_SECS", "none"),
                ("RETENTION_MAX_FILES", "10"),
                ("PORT", "8081"),
                ("SECRET_KEY", "hunter2"),
            ]))
            .unwrap();
        config.normalize().unwrap();

        assert_eq!(config.upload_dir, PathBuf::from("/tmp/galaxies"));
        assert_eq!(config.max_bytes, 2048);
        assert_eq!(
            config.allowed_extensions,
            ["jpg", "png"].iter().map(|e| e.to_string()).collect::<BTreeSet<_>>()
        );
        assert_eq!(config.retention.max_age_secs, None);
        assert_eq!(config.retention.max_files, Some(10));
        assert_eq!(config.bind_address, "0.0.0.0:8081");
        assert_eq!(config.secret_key.as_deref(), Some("hunter2"));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let mut config = GatewayConfig::default();
        let err = config
            .apply_env(env_of(&[("MAX_UPLOAD_BYTES", "sixteen")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "MAX_UPLOAD_BYTES", .. }
        ));
    }

    #[test]
    fn empty_extension_set_is_rejected() {
        let mut config = GatewayConfig::default();
        config.apply_env(env_of(&[("ALLOWED_EXTENSIONS", " , .")])).unwrap();
        assert!(matches!(config.normalize(), Err(ConfigError::NoExtensions)));
    }

    #[test]
    fn yaml_fills_missing_fields_with_defaults() {
        let config = GatewayConfig::from_yaml(
            "upload_dir: /srv/uploads\nretention:\n  max_files: 3\n",
        )
        .unwrap();
        assert_eq!(config.upload_dir, PathBuf::from("/srv/uploads"));
        assert_eq!(config.max_bytes, DEFAULT_MAX_BYTES);
        assert_eq!(config.retention.max_files, Some(3));
        assert_eq!(config.retention.sweep_interval_secs, 3600);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = GatewayConfig::from_file(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.yaml"));
    }
}
