use std::env;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub upstream: UpstreamSettings,
    pub upload: UploadSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub cors_allowed_origins: Vec<String>,
    pub public_url: String,
}

/// The external inference service that performs the actual detection.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub confidence: f32,
    pub overlap: f32,
    pub timeout_secs: u64,
}

impl UpstreamSettings {
    pub fn analyze_url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.model)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    pub max_file_size_mb: u64,
    pub allowed_extensions: Vec<String>,
}

impl UploadSettings {
    pub fn max_bytes(&self) -> usize {
        (self.max_file_size_mb as usize) * 1024 * 1024
    }

    pub fn extension_allowed(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext))
            })
            .unwrap_or(false)
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local overrides
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (with prefix PHYTOSCAN_)
            .add_source(
                Environment::with_prefix("PHYTOSCAN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    /// Load settings from environment variables directly (simpler for production)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::default().with_env_overrides())
    }
}

impl Settings {
    /// Apply environment variable overrides to default settings
    fn with_env_overrides(mut self) -> Self {
        // Server
        if let Ok(host) = env::var("SERVER_HOST") { self.server.host = host; }
        if let Ok(port) = env::var("SERVER_PORT") { self.server.port = port.parse().unwrap_or(8082); }
        if let Ok(url) = env::var("PUBLIC_URL") { self.server.public_url = url; }

        // Upstream inference service
        if let Ok(url) = env::var("INFERENCE_URL") { self.upstream.base_url = url; }
        if let Ok(key) = env::var("INFERENCE_API_KEY") { self.upstream.api_key = key; }
        if let Ok(model) = env::var("INFERENCE_MODEL") { self.upstream.model = model; }
        if let Ok(conf) = env::var("INFERENCE_CONFIDENCE") {
            self.upstream.confidence = conf.parse().unwrap_or(self.upstream.confidence);
        }
        if let Ok(overlap) = env::var("INFERENCE_OVERLAP") {
            self.upstream.overlap = overlap.parse().unwrap_or(self.upstream.overlap);
        }

        // Upload limits
        if let Ok(mb) = env::var("UPLOAD_MAX_FILE_SIZE_MB") {
            self.upload.max_file_size_mb = mb.parse().unwrap_or(self.upload.max_file_size_mb);
        }

        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8082,
                workers: None,
                cors_allowed_origins: vec!["*".to_string()],
                public_url: "http://localhost:8082".to_string(),
            },
            upstream: UpstreamSettings {
                base_url: "https://detect.example.com".to_string(),
                api_key: "".to_string(),
                model: "tomato-disease/3".to_string(),
                confidence: 0.43,
                overlap: 0.5,
                timeout_secs: 300,
            },
            upload: UploadSettings {
                max_file_size_mb: 200,
                allowed_extensions: vec![
                    "mp4".to_string(),
                    "avi".to_string(),
                    "mov".to_string(),
                    "mkv".to_string(),
                    "webm".to_string(),
                ],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_upload_limits_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.upload.max_bytes(), 200 * 1024 * 1024);
        assert!(settings.upload.allowed_extensions.contains(&"mp4".to_string()));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let upload = Settings::default().upload;
        assert!(upload.extension_allowed("clip.MP4"));
        assert!(upload.extension_allowed("garden.mov"));
        assert!(!upload.extension_allowed("notes.txt"));
        assert!(!upload.extension_allowed("no_extension"));
    }

    #[test]
    fn analyze_url_joins_without_double_slash() {
        let mut upstream = Settings::default().upstream;
        upstream.base_url = "https://detect.example.com/".to_string();
        upstream.model = "tomato-disease/3".to_string();
        assert_eq!(
            upstream.analyze_url(),
            "https://detect.example.com/tomato-disease/3"
        );
    }
}
