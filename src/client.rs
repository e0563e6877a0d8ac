use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::debug;

use crate::models::{DetectionResult, UploadRequest};

#[cfg(test)]
use mockall::automock;

// ==============================================================================
// TRANSPORT
// ==============================================================================

#[derive(Debug, Error)]
pub enum TransportError {
    /// Non-2xx response; rendered verbatim into the console error line.
    #[error("HTTP error! Status: {0}")]
    Status(u16),
    #[error("{0}")]
    Network(String),
}

/// The single network exchange the upload controller performs.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DetectTransport: Send + Sync {
    /// Submit the video and plant type as one multipart POST, returning the
    /// parsed detection result.
    async fn submit(&self, request: &UploadRequest) -> Result<DetectionResult, TransportError>;
}

// ==============================================================================
// HTTP TRANSPORT
// ==============================================================================

/// reqwest-backed transport posting to a PHYTOSCAN gateway's `/detect`.
pub struct HttpDetectTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpDetectTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            // No timeout: the submission runs to completion or failure exactly once.
            client: reqwest::Client::new(),
            endpoint: endpoint_url(base_url),
        }
    }
}

fn endpoint_url(base_url: &str) -> String {
    format!("{}/detect", base_url.trim_end_matches('/'))
}

#[async_trait]
impl DetectTransport for HttpDetectTransport {
    async fn submit(&self, request: &UploadRequest) -> Result<DetectionResult, TransportError> {
        let bytes = tokio::fs::read(&request.video)
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let filename = request
            .video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let mime = mime_guess::from_path(&request.video).first_or_octet_stream();

        let part = Part::bytes(bytes)
            .file_name(filename)
            .mime_str(mime.as_ref())
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let form = Form::new()
            .part("video", part)
            .text("plant_type", request.plant_type.clone());

        debug!(endpoint = %self.endpoint, plant_type = %request.plant_type, "Submitting detection request");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .json::<DetectionResult>()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))
    }
}
