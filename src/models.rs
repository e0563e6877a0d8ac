use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// ==============================================================================
// WIRE FORMAT
// ==============================================================================

/// One reported disease observation at a specific video frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionEvent {
    pub frame: u64,
    pub disease: String,
    pub plant_part: String,
    pub plant_type: String,
}

impl DetectionEvent {
    pub fn console_line(&self) -> String {
        format!(
            "Frame {}: {} detected on {} of {} plant",
            self.frame, self.disease, self.plant_part, self.plant_type
        )
    }
}

/// Body of a `/detect` response. `error` is set instead of the other fields
/// when the backend reports a failure inside a 2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DetectionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_video: Option<String>,
    #[serde(default)]
    pub detections: Vec<DetectionEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectionResult {
    /// Console text for the detections list, in input order.
    pub fn console_text(&self) -> String {
        if self.detections.is_empty() {
            return "No diseases detected.".to_string();
        }
        self.detections
            .iter()
            .map(DetectionEvent::console_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ==============================================================================
// UPSTREAM INFERENCE TYPES
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamPrediction {
    pub frame: u64,
    pub class: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamAnalysis {
    #[serde(default)]
    pub processed_video: Option<String>,
    #[serde(default)]
    pub predictions: Vec<UpstreamPrediction>,
}

// ==============================================================================
// CLIENT SUBMISSION TYPES
// ==============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("Please select a video.")]
    MissingVideo,
    #[error("Please select a plant type.")]
    MissingPlantType,
}

/// Raw user selection, before validation.
#[derive(Debug, Clone, Default)]
pub struct SubmissionInput {
    pub video: Option<PathBuf>,
    pub plant_type: Option<String>,
}

/// A validated submission: both fields present and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub video: PathBuf,
    pub plant_type: String,
}

impl SubmissionInput {
    pub fn into_request(self) -> Result<UploadRequest, ValidationFailure> {
        let video = self.video.ok_or(ValidationFailure::MissingVideo)?;
        let plant_type = self
            .plant_type
            .filter(|p| !p.trim().is_empty())
            .ok_or(ValidationFailure::MissingPlantType)?;
        Ok(UploadRequest { video, plant_type })
    }
}
