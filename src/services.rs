use std::time::Duration;

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use crate::config::{Settings, UpstreamSettings};
use crate::errors::AppError;
use crate::models::{DetectionEvent, DetectionResult, UpstreamAnalysis};

// ==============================================================================
// DISEASE -> PLANT PART MAPPING
// ==============================================================================

/// Plant part a disease label is reported on. Labels outside the mapping are
/// reported as "unknown".
pub fn plant_part_for(disease: &str) -> &'static str {
    match disease.to_ascii_lowercase().as_str() {
        "powdery_mildew" => "leaf",
        "blight" => "leaf",
        "rust" => "stem",
        _ => "unknown",
    }
}

// ==============================================================================
// INFERENCE SERVICE
// ==============================================================================

/// Client for the external inference service that performs the actual
/// detection. This gateway never decodes video itself.
pub struct InferenceService {
    client: reqwest::Client,
    settings: UpstreamSettings,
}

impl InferenceService {
    pub fn new(settings: &Settings) -> Result<Self, AppError> {
        if settings.upstream.base_url.is_empty() {
            return Err(AppError::ConfigError(
                "inference base URL is not set".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.upstream.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            settings: settings.upstream.clone(),
        })
    }

    /// Forward the uploaded video to the inference service and map its
    /// predictions into the detection wire format.
    pub async fn analyze_video(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        plant_type: &str,
    ) -> Result<DetectionResult, AppError> {
        let mime = mime_guess::from_path(filename)
            .first_or(mime::APPLICATION_OCTET_STREAM);
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime.as_ref())
            .map_err(|e| AppError::InternalError(e.to_string()))?;

        let form = Form::new()
            .part("video", part)
            .text("plant_type", plant_type.to_string())
            .text("confidence", self.settings.confidence.to_string())
            .text("overlap", self.settings.overlap.to_string());

        let url = self.settings.analyze_url();
        debug!(%url, plant_type, "Forwarding video to inference service");

        let response = self
            .client
            .post(&url)
            .query(&[("api_key", self.settings.api_key.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalService(format!(
                "Inference service returned status {}",
                status.as_u16()
            )));
        }

        let analysis: UpstreamAnalysis = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        let result = self.into_result(analysis, plant_type, Utc::now().timestamp());
        info!(
            plant_type,
            detections = result.detections.len(),
            "Inference completed"
        );
        Ok(result)
    }

    fn into_result(
        &self,
        analysis: UpstreamAnalysis,
        plant_type: &str,
        timestamp: i64,
    ) -> DetectionResult {
        let detections = analysis
            .predictions
            .into_iter()
            .filter(|p| p.confidence >= self.settings.confidence)
            .map(|p| DetectionEvent {
                frame: p.frame,
                disease: p.class.clone(),
                plant_part: plant_part_for(&p.class).to_string(),
                plant_type: plant_type.to_string(),
            })
            .collect();

        let processed_video = analysis
            .processed_video
            .filter(|url| !url.is_empty())
            .map(|url| with_cache_buster(&url, timestamp));

        DetectionResult {
            processed_video,
            detections,
            error: None,
        }
    }
}

/// Append a timestamp query parameter so clients never replay a cached copy
/// of an older processed video.
fn with_cache_buster(url: &str, timestamp: i64) -> String {
    if url.contains('?') {
        format!("{}&t={}", url, timestamp)
    } else {
        format!("{}?t={}", url, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UpstreamPrediction;

    fn service() -> InferenceService {
        InferenceService::new(&Settings::default()).unwrap()
    }

    fn prediction(frame: u64, class: &str, confidence: f32) -> UpstreamPrediction {
        UpstreamPrediction {
            frame,
            class: class.to_string(),
            confidence,
        }
    }

    #[test]
    fn maps_known_diseases_to_parts() {
        assert_eq!(plant_part_for("blight"), "leaf");
        assert_eq!(plant_part_for("Powdery_Mildew"), "leaf");
        assert_eq!(plant_part_for("rust"), "stem");
        assert_eq!(plant_part_for("bacterial_spot"), "unknown");
    }

    #[test]
    fn low_confidence_predictions_are_dropped() {
        let analysis = UpstreamAnalysis {
            processed_video: None,
            predictions: vec![
                prediction(5, "blight", 0.9),
                prediction(10, "rust", 0.1),
            ],
        };

        let result = service().into_result(analysis, "tomato", 0);
        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].frame, 5);
        assert_eq!(result.detections[0].plant_part, "leaf");
        assert_eq!(result.detections[0].plant_type, "tomato");
    }

    #[test]
    fn processed_video_url_gets_cache_buster() {
        let analysis = UpstreamAnalysis {
            processed_video: Some("/get-latest-video".to_string()),
            predictions: vec![],
        };

        let result = service().into_result(analysis, "tomato", 1700000000);
        assert_eq!(
            result.processed_video.as_deref(),
            Some("/get-latest-video?t=1700000000")
        );
    }

    #[test]
    fn empty_processed_video_is_dropped() {
        let analysis = UpstreamAnalysis {
            processed_video: Some(String::new()),
            predictions: vec![],
        };

        let result = service().into_result(analysis, "tomato", 0);
        assert_eq!(result.processed_video, None);
    }

    #[test]
    fn cache_buster_appends_to_existing_query() {
        assert_eq!(
            with_cache_buster("/video?id=7", 42),
            "/video?id=7&t=42"
        );
        assert_eq!(with_cache_buster("/video", 42), "/video?t=42");
    }
}
